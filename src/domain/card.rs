use crate::error::{GatewayError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Card holder names the gateway's simulator recognises. Each one forces a
/// particular strong-authentication outcome, so a card carrying one of them
/// must never be routed to the live endpoint.
pub const MAGIC_CARD_HOLDERS: [&str; 8] = [
    "CHALLENGE",
    "ERROR",
    "NOTAUTH",
    "NOTENROLLED",
    "PROOFATTEMPT",
    "STATUS201DS",
    "SUCCESSFUL",
    "TECHNICALDIFFICULTIES",
];

/// Card scheme codes as the gateway spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardBrand {
    Visa,
    #[serde(rename = "MC")]
    Mastercard,
    Amex,
    Jcb,
    #[serde(rename = "DC")]
    DinersClub,
    Delta,
    Laser,
    Maestro,
    #[serde(rename = "MCDEBIT")]
    MastercardDebit,
    #[serde(rename = "PAYPAL")]
    PayPal,
    Uke,
}

impl CardBrand {
    pub fn code(&self) -> &'static str {
        match self {
            CardBrand::Visa => "VISA",
            CardBrand::Mastercard => "MC",
            CardBrand::Amex => "AMEX",
            CardBrand::Jcb => "JCB",
            CardBrand::DinersClub => "DC",
            CardBrand::Delta => "DELTA",
            CardBrand::Laser => "LASER",
            CardBrand::Maestro => "MAESTRO",
            CardBrand::MastercardDebit => "MCDEBIT",
            CardBrand::PayPal => "PAYPAL",
            CardBrand::Uke => "UKE",
        }
    }

    /// Alternate payment methods settle off-card and need extra callback fields.
    pub fn is_alternate_payment_method(&self) -> bool {
        matches!(self, CardBrand::PayPal)
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CardBrand {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VISA" => Ok(CardBrand::Visa),
            "MC" => Ok(CardBrand::Mastercard),
            "AMEX" => Ok(CardBrand::Amex),
            "JCB" => Ok(CardBrand::Jcb),
            "DC" => Ok(CardBrand::DinersClub),
            "DELTA" => Ok(CardBrand::Delta),
            "LASER" => Ok(CardBrand::Laser),
            "MAESTRO" => Ok(CardBrand::Maestro),
            "MCDEBIT" => Ok(CardBrand::MastercardDebit),
            "PAYPAL" => Ok(CardBrand::PayPal),
            "UKE" => Ok(CardBrand::Uke),
            other => Err(GatewayError::validation(format!(
                "Unknown card type '{}'",
                other
            ))),
        }
    }
}

/// Ordered (pattern, brand) table; the first matching rule wins.
static BRAND_RULES: LazyLock<Vec<(Regex, CardBrand)>> = LazyLock::new(|| {
    [
        (r"^4[0-9]{0,15}$", CardBrand::Visa),
        (
            r"^(?:5[1-5][0-9]{5,}|222[1-9][0-9]{3,}|22[3-9][0-9]{4,}|2[3-6][0-9]{5,}|27[01][0-9]{4,}|2720[0-9]{3,})$",
            CardBrand::Mastercard,
        ),
        (r"^(?:3|3[47][0-9]{0,13})$", CardBrand::Amex),
        (r"^(?:2131|1800|35[0-9]{3})[0-9]{3,}$", CardBrand::Jcb),
        (r"^3(?:0[0-5]|[68][0-9])[0-9]{4,}$", CardBrand::DinersClub),
    ]
    .into_iter()
    .map(|(pattern, brand)| (Regex::new(pattern).expect("Invalid card brand pattern"), brand))
    .collect()
});

/// Strips everything but ASCII digits. Idempotent.
pub fn normalize_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Classifies a normalized card number. `None` means no rule matched.
pub fn classify_brand(number: &str) -> Option<CardBrand> {
    BRAND_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(number))
        .map(|(_, brand)| *brand)
}

#[derive(Clone, PartialEq, Eq)]
pub struct Card {
    number: String,
    holder: String,
    expiry: String,
    cv2: String,
    brand: Option<CardBrand>,
}

impl Card {
    /// Builds a card from raw form input. Number and expiry are reduced to
    /// digits; the brand is derived from the normalized number.
    pub fn new(
        number: &str,
        holder: &str,
        expiry_month: &str,
        expiry_year: &str,
        cv2: &str,
    ) -> Self {
        let number = normalize_digits(number);
        let brand = classify_brand(&number);
        Self {
            number,
            holder: holder.to_string(),
            expiry: normalize_digits(&format!("{}{}", expiry_month, expiry_year)),
            cv2: cv2.trim().to_string(),
            brand,
        }
    }

    /// Overrides the derived brand, e.g. for debit variants or PayPal.
    pub fn with_brand(mut self, brand: CardBrand) -> Self {
        self.brand = Some(brand);
        self
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Digits-only `MMYY`.
    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    pub fn cv2(&self) -> &str {
        &self.cv2
    }

    pub fn brand(&self) -> Option<CardBrand> {
        self.brand
    }

    pub fn last_four(&self) -> &str {
        let start = self.number.len().saturating_sub(4);
        &self.number[start..]
    }

    pub fn is_magic_test_value(&self) -> bool {
        MAGIC_CARD_HOLDERS.contains(&self.holder.as_str())
    }

    /// Checks the fields the gateway cannot accept empty.
    pub fn validate(&self) -> Result<()> {
        if self.number.is_empty() {
            return Err(GatewayError::validation("Card number is empty"));
        }
        if self.expiry.len() != 4 {
            return Err(GatewayError::validation(
                "Card expiry must be a two digit month and two digit year",
            ));
        }
        if self.holder.trim().is_empty() {
            return Err(GatewayError::validation("Card holder name is empty"));
        }
        if self.brand.is_none() {
            return Err(GatewayError::validation(
                "Card type could not be determined from the card number",
            ));
        }
        Ok(())
    }
}

// Never print the full number or the security code.
impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("number", &format_args!("****{}", self.last_four()))
            .field("holder", &self.holder)
            .field("expiry", &self.expiry)
            .field("brand", &self.brand)
            .finish_non_exhaustive()
    }
}
