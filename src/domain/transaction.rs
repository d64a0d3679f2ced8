use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::domain::browser::BrowserFingerprint;
use crate::domain::card::Card;
use crate::error::{GatewayError, Result};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gateway limit for `VendorTxCode`.
pub const VENDOR_TX_CODE_MAX_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Payment,
    Deferred,
    Authenticate,
}

impl TransactionType {
    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Payment => "PAYMENT",
            TransactionType::Deferred => "DEFERRED",
            TransactionType::Authenticate => "AUTHENTICATE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TransactionType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PAYMENT" => Ok(TransactionType::Payment),
            "DEFERRED" => Ok(TransactionType::Deferred),
            "AUTHENTICATE" => Ok(TransactionType::Authenticate),
            _ => Err(GatewayError::validation(format!(
                "Unsupported transaction type '{}'",
                s
            ))),
        }
    }
}

/// Merchant-risk and regulatory XML documents, forwarded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskPassthrough {
    pub acct_info_xml: Option<String>,
    pub merchant_risk_indicator_xml: Option<String>,
    pub prior_authentication_info_xml: Option<String>,
}

/// Caller-assembled transaction data before validation. Every entity is
/// optional here so that absence can be reported as a validation error.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    pub card: Option<Card>,
    pub billing_address: Option<Address>,
    pub delivery_address: Option<Address>,
    pub browser: Option<BrowserFingerprint>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub customer_email: Option<String>,
    pub vendor_tx_code: Option<String>,
    pub apply_avs_cv2: Option<u8>,
    pub apply_3d_secure: Option<u8>,
    pub risk: RiskPassthrough,
}

/// A validated transaction, ready to be turned into a gateway payload.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub tx_type: TransactionType,
    pub amount: Amount,
    pub currency: String,
    pub description: Option<String>,
    pub customer_email: Option<String>,
    pub vendor_tx_code: Option<String>,
    pub billing_address: Address,
    pub delivery_address: Address,
    pub card: Card,
    pub browser: BrowserFingerprint,
    pub apply_avs_cv2: Option<u8>,
    pub apply_3d_secure: Option<u8>,
    pub risk: RiskPassthrough,
}

impl TransactionDraft {
    /// Validates the draft against a transaction type and amount. Nothing is
    /// sent or stored; a failure leaves no trace.
    pub fn validate(
        self,
        tx_type: &str,
        amount: &str,
        default_currency: &str,
    ) -> Result<TransactionRequest> {
        let tx_type = tx_type.parse::<TransactionType>()?;
        let amount = amount.parse::<Amount>()?;

        let card = self
            .card
            .ok_or_else(|| GatewayError::validation("Card details are missing"))?;
        card.validate()?;
        let billing_address = self
            .billing_address
            .ok_or_else(|| GatewayError::validation("Billing address is missing"))?;
        let delivery_address = self
            .delivery_address
            .ok_or_else(|| GatewayError::validation("Delivery address is missing"))?;
        let browser = self
            .browser
            .ok_or_else(|| GatewayError::validation("Browser details are missing"))?;

        let currency = self
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_currency.to_string())
            .trim()
            .to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(GatewayError::validation(format!(
                "'{}' is not a three letter currency code",
                currency
            )));
        }

        for flag in [self.apply_avs_cv2, self.apply_3d_secure].into_iter().flatten() {
            if flag > 3 {
                return Err(GatewayError::validation(format!(
                    "Check flag {} is out of range 0-3",
                    flag
                )));
            }
        }

        if let Some(code) = &self.vendor_tx_code
            && (code.is_empty() || code.len() > VENDOR_TX_CODE_MAX_LEN)
        {
            return Err(GatewayError::validation(format!(
                "Vendor transaction code must be 1-{} characters",
                VENDOR_TX_CODE_MAX_LEN
            )));
        }

        Ok(TransactionRequest {
            tx_type,
            amount,
            currency,
            description: self.description,
            customer_email: self.customer_email,
            vendor_tx_code: self.vendor_tx_code,
            billing_address,
            delivery_address,
            card,
            browser,
            apply_avs_cv2: self.apply_avs_cv2,
            apply_3d_secure: self.apply_3d_secure,
            risk: self.risk,
        })
    }
}

/// Generates a vendor transaction code: the configured prefix, a
/// microsecond timestamp and a random suffix. Only the prefix is shortened
/// to fit the gateway limit.
pub fn generate_vendor_tx_code(prefix: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    let tail = format!("{}{:04}", stamp, suffix);
    let room = VENDOR_TX_CODE_MAX_LEN.saturating_sub(tail.len());
    let prefix: String = prefix.chars().take(room).collect();
    format!("{}{}", prefix, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_draft() -> TransactionDraft {
        let address = Address::new(
            "Jo", "Bloggs", "88", "", "London", "", "412", "GB", "",
        )
        .unwrap();
        TransactionDraft {
            card: Some(Card::new("4929000000006", "Jo Bloggs", "12", "30", "123")),
            billing_address: Some(address.clone()),
            delivery_address: Some(address),
            browser: Some(BrowserFingerprint::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_transaction_type_is_case_insensitive() {
        assert_eq!(
            "payment".parse::<TransactionType>().unwrap(),
            TransactionType::Payment
        );
        assert_eq!(
            "Deferred".parse::<TransactionType>().unwrap(),
            TransactionType::Deferred
        );
        assert!(matches!(
            "REFUND".parse::<TransactionType>(),
            Err(GatewayError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_success() {
        let request = full_draft().validate("payment", "10.99", "GBP").unwrap();
        assert_eq!(request.tx_type, TransactionType::Payment);
        assert_eq!(request.amount.to_string(), "10.99");
        assert_eq!(request.currency, "GBP");
    }

    #[test]
    fn test_validate_rejects_missing_entities() {
        let mut draft = full_draft();
        draft.delivery_address = None;
        assert!(matches!(
            draft.validate("PAYMENT", "1", "GBP"),
            Err(GatewayError::ValidationError(_))
        ));

        let mut draft = full_draft();
        draft.browser = None;
        assert!(matches!(
            draft.validate("PAYMENT", "1", "GBP"),
            Err(GatewayError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_scalars() {
        assert!(full_draft().validate("PAYMENT", "abc", "GBP").is_err());
        assert!(full_draft().validate("VOID", "1.00", "GBP").is_err());
        assert!(full_draft().validate("PAYMENT", "1.00", "POUNDS").is_err());

        let mut draft = full_draft();
        draft.apply_3d_secure = Some(4);
        assert!(draft.validate("PAYMENT", "1.00", "GBP").is_err());
    }

    #[test]
    fn test_generated_vendor_tx_code() {
        let a = generate_vendor_tx_code("shop-");
        let b = generate_vendor_tx_code("shop-");
        assert!(a.starts_with("shop-"));
        assert!(a.len() <= VENDOR_TX_CODE_MAX_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_vendor_tx_code_keeps_random_suffix_with_long_prefix() {
        let code = generate_vendor_tx_code("abcdefghijklmnop");
        assert_eq!(code.len(), VENDOR_TX_CODE_MAX_LEN);
        assert!(code.starts_with("abcdefghijklmnop"));
        assert!(code[16..].chars().all(|c| c.is_ascii_digit()));

        let code = generate_vendor_tx_code("an-overlong-prefix-of-thirty-chars");
        assert_eq!(code.len(), VENDOR_TX_CODE_MAX_LEN);
        assert!(code.starts_with("an-overlong-pref"));
        assert!(code[16..].chars().all(|c| c.is_ascii_digit()));
    }
}
