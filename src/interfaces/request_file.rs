use crate::domain::address::Address;
use crate::domain::browser::BrowserFingerprint;
use crate::domain::card::{Card, CardBrand};
use crate::domain::transaction::{RiskPassthrough, TransactionDraft};
use crate::error::{GatewayError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A transaction described in TOML, as the command-line front end reads it.
///
/// Entities are optional so that a missing section is reported by the
/// coordinator's validation rather than by the parser.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    pub tx_type: String,
    pub amount: String,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub customer_email: Option<String>,
    pub vendor_tx_code: Option<String>,
    pub apply_avs_cv2: Option<u8>,
    pub apply_3d_secure: Option<u8>,
    pub card: Option<CardSection>,
    pub billing: Option<AddressSection>,
    pub delivery: Option<AddressSection>,
    pub browser: Option<BrowserSection>,
    #[serde(default)]
    pub risk: RiskPassthrough,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardSection {
    pub number: String,
    pub holder: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cv2: String,
    pub brand: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressSection {
    pub first_names: String,
    pub surname: String,
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub post_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSection {
    pub form: HashMap<String, String>,
    pub headers: HashMap<String, String>,
}

impl AddressSection {
    fn into_address(self) -> Result<Address> {
        Address::new(
            &self.first_names,
            &self.surname,
            &self.address1,
            &self.address2,
            &self.city,
            &self.state,
            &self.post_code,
            &self.country,
            &self.phone,
        )
    }
}

impl RequestFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| GatewayError::validation(format!("invalid request file: {}", e)))
    }

    /// Builds the domain entities. Address and brand problems surface here as
    /// validation errors.
    pub fn into_draft(self) -> Result<(String, String, TransactionDraft)> {
        let card = match self.card {
            Some(section) => {
                let card = Card::new(
                    &section.number,
                    &section.holder,
                    &section.expiry_month,
                    &section.expiry_year,
                    &section.cv2,
                );
                Some(match section.brand {
                    Some(brand) => card.with_brand(brand.parse::<CardBrand>()?),
                    None => card,
                })
            }
            None => None,
        };

        let draft = TransactionDraft {
            card,
            billing_address: self.billing.map(AddressSection::into_address).transpose()?,
            delivery_address: self.delivery.map(AddressSection::into_address).transpose()?,
            browser: self
                .browser
                .map(|b| BrowserFingerprint::from_request(&b.form, &b.headers)),
            currency: self.currency,
            description: self.description,
            customer_email: self.customer_email,
            vendor_tx_code: self.vendor_tx_code,
            apply_avs_cv2: self.apply_avs_cv2,
            apply_3d_secure: self.apply_3d_secure,
            risk: self.risk,
        };
        Ok((self.tx_type, self.amount, draft))
    }
}
