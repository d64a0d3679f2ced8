//! Gateway configuration bundle, loaded from TOML.

use crate::domain::card::CardBrand;
use crate::domain::gateway::EndpointTable;
use crate::error::{GatewayError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

/// Leaves room for the 20-digit timestamp and 4-digit suffix within the
/// gateway's 40-character VendorTxCode.
const MAX_PREFIX_LEN: usize = 16;
const MAX_TRIGGER_SCORE: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Merchant account name at the gateway.
    pub vendor: String,
    #[serde(default)]
    pub vendor_tx_code_prefix: String,
    /// Default description when the transaction supplies none.
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// 0 = use account rules, 1 = force checks, 2 = disable, 3 = force without rules.
    #[serde(default)]
    pub avs_cv2: u8,
    /// Root-relative PayPal callback path.
    #[serde(default)]
    pub paypal_callback_url: String,
    pub three_d_secure: ThreeDSecureConfig,
    /// Brand code to display label. Empty label disables the brand.
    #[serde(default)]
    pub accepted_types: BTreeMap<String, String>,
    #[serde(default)]
    pub test: TestTriggerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub redirects: RedirectConfig,
    #[serde(default)]
    pub gateway: EndpointConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreeDSecureConfig {
    #[serde(default)]
    pub apply: u8,
    /// Root-relative path the issuer posts back to.
    pub notification_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestTriggerConfig {
    pub card_numbers: Vec<String>,
    /// Field name to trigger values. Configured but not scored.
    pub fields: BTreeMap<String, Vec<String>>,
    pub ip_addresses: Vec<String>,
    pub hosts: Vec<String>,
    pub trigger_score: u32,
    pub weight: TestWeights,
}

impl Default for TestTriggerConfig {
    fn default() -> Self {
        Self {
            card_numbers: Vec::new(),
            fields: BTreeMap::new(),
            ip_addresses: Vec::new(),
            hosts: Vec::new(),
            trigger_score: 2,
            weight: TestWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestWeights {
    pub card_numbers: u32,
    pub fields: u32,
    pub ip_addresses: u32,
    pub hosts: u32,
}

impl Default for TestWeights {
    fn default() -> Self {
        Self {
            card_numbers: 1,
            fields: 1,
            ip_addresses: 1,
            hosts: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub card_type_map: BTreeMap<String, String>,
    pub currency_map: BTreeMap<String, String>,
    pub mode_if_live: String,
    pub mode_if_test: String,
    pub columns: LogColumns,
}

/// Destination column per logical log field. Unset or empty columns are
/// left out of the log entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogColumns {
    pub three_d_secure: Option<String>,
    pub amount: Option<String>,
    pub avs_cv2: Option<String>,
    pub card_digits: Option<String>,
    pub card_type: Option<String>,
    pub currency: Option<String>,
    pub date: Option<String>,
    pub mode: Option<String>,
    pub response: Option<String>,
    pub security_key: Option<String>,
    pub status_detail: Option<String>,
    pub tx_auth_no: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub vendor_tx_code: Option<String>,
    pub vps_tx_id: Option<String>,
}

impl LogColumns {
    /// Configured destination columns, sorted and without duplicates.
    pub fn names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = [
            &self.three_d_secure,
            &self.amount,
            &self.avs_cv2,
            &self.card_digits,
            &self.card_type,
            &self.currency,
            &self.date,
            &self.mode,
            &self.response,
            &self.security_key,
            &self.status_detail,
            &self.tx_auth_no,
            &self.tx_type,
            &self.vendor_tx_code,
            &self.vps_tx_id,
        ]
        .into_iter()
        .flatten()
        .filter(|name| !name.is_empty())
        .collect();
        names.into_iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedirectConfig {
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    pub timeout_secs: u64,
    pub live_base_url: Option<String>,
    pub test_base_url: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            live_base_url: None,
            test_base_url: None,
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoints(&self) -> EndpointTable {
        let mut table = EndpointTable::default();
        if let Some(url) = &self.live_base_url {
            table.live_base_url = url.clone();
        }
        if let Some(url) = &self.test_base_url {
            table.test_base_url = url.clone();
        }
        table
    }
}

fn default_currency() -> String {
    "GBP".to_string()
}

impl GatewayConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| GatewayError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vendor.trim().is_empty() {
            return Err(GatewayError::configuration("vendor is required"));
        }
        if self.vendor_tx_code_prefix.len() > MAX_PREFIX_LEN {
            return Err(GatewayError::configuration(format!(
                "vendor_tx_code_prefix must be at most {} characters",
                MAX_PREFIX_LEN
            )));
        }
        if self.avs_cv2 > 3 {
            return Err(GatewayError::configuration("avs_cv2 must be 0-3"));
        }
        if self.three_d_secure.apply > 3 {
            return Err(GatewayError::configuration("three_d_secure.apply must be 0-3"));
        }
        if !self.three_d_secure.notification_url.starts_with('/') {
            return Err(GatewayError::configuration(
                "three_d_secure.notification_url must be a root-relative path",
            ));
        }
        if !self.paypal_callback_url.is_empty() && !self.paypal_callback_url.starts_with('/') {
            return Err(GatewayError::configuration(
                "paypal_callback_url must be a root-relative path",
            ));
        }
        for code in self.accepted_types.keys() {
            code.parse::<CardBrand>().map_err(|_| {
                GatewayError::configuration(format!("accepted_types has unknown card type {}", code))
            })?;
        }
        if self.test.trigger_score == 0 {
            return Err(GatewayError::configuration("test.trigger_score must be at least 1"));
        }
        let weights = &self.test.weight;
        let bounded = [
            ("test.trigger_score", self.test.trigger_score),
            ("test.weight.card_numbers", weights.card_numbers),
            ("test.weight.fields", weights.fields),
            ("test.weight.ip_addresses", weights.ip_addresses),
            ("test.weight.hosts", weights.hosts),
        ];
        for (name, value) in bounded {
            if value > MAX_TRIGGER_SCORE {
                return Err(GatewayError::configuration(format!(
                    "{} must be at most {}",
                    name, MAX_TRIGGER_SCORE
                )));
            }
        }
        if self.gateway.timeout_secs == 0 {
            return Err(GatewayError::configuration("gateway.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// An empty table accepts every brand.
    pub fn accepts(&self, brand: CardBrand) -> bool {
        self.accepted_types.is_empty()
            || self
                .accepted_types
                .get(brand.code())
                .is_some_and(|label| !label.is_empty())
    }
}
