use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Protocol version sent as `VPSProtocol` on every registration.
pub const VPS_PROTOCOL: &str = "4.00";

/// Flat, form-encodable request payload keyed by gateway field name.
pub type FormFields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMode {
    Live,
    Test,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionMode::Live => f.write_str("live"),
            TransactionMode::Test => f.write_str("test"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Registration,
    AuthCallback,
}

impl EndpointKind {
    fn path(&self) -> &'static str {
        match self {
            EndpointKind::Registration => "vspdirect-register.vsp",
            EndpointKind::AuthCallback => "direct3dcallback.vsp",
        }
    }
}

/// Live and test base URLs; each endpoint appends its own path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    pub live_base_url: String,
    pub test_base_url: String,
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self {
            live_base_url: "https://live.sagepay.com/gateway/service/".to_string(),
            test_base_url: "https://test.sagepay.com/gateway/service/".to_string(),
        }
    }
}

impl EndpointTable {
    pub fn url(&self, kind: EndpointKind, mode: TransactionMode) -> String {
        let base = match mode {
            TransactionMode::Live => &self.live_base_url,
            TransactionMode::Test => &self.test_base_url,
        };
        format!("{}/{}", base.trim_end_matches('/'), kind.path())
    }
}
