use crate::error::{GatewayError, Result};
use std::collections::BTreeMap;

/// Statuses that end a transaction successfully.
pub const SUCCESS_STATUSES: [&str; 3] = ["OK", "AUTHENTICATED", "REGISTERED"];

/// Status that diverts the transaction through issuer authentication.
pub const STRONG_AUTH_STATUS: &str = "3DAUTH";

/// Decoded gateway response.
///
/// The field set differs by response type, so the mapping stays open; the
/// accessors cover only the fields the coordinator itself depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayResponse {
    fields: BTreeMap<String, String>,
}

impl GatewayResponse {
    /// Parses a line-feed delimited body of `Name=Value` lines.
    ///
    /// Each non-empty line is split once on the first `=`; the value side is
    /// trimmed. A non-empty line without a separator is a protocol error.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for line in raw.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            let (name, value) = line.split_once('=').ok_or_else(|| {
                GatewayError::protocol(format!("Response line '{}' has no '=' separator", line))
            })?;
            fields.insert(name.to_string(), value.trim().to_string());
        }
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// `Status` is mandatory on every response.
    pub fn status(&self) -> Result<&str> {
        self.get("Status")
            .ok_or_else(|| GatewayError::protocol("Response has no Status field"))
    }

    pub fn status_detail(&self) -> Option<&str> {
        self.get("StatusDetail")
    }

    pub fn acs_url(&self) -> Option<&str> {
        self.get("ACSURL")
    }

    pub fn pa_req(&self) -> Option<&str> {
        self.get("PAReq")
    }

    pub fn md(&self) -> Option<&str> {
        self.get("MD")
    }

    pub fn creq(&self) -> Option<&str> {
        self.get("CReq")
    }

    pub fn vps_tx_id(&self) -> Option<&str> {
        self.get("VPSTxId")
    }

    pub fn is_success(&self) -> bool {
        self.get("Status")
            .is_some_and(|status| SUCCESS_STATUSES.contains(&status))
    }

    pub fn requires_strong_auth(&self) -> bool {
        self.get("Status") == Some(STRONG_AUTH_STATUS)
    }

    /// Overlays another response; later values win.
    pub fn merge(&mut self, other: GatewayResponse) {
        self.fields.extend(other.fields);
    }
}
