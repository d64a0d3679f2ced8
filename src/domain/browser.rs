use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Client environment attributes sent with the registration for issuer risk
/// scoring. Captured once from the inbound checkout request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserFingerprint {
    pub challenge_window_size: String,
    pub color_depth: String,
    pub java_enabled: String,
    pub javascript_enabled: String,
    pub language: String,
    pub screen_height: String,
    pub screen_width: String,
    pub timezone: String,
    pub accept_header: String,
    pub user_agent: String,
}

impl BrowserFingerprint {
    /// Maps the `sp4_*` form fields (populated client-side by script) and the
    /// request headers into a fingerprint. Missing values become empty strings.
    pub fn from_request(
        form: &HashMap<String, String>,
        headers: &HashMap<String, String>,
    ) -> Self {
        let field = |name: &str| form.get(name).cloned().unwrap_or_default();
        let header = |name: &str| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        };

        let mut language = field("sp4_Language");
        if language.is_empty() {
            language = header("Accept-Language");
        }

        Self {
            challenge_window_size: field("sp4_ChallengeWindowSize"),
            color_depth: field("sp4_ColourDepth"),
            java_enabled: flag(&field("sp4_JavaEnabled")),
            javascript_enabled: flag(&field("sp4_JavascriptEnabled")),
            language,
            screen_height: field("sp4_ScreenHeight"),
            screen_width: field("sp4_ScreenWidth"),
            timezone: field("sp4_TZ"),
            accept_header: header("Accept"),
            user_agent: header("User-Agent"),
        }
    }
}

/// Flags go over the wire as "0"/"1"; the form may post "true"/"false".
fn flag(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => "1".to_string(),
        _ => "0".to_string(),
    }
}

/// Server-side facts about the inbound request that the core needs and would
/// otherwise read from ambient server state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub client_ip: String,
    pub host: String,
    pub secure: bool,
}

impl RequestContext {
    pub fn new(client_ip: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            client_ip: client_ip.into(),
            host: host.into(),
            secure: true,
        }
    }

    /// Turns a root-relative path into an absolute URL on the request host.
    pub fn absolute_url(&self, path: &str) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host, path)
    }
}
