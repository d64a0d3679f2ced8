#![allow(dead_code)]

use async_trait::async_trait;
use sagepay_direct::config::GatewayConfig;
use sagepay_direct::domain::address::Address;
use sagepay_direct::domain::browser::{BrowserFingerprint, RequestContext};
use sagepay_direct::domain::card::Card;
use sagepay_direct::domain::gateway::{EndpointKind, FormFields, TransactionMode};
use sagepay_direct::domain::ports::GatewayTransport;
use sagepay_direct::domain::transaction::TransactionDraft;
use sagepay_direct::error::{GatewayError, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const CONFIG: &str = r#"
vendor = "shop"
vendor_tx_code_prefix = "web-"
description = "Web order"

[three_d_secure]
notification_url = "/checkout/3ds"

[test]
ip_addresses = ["10.0.0.1"]
hosts = ["staging.example.com"]
trigger_score = 2

[log]
mode_if_live = "L"
mode_if_test = "T"

[log.columns]
response = "status"
vendor_tx_code = "vendor_tx_code"
mode = "mode"

[redirects]
success_url = "/checkout/thanks"
failure_url = "/checkout/failed"
"#;

pub fn config() -> GatewayConfig {
    GatewayConfig::from_toml_str(CONFIG).expect("fixture config is valid")
}

pub fn staging_context() -> RequestContext {
    RequestContext::new("10.0.0.1", "staging.example.com")
}

pub fn draft(holder: &str) -> TransactionDraft {
    let address =
        Address::new("Jo", "Bloggs", "88", "", "London", "", "412", "GB", "").unwrap();
    TransactionDraft {
        card: Some(Card::new("4929 0000 0000 6", holder, "12", "30", "123")),
        billing_address: Some(address.clone()),
        delivery_address: Some(address),
        browser: Some(BrowserFingerprint {
            challenge_window_size: "02".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub endpoint: EndpointKind,
    pub mode: TransactionMode,
    pub fields: FormFields,
}

/// Replays canned response bodies in order and records what was sent.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<String>>>>,
    sent: Arc<Mutex<Vec<SentRequest>>>,
}

impl ScriptedTransport {
    pub fn new(bodies: &[&str]) -> Self {
        let transport = Self::default();
        for body in bodies {
            transport.push(Ok(body.to_string()));
        }
        transport
    }

    pub fn push(&self, response: Result<String>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    async fn send(
        &self,
        endpoint: EndpointKind,
        mode: TransactionMode,
        fields: &FormFields,
    ) -> Result<String> {
        self.sent.lock().unwrap().push(SentRequest {
            endpoint,
            mode,
            fields: fields.clone(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::TransportError("no scripted response".into())))
    }
}

/// Writes the fixture config with both gateway base URLs pointing at `base`.
pub fn config_file(dir: &Path, base: &str) -> PathBuf {
    let path = dir.join("config.toml");
    let contents = format!(
        "{}\n[gateway]\ntimeout_secs = 5\nlive_base_url = \"{}/\"\ntest_base_url = \"{}/\"\n",
        CONFIG, base, base
    );
    std::fs::write(&path, contents).unwrap();
    path
}

/// The request fixture with `replace` substitutions applied.
pub fn request_file(dir: &Path, replace: &[(&str, &str)]) -> PathBuf {
    let mut contents = std::fs::read_to_string("tests/fixtures/request.toml").unwrap();
    for (from, to) in replace {
        contents = contents.replace(from, to);
    }
    let path = dir.join("request.toml");
    std::fs::write(&path, contents).unwrap();
    path
}
