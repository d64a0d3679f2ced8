//! Issuer-authentication detour.
//!
//! A registration answered with `Status=3DAUTH` moves the transaction to
//! `PendingRedirect`, the caller renders the challenge form (`AwaitingCallback`)
//! and the issuer's callback completes it. Any other registration status ends
//! at `NoChallenge`.

use crate::domain::gateway::{FormFields, TransactionMode};
use crate::domain::response::GatewayResponse;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const IFRAME_FORM_ID: &str = "sp4-3ds-iframe-form";
pub const PAGE_FORM_ID: &str = "sp4-3ds-form";

/// Height used when the requested window size has no fixed dimensions.
pub const FALLBACK_WINDOW_HEIGHT: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V1,
    V2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrongAuthState {
    NoChallenge,
    PendingRedirect(ProtocolVersion),
    AwaitingCallback,
    Completed(AuthOutcome),
}

/// Per-caller state persisted between registration and the issuer callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongAuthSession {
    pub acs_url: String,
    pub challenge_window_size: String,
    pub pa_req: Option<String>,
    pub md: Option<String>,
    pub creq: Option<String>,
    pub vps_tx_id: Option<String>,
    pub mode: TransactionMode,
}

impl StrongAuthSession {
    /// Builds the session from a `3DAUTH` registration response.
    pub fn from_response(
        response: &GatewayResponse,
        challenge_window_size: &str,
        mode: TransactionMode,
    ) -> Result<Self> {
        let acs_url = response
            .acs_url()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::protocol("3DAUTH response has no ACSURL"))?;

        Ok(Self {
            acs_url: acs_url.to_string(),
            challenge_window_size: challenge_window_size.to_string(),
            pa_req: response.pa_req().map(str::to_string),
            md: response.md().map(str::to_string),
            creq: response.creq().map(str::to_string),
            vps_tx_id: response.vps_tx_id().map(str::to_string),
            mode,
        })
    }

    /// V1 when both legacy correlation fields came back, otherwise V2.
    pub fn version(&self) -> ProtocolVersion {
        if self.pa_req.is_some() && self.md.is_some() {
            ProtocolVersion::V1
        } else {
            ProtocolVersion::V2
        }
    }

    pub fn window(&self) -> ChallengeWindow {
        ChallengeWindow::from_code(&self.challenge_window_size)
    }

    /// Fields the issuer's access control server expects, for the stored
    /// protocol version only.
    pub fn challenge_form(&self, in_iframe: bool, term_url: &str) -> ChallengeForm {
        let mut fields = Vec::new();
        match self.version() {
            ProtocolVersion::V1 => {
                fields.push(("PaReq".to_string(), self.pa_req.clone().unwrap_or_default()));
                fields.push(("TermUrl".to_string(), term_url.to_string()));
                fields.push(("MD".to_string(), self.md.clone().unwrap_or_default()));
            }
            ProtocolVersion::V2 => {
                fields.push(("creq".to_string(), self.creq.clone().unwrap_or_default()));
                fields.push((
                    "threeDSSessionData".to_string(),
                    self.vps_tx_id.clone().unwrap_or_default(),
                ));
            }
        }

        ChallengeForm {
            form_id: if in_iframe { IFRAME_FORM_ID } else { PAGE_FORM_ID },
            acs_url: self.acs_url.clone(),
            fields,
            window: self.window(),
        }
    }

    /// Correlation payload for the authentication callback, built from what
    /// the issuer posted back.
    pub fn callback_payload(&self, callback: &HashMap<String, String>) -> Result<FormFields> {
        let mut payload = FormFields::new();
        match self.version() {
            ProtocolVersion::V1 => {
                let md = required(callback, "MD")?;
                let pa_res = required(callback, "PaRes")?;
                payload.insert("MD".to_string(), md.to_string());
                payload.insert("PARes".to_string(), pa_res.to_string());
            }
            ProtocolVersion::V2 => {
                let cres = required(callback, "cres")?;
                let vps_tx_id = self
                    .vps_tx_id
                    .as_deref()
                    .or_else(|| callback.get("threeDSSessionData").map(String::as_str))
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        GatewayError::validation("Callback cannot be correlated: no VPSTxId")
                    })?;
                payload.insert("VPSTxId".to_string(), vps_tx_id.to_string());
                payload.insert("CRes".to_string(), cres.to_string());
            }
        }
        Ok(payload)
    }
}

fn required<'a>(callback: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    callback
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| GatewayError::validation(format!("Issuer callback is missing {}", name)))
}

/// Challenge iframe dimensions for the browser-declared window size code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeWindow {
    Fixed { width: u32, height: u32 },
    FullWidth { height: u32 },
}

impl ChallengeWindow {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "01" => ChallengeWindow::Fixed { width: 250, height: 400 },
            "02" => ChallengeWindow::Fixed { width: 390, height: 400 },
            "03" => ChallengeWindow::Fixed { width: 500, height: 600 },
            "04" => ChallengeWindow::Fixed { width: 600, height: 400 },
            _ => ChallengeWindow::FullWidth {
                height: FALLBACK_WINDOW_HEIGHT,
            },
        }
    }
}

/// Raw values for the template layer to render the issuer challenge form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeForm {
    pub form_id: &'static str,
    pub acs_url: String,
    pub fields: Vec<(String, String)>,
    pub window: ChallengeWindow,
}

impl StrongAuthState {
    /// Initial transition on the registration response. Returns the session
    /// to persist when a challenge is required.
    pub fn on_registration(
        response: &GatewayResponse,
        challenge_window_size: &str,
        mode: TransactionMode,
    ) -> Result<(Self, Option<StrongAuthSession>)> {
        if response.requires_strong_auth() {
            let session = StrongAuthSession::from_response(response, challenge_window_size, mode)?;
            Ok((StrongAuthState::PendingRedirect(session.version()), Some(session)))
        } else {
            Ok((StrongAuthState::NoChallenge, None))
        }
    }

    /// The caller has been handed the challenge form.
    pub fn begin_redirect(self) -> Result<Self> {
        match self {
            StrongAuthState::PendingRedirect(_) | StrongAuthState::AwaitingCallback => {
                Ok(StrongAuthState::AwaitingCallback)
            }
            other => Err(GatewayError::validation(format!(
                "No issuer challenge is pending (state {:?})",
                other
            ))),
        }
    }

    /// Terminal transition on the callback response. Failures are final.
    pub fn on_callback(response: &GatewayResponse) -> Self {
        if response.is_success() {
            StrongAuthState::Completed(AuthOutcome::Succeeded)
        } else {
            StrongAuthState::Completed(AuthOutcome::Failed)
        }
    }

    pub fn redirect_required(&self) -> bool {
        matches!(
            self,
            StrongAuthState::PendingRedirect(_) | StrongAuthState::AwaitingCallback
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_response() -> GatewayResponse {
        GatewayResponse::parse("Status=3DAUTH\nACSURL=https://issuer/acs\nPAReq=req1\nMD=md1\n")
            .unwrap()
    }

    fn v2_response() -> GatewayResponse {
        GatewayResponse::parse(
            "Status=3DAUTH\nACSURL=https://issuer/acs2\nCReq=creq1\nVPSTxId={ABC}\n",
        )
        .unwrap()
    }

    #[test]
    fn test_registration_without_challenge() {
        let response = GatewayResponse::parse("Status=OK\n").unwrap();
        let (state, session) =
            StrongAuthState::on_registration(&response, "01", TransactionMode::Test).unwrap();
        assert_eq!(state, StrongAuthState::NoChallenge);
        assert!(session.is_none());
        assert!(!state.redirect_required());
    }

    #[test]
    fn test_registration_v1_challenge() {
        let (state, session) =
            StrongAuthState::on_registration(&v1_response(), "02", TransactionMode::Test)
                .unwrap();
        let session = session.unwrap();
        assert_eq!(state, StrongAuthState::PendingRedirect(ProtocolVersion::V1));
        assert_eq!(session.acs_url, "https://issuer/acs");
        assert_eq!(session.md.as_deref(), Some("md1"));
        assert!(state.redirect_required());
    }

    #[test]
    fn test_registration_v2_challenge() {
        let (state, session) =
            StrongAuthState::on_registration(&v2_response(), "05", TransactionMode::Live)
                .unwrap();
        assert_eq!(state, StrongAuthState::PendingRedirect(ProtocolVersion::V2));
        assert_eq!(session.unwrap().creq.as_deref(), Some("creq1"));
    }

    #[test]
    fn test_challenge_without_acs_url_is_protocol_error() {
        let response = GatewayResponse::parse("Status=3DAUTH\nPAReq=a\nMD=b\n").unwrap();
        assert!(matches!(
            StrongAuthState::on_registration(&response, "01", TransactionMode::Test),
            Err(GatewayError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_state_transitions() {
        let pending = StrongAuthState::PendingRedirect(ProtocolVersion::V1);
        let awaiting = pending.begin_redirect().unwrap();
        assert_eq!(awaiting, StrongAuthState::AwaitingCallback);
        assert!(StrongAuthState::NoChallenge.begin_redirect().is_err());

        let ok = GatewayResponse::parse("Status=AUTHENTICATED").unwrap();
        assert_eq!(
            StrongAuthState::on_callback(&ok),
            StrongAuthState::Completed(AuthOutcome::Succeeded)
        );
        let failed = GatewayResponse::parse("Status=NOTAUTHED").unwrap();
        assert_eq!(
            StrongAuthState::on_callback(&failed),
            StrongAuthState::Completed(AuthOutcome::Failed)
        );
    }

    #[test]
    fn test_challenge_form_fields_per_version() {
        let v1 = StrongAuthSession::from_response(&v1_response(), "03", TransactionMode::Test)
            .unwrap();
        let form = v1.challenge_form(true, "https://shop/3ds");
        assert_eq!(form.form_id, IFRAME_FORM_ID);
        let names: Vec<&str> = form.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["PaReq", "TermUrl", "MD"]);
        assert_eq!(form.window, ChallengeWindow::Fixed { width: 500, height: 600 });

        let v2 = StrongAuthSession::from_response(&v2_response(), "xx", TransactionMode::Test)
            .unwrap();
        let form = v2.challenge_form(false, "https://shop/3ds");
        assert_eq!(form.form_id, PAGE_FORM_ID);
        let names: Vec<&str> = form.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["creq", "threeDSSessionData"]);
        assert_eq!(
            form.window,
            ChallengeWindow::FullWidth { height: FALLBACK_WINDOW_HEIGHT }
        );
    }

    #[test]
    fn test_window_codes() {
        assert_eq!(
            ChallengeWindow::from_code("01"),
            ChallengeWindow::Fixed { width: 250, height: 400 }
        );
        assert_eq!(
            ChallengeWindow::from_code("04"),
            ChallengeWindow::Fixed { width: 600, height: 400 }
        );
        assert!(matches!(
            ChallengeWindow::from_code(""),
            ChallengeWindow::FullWidth { .. }
        ));
    }

    #[test]
    fn test_callback_payload_v1() {
        let session =
            StrongAuthSession::from_response(&v1_response(), "01", TransactionMode::Test).unwrap();
        let callback: HashMap<String, String> = [("MD", "md1"), ("PaRes", "res1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let payload = session.callback_payload(&callback).unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload["MD"], "md1");
        assert_eq!(payload["PARes"], "res1");

        let missing: HashMap<String, String> = HashMap::new();
        assert!(matches!(
            session.callback_payload(&missing),
            Err(GatewayError::ValidationError(_))
        ));
    }

    #[test]
    fn test_callback_payload_v2() {
        let session =
            StrongAuthSession::from_response(&v2_response(), "01", TransactionMode::Test).unwrap();
        let callback: HashMap<String, String> =
            [("cres".to_string(), "cres1".to_string())].into_iter().collect();
        let payload = session.callback_payload(&callback).unwrap();
        assert_eq!(payload["VPSTxId"], "{ABC}");
        assert_eq!(payload["CRes"], "cres1");
    }

    #[test]
    fn test_session_serializes_for_store() {
        let session =
            StrongAuthSession::from_response(&v1_response(), "01", TransactionMode::Test).unwrap();
        let blob = serde_json::to_string(&session).unwrap();
        let back: StrongAuthSession = serde_json::from_str(&blob).unwrap();
        assert_eq!(back, session);
    }
}
