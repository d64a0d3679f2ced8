use crate::application::classifier::TestModeClassifier;
use crate::application::payload::PayloadBuilder;
use crate::application::transaction_log::{LogContext, log_entry};
use crate::config::GatewayConfig;
use crate::domain::browser::RequestContext;
use crate::domain::gateway::{EndpointKind, TransactionMode};
use crate::domain::ports::{GatewayTransportBox, SessionStoreBox, TransactionLogBox};
use crate::domain::response::GatewayResponse;
use crate::domain::strong_auth::{AuthOutcome, ChallengeForm, StrongAuthSession, StrongAuthState};
use crate::domain::transaction::{TransactionDraft, generate_vendor_tx_code};
use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Session key holding the serialized `StrongAuthSession`.
pub const SESSION_KEY_STRONG_AUTH: &str = "sagepay.strong_auth";
/// Session key holding the vendor transaction code awaiting a callback.
pub const SESSION_KEY_VENDOR_TX_CODE: &str = "sagepay.vendor_tx_code";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub vendor_tx_code: String,
    pub mode: TransactionMode,
    pub redirect_required: bool,
}

/// Drives one caller session through registration and, when the issuer asks
/// for it, the strong-authentication callback.
///
/// Each operation performs at most one gateway round trip. Cross-request state
/// lives only in the injected session store, keyed by `session_id`.
pub struct TransactionCoordinator {
    config: GatewayConfig,
    transport: GatewayTransportBox,
    sessions: SessionStoreBox,
    log: Option<TransactionLogBox>,
    session_id: String,
    state: StrongAuthState,
    response: GatewayResponse,
    vendor_tx_code: Option<String>,
}

impl TransactionCoordinator {
    pub fn new(
        config: GatewayConfig,
        transport: GatewayTransportBox,
        sessions: SessionStoreBox,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            config,
            transport,
            sessions,
            log: None,
            session_id: session_id.into(),
            state: StrongAuthState::NoChallenge,
            response: GatewayResponse::default(),
            vendor_tx_code: None,
        }
    }

    /// Hands every parsed response to a transaction log collaborator.
    pub fn with_log(mut self, log: TransactionLogBox) -> Self {
        self.log = Some(log);
        self
    }

    /// Registers a transaction with the gateway.
    ///
    /// Validation happens before anything is sent or stored. On return the
    /// pending-authentication session exists only if a redirect is required.
    pub async fn capture(
        &mut self,
        tx_type: &str,
        amount: &str,
        draft: TransactionDraft,
        context: &RequestContext,
    ) -> Result<CaptureOutcome> {
        let request = draft.validate(tx_type, amount, &self.config.currency)?;
        if let Some(brand) = request.card.brand()
            && !self.config.accepts(brand)
        {
            return Err(GatewayError::validation(format!(
                "Card type {} is not accepted",
                brand
            )));
        }

        let vendor_tx_code = request
            .vendor_tx_code
            .clone()
            .unwrap_or_else(|| generate_vendor_tx_code(&self.config.vendor_tx_code_prefix));
        let fields = PayloadBuilder::new(&self.config, context).build(&request, &vendor_tx_code)?;
        let classification = TestModeClassifier::new(&self.config.test).classify(&request.card, context);
        let mode = classification.mode;
        info!(
            vendor_tx_code = %vendor_tx_code,
            card = %format!("****{}", request.card.last_four()),
            score = classification.score,
            %mode,
            "registering transaction"
        );

        // A stale challenge from an earlier attempt must not survive this one.
        self.clear_session().await?;

        let raw = self
            .transport
            .send(EndpointKind::Registration, mode, &fields)
            .await?;
        let response = GatewayResponse::parse(&raw)?;
        let status = response.status()?.to_string();
        info!(vendor_tx_code = %vendor_tx_code, status = %status, "registration response");

        // Session state is settled before the log sees the response.
        let (state, session) = StrongAuthState::on_registration(
            &response,
            &request.browser.challenge_window_size,
            mode,
        )?;
        if let Some(session) = session {
            self.store_session(&session, &vendor_tx_code).await?;
            debug!(version = ?session.version(), "issuer challenge pending");
        }

        let log_context = LogContext {
            vendor_tx_code: &vendor_tx_code,
            tx_type: Some(request.tx_type.code()),
            amount: Some(request.amount.to_string()),
            currency: Some(&request.currency),
            card_type: request.card.brand().map(|brand| brand.code()),
            card_digits: Some(request.card.last_four()),
            mode: Some(mode),
        };
        let logged = self.record(&log_context, &response).await;

        self.state = state;
        self.response = response;
        self.vendor_tx_code = Some(vendor_tx_code.clone());
        logged?;

        Ok(CaptureOutcome {
            vendor_tx_code,
            mode,
            redirect_required: self.state.redirect_required(),
        })
    }

    /// Raw values for the issuer challenge form. Moves a pending redirect to
    /// awaiting the callback.
    pub async fn challenge_form(
        &mut self,
        in_iframe: bool,
        context: &RequestContext,
    ) -> Result<ChallengeForm> {
        let session = self
            .load_session()
            .await?
            .ok_or_else(|| GatewayError::validation("No issuer challenge is pending"))?;
        if self.state == StrongAuthState::NoChallenge {
            self.state = StrongAuthState::PendingRedirect(session.version());
        }
        self.state = self.state.begin_redirect()?;
        let term_url = context.absolute_url(&self.config.three_d_secure.notification_url);
        Ok(session.challenge_form(in_iframe, &term_url))
    }

    /// Resumes the session after the issuer posts back.
    ///
    /// The stored session is deleted once the callback has been attempted,
    /// whatever the outcome.
    pub async fn complete_authentication(
        &mut self,
        callback: &HashMap<String, String>,
    ) -> Result<AuthOutcome> {
        let vendor_tx_code = self
            .sessions
            .get(&self.session_id, SESSION_KEY_VENDOR_TX_CODE)
            .await?
            .ok_or_else(|| {
                GatewayError::validation("No vendor transaction code is stored for this session")
            })?;
        let session = self.load_session().await?.ok_or_else(|| {
            GatewayError::validation("No issuer challenge is pending for this session")
        })?;
        let payload = session.callback_payload(callback)?;
        self.state = StrongAuthState::AwaitingCallback;

        info!(vendor_tx_code = %vendor_tx_code, mode = %session.mode, "sending authentication callback");
        let sent = self
            .transport
            .send(EndpointKind::AuthCallback, session.mode, &payload)
            .await;
        let cleared = self.clear_session().await;
        let raw = sent?;
        cleared?;

        let response = GatewayResponse::parse(&raw)?;
        let status = response.status()?.to_string();
        info!(vendor_tx_code = %vendor_tx_code, status = %status, "authentication callback response");

        let log_context = LogContext {
            vendor_tx_code: &vendor_tx_code,
            mode: Some(session.mode),
            ..Default::default()
        };
        let logged = self.record(&log_context, &response).await;

        self.state = StrongAuthState::on_callback(&response);
        self.response.merge(response);
        self.vendor_tx_code = Some(vendor_tx_code);
        logged?;

        match self.state {
            StrongAuthState::Completed(outcome) => Ok(outcome),
            _ => Ok(AuthOutcome::Failed),
        }
    }

    /// Deletes any pending challenge and vendor code for this session.
    pub async fn clear_session(&self) -> Result<()> {
        self.sessions
            .delete(&self.session_id, SESSION_KEY_STRONG_AUTH)
            .await?;
        self.sessions
            .delete(&self.session_id, SESSION_KEY_VENDOR_TX_CODE)
            .await
    }

    pub fn transaction_succeeded(&self) -> bool {
        self.response.is_success()
    }

    pub fn redirect_required(&self) -> bool {
        self.state.redirect_required()
    }

    pub fn state(&self) -> StrongAuthState {
        self.state
    }

    /// Accumulated response fields from this coordinator's calls.
    pub fn response(&self) -> &GatewayResponse {
        &self.response
    }

    pub fn vendor_tx_code(&self) -> Option<&str> {
        self.vendor_tx_code.as_deref()
    }

    /// Configured success or failure target once the transaction is terminal.
    pub fn redirect_target(&self) -> Option<&str> {
        if self.redirect_required() || self.response.fields().is_empty() {
            return None;
        }
        let redirects = &self.config.redirects;
        if self.transaction_succeeded() {
            redirects.success_url.as_deref()
        } else {
            redirects.failure_url.as_deref()
        }
    }

    async fn load_session(&self) -> Result<Option<StrongAuthSession>> {
        match self
            .sessions
            .get(&self.session_id, SESSION_KEY_STRONG_AUTH)
            .await?
        {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    async fn store_session(&self, session: &StrongAuthSession, vendor_tx_code: &str) -> Result<()> {
        let blob = serde_json::to_string(session)?;
        self.sessions
            .set(&self.session_id, SESSION_KEY_STRONG_AUTH, blob)
            .await?;
        if let Err(err) = self
            .sessions
            .set(
                &self.session_id,
                SESSION_KEY_VENDOR_TX_CODE,
                vendor_tx_code.to_string(),
            )
            .await
        {
            if let Err(cleanup) = self.clear_session().await {
                warn!(error = %cleanup, "failed to remove partially written session");
            }
            return Err(err);
        }
        Ok(())
    }

    async fn record(&self, context: &LogContext<'_>, response: &GatewayResponse) -> Result<()> {
        if let Some(log) = &self.log {
            let entry = log_entry(&self.config.log, context, response);
            if !entry.is_empty() {
                log.record(entry).await?;
            }
        }
        Ok(())
    }
}
