use crate::config::TestTriggerConfig;
use crate::domain::browser::RequestContext;
use crate::domain::card::{Card, normalize_digits};
use crate::domain::gateway::TransactionMode;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub score: u32,
    pub mode: TransactionMode,
}

/// Weighted heuristic deciding whether a transaction goes to the test
/// endpoint. Each matching trigger adds its configured weight; a magic card
/// holder short-circuits to test mode.
pub struct TestModeClassifier<'a> {
    config: &'a TestTriggerConfig,
}

impl<'a> TestModeClassifier<'a> {
    pub fn new(config: &'a TestTriggerConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, card: &Card, context: &RequestContext) -> Classification {
        if card.is_magic_test_value() {
            return Classification {
                score: self.config.trigger_score,
                mode: TransactionMode::Test,
            };
        }

        let weights = &self.config.weight;
        let mut score: u32 = 0;

        if self
            .config
            .card_numbers
            .iter()
            .any(|number| normalize_digits(number) == card.number())
        {
            score = score.saturating_add(weights.card_numbers);
        }
        if self.config.ip_addresses.iter().any(|ip| ip == &context.client_ip) {
            score = score.saturating_add(weights.ip_addresses);
        }
        if self
            .config
            .hosts
            .iter()
            .any(|host| host.eq_ignore_ascii_case(&context.host))
        {
            score = score.saturating_add(weights.hosts);
        }
        // TODO: add `weight.fields` per `test.fields` entry matching a request
        // field (e.g. cardHolder). Until then the category scores nothing.
        if !self.config.fields.is_empty() {
            debug!("test.fields triggers are configured but not scored");
        }

        let mode = if score >= self.config.trigger_score {
            TransactionMode::Test
        } else {
            TransactionMode::Live
        };
        Classification { score, mode }
    }
}
