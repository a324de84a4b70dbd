//! The sommelier use case exposed to the chat UI.
//!
//! Four operations mirror what the chat surface needs: validating input,
//! consuming quota, displaying quota, and asking. [`SommelierService::submit`]
//! chains them in the order that guarantees a rejected question costs
//! neither quota nor an upstream call.
//!
//! Nothing here returns an error to the caller: upstream failures become
//! [`ParsedResponse::technical_difficulty`], malformed replies are recovered
//! by [`response::parse`].

use crate::query_dispatcher::QueryDispatcher;
use serde::Serialize;
use sommelier_core::Result;
use sommelier_core::catalog::Product;
use sommelier_core::clock::Clock;
use sommelier_core::config::SommelierConfig;
use sommelier_core::conversation::ConversationTurn;
use sommelier_core::generation::GenerationBackend;
use sommelier_core::quota::{QuotaStore, RateLimitDecision, RateLimitInfo};
use sommelier_core::response::{self, ParsedResponse};
use sommelier_core::storage::KeyValueStore;
use sommelier_core::validation::{InputValidator, RejectionReason, ValidationResult};
use sommelier_interaction::ModelResolver;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why [`SommelierService::submit`] did not reach the upstream service.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitRejection {
    /// The question failed validation. No quota was consumed.
    #[error("question rejected: {reason}")]
    Validation { reason: RejectionReason },

    /// The quota window is exhausted.
    #[error("quota exhausted, resets in {}s", .reset_in.as_secs())]
    QuotaExceeded { reset_in: Duration },
}

impl SubmitRejection {
    /// Message shown to the shopper.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { reason } => reason.user_message().to_string(),
            Self::QuotaExceeded { reset_in } => format!(
                "You've reached the limit of sommelier questions for now. Please come back in {}.",
                humanize(*reset_in)
            ),
        }
    }
}

/// Entry point of the sommelier pipeline.
pub struct SommelierService {
    validator: InputValidator,
    quota: QuotaStore,
    dispatcher: QueryDispatcher,
}

impl SommelierService {
    pub fn new(validator: InputValidator, quota: QuotaStore, dispatcher: QueryDispatcher) -> Self {
        Self {
            validator,
            quota,
            dispatcher,
        }
    }

    /// Wires the whole pipeline from configuration and its ports.
    ///
    /// `resolver` is shared so its cached model outlives this service.
    pub fn from_config(
        config: &SommelierConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        fingerprint: impl Into<String>,
        backend: Arc<dyn GenerationBackend>,
        resolver: Arc<ModelResolver>,
    ) -> Result<Self> {
        let validator = InputValidator::new(config.validation.clone());
        let quota = QuotaStore::new(store, clock, fingerprint, config.quota.clone());
        let dispatcher = QueryDispatcher::new(backend, resolver, config.dispatch.clone())?;
        Ok(Self::new(validator, quota, dispatcher))
    }

    pub fn validate_input(&self, text: &str) -> ValidationResult {
        self.validator.validate(text)
    }

    /// Consumes one unit of quota if any is left.
    pub fn check_rate_limit(&self) -> RateLimitDecision {
        self.quota.check_and_consume()
    }

    /// Current usage, for display. Has no side effect.
    pub fn rate_limit_info(&self) -> RateLimitInfo {
        self.quota.peek()
    }

    /// Asks the upstream service and parses the reply.
    ///
    /// Does not validate or consume quota; see [`Self::submit`].
    pub async fn ask_sommelier(
        &self,
        question: &str,
        catalog: &[Product],
        history: &[ConversationTurn],
    ) -> ParsedResponse {
        match self.dispatcher.ask(question, catalog, history).await {
            Ok(raw) => {
                let parsed = response::parse(&raw);
                debug!(
                    recommended = parsed.recommended_ids.len(),
                    "Parsed sommelier reply"
                );
                parsed
            }
            Err(err) => {
                warn!(error = %err, "Sommelier query failed");
                ParsedResponse::technical_difficulty()
            }
        }
    }

    /// Validates, consumes quota, then asks.
    pub async fn submit(
        &self,
        question: &str,
        catalog: &[Product],
        history: &[ConversationTurn],
    ) -> std::result::Result<ParsedResponse, SubmitRejection> {
        let validation = self.validate_input(question);
        if let Some(reason) = validation.reason {
            debug!(%reason, "Question rejected by validator");
            return Err(SubmitRejection::Validation { reason });
        }

        let decision = self.check_rate_limit();
        if !decision.allowed {
            info!(
                reset_in_secs = decision.reset_in.as_secs(),
                "Question rejected by quota"
            );
            return Err(SubmitRejection::QuotaExceeded {
                reset_in: decision.reset_in,
            });
        }

        Ok(self.ask_sommelier(question, catalog, history).await)
    }
}

fn humanize(duration: Duration) -> String {
    let minutes = duration.as_secs().div_ceil(60).max(1);
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h} h"),
        (h, m) => format!("{h} h {m} min"),
    }
}
