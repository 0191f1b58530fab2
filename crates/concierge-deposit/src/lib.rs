// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deposit decision engine.
//!
//! Each turn first checks whether the latest user message explicitly agrees
//! to a deposit or rules one out. Only when it does neither, and the recent
//! turns mention a deposit at all, is the LLM classifier consulted. Classifier failures are
//! never surfaced as errors: they mean "do not collect".

pub mod agreement;
pub mod classifier;
pub mod patterns;
pub mod reconcile;

use std::time::Duration;

use concierge_core::{
    ConciergeError, Deadline, DepositIntent, LlmRequest, Message, MeteredLlm, MetricEvent,
};
use rand::Rng;
use tracing::{debug, info, warn};

pub use agreement::{
    Agreement, conversation_has_deposit_agreement, latest_turn_agreed, latest_turn_verdict,
    should_attempt_classification,
};
pub use classifier::{ClassifierDecision, parse_decision};
pub use reconcile::reconcile;

pub const DEPOSIT_DECISION_TOTAL: &str = "concierge_deposit_decision_total";

const LOG_TRUNCATE_BYTES: usize = 512;

/// Tunables for the deposit engine.
#[derive(Debug, Clone)]
pub struct DepositSettings {
    pub model: String,
    pub default_amount_cents: i64,
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Non-system turns scanned before spending a classifier call.
    pub lookback: usize,
    /// Fraction of classifier failures that are logged.
    pub log_sample_rate: f64,
}

impl Default for DepositSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            default_amount_cents: 5000,
            description: "Appointment deposit".to_string(),
            success_url: String::new(),
            cancel_url: String::new(),
            max_tokens: 256,
            timeout: Duration::from_secs(25),
            lookback: 8,
            log_sample_rate: 0.1,
        }
    }
}

/// Outcome label on the decision counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Collect,
    Skip,
    Error,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Skip => "skip",
            Self::Error => "error",
        }
    }
}

pub struct DepositEngine {
    llm: MeteredLlm,
    settings: DepositSettings,
}

impl DepositEngine {
    pub fn new(llm: MeteredLlm, settings: DepositSettings) -> Self {
        Self { llm, settings }
    }

    fn default_intent(&self) -> DepositIntent {
        DepositIntent {
            amount_cents: self.settings.default_amount_cents,
            description: self.settings.description.clone(),
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
        }
    }

    /// Decides whether this turn should collect a deposit.
    ///
    /// Returns an error only when the turn deadline has already expired;
    /// every other classifier failure is "no decision".
    pub async fn decide(
        &self,
        history: &[Message],
        deadline: &Deadline,
    ) -> Result<Option<DepositIntent>, ConciergeError> {
        match latest_turn_verdict(history) {
            Agreement::Agreed => {
                let intent = self.default_intent();
                info!(amount_cents = intent.amount_cents, "deposit intent from explicit agreement");
                return Ok(Some(intent));
            }
            Agreement::Declined => {
                debug!("deposit ruled out by the latest reply");
                return Ok(None);
            }
            Agreement::Undecided => {}
        }
        if !should_attempt_classification(history, self.settings.lookback) {
            debug!("deposit classifier skipped, no deposit context");
            return Ok(None);
        }
        match self.classify(history, deadline).await {
            Ok(intent) => Ok(intent),
            Err(e @ ConciergeError::Timeout { .. }) if deadline.expired() => Err(e),
            Err(e) => {
                warn!(error = %e, "deposit classification failed");
                Ok(None)
            }
        }
    }

    async fn classify(
        &self,
        history: &[Message],
        deadline: &Deadline,
    ) -> Result<Option<DepositIntent>, ConciergeError> {
        let transcript = classifier::condense_transcript(history, self.settings.lookback);
        let request = LlmRequest {
            model: self.settings.model.clone(),
            system_prompts: vec![classifier::system_prompt(self.settings.default_amount_cents)],
            messages: vec![Message::user(format!("Conversation:\n{transcript}"))],
            max_tokens: self.settings.max_tokens,
            temperature: 0.0,
        };

        let response = match self
            .llm
            .complete(request, deadline.budget(self.settings.timeout))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.record(Outcome::Error).await;
                self.maybe_log_failure("", &e);
                return Err(e);
            }
        };

        let decision = match parse_decision(&response.text) {
            Ok(decision) => decision,
            Err(e) => {
                self.record(Outcome::Error).await;
                self.maybe_log_failure(&response.text, &e);
                return Err(e);
            }
        };

        if !decision.collect {
            self.record(Outcome::Skip).await;
            debug!(model = %self.settings.model, "deposit classifier declined");
            return Ok(None);
        }

        let defaults = self.default_intent();
        let non_empty = |value: String, fallback: String| {
            if value.trim().is_empty() { fallback } else { value }
        };
        let intent = DepositIntent {
            amount_cents: if decision.amount_cents > 0 {
                decision.amount_cents
            } else {
                defaults.amount_cents
            },
            description: non_empty(decision.description, defaults.description),
            success_url: non_empty(decision.success_url, defaults.success_url),
            cancel_url: non_empty(decision.cancel_url, defaults.cancel_url),
        };
        self.record(Outcome::Collect).await;
        info!(
            model = %self.settings.model,
            amount_cents = intent.amount_cents,
            success_url_set = !intent.success_url.is_empty(),
            "deposit classifier collected"
        );
        Ok(Some(intent))
    }

    async fn record(&self, outcome: Outcome) {
        self.llm
            .emit(MetricEvent::counter(
                DEPOSIT_DECISION_TOTAL,
                1,
                &[("model", &self.settings.model), ("outcome", outcome.as_str())],
            ))
            .await;
    }

    fn maybe_log_failure(&self, raw: &str, err: &ConciergeError) {
        let rate = self.settings.log_sample_rate.clamp(0.0, 1.0);
        if !rand::thread_rng().gen_bool(rate) {
            return;
        }
        warn!(
            model = %self.settings.model,
            error = %err,
            raw = %classifier::truncate_for_log(raw, LOG_TRUNCATE_BYTES),
            "deposit classifier error"
        );
    }
}
