// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deadline-bounded collaborator calls and metered LLM completions.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ConciergeError;
use crate::traits::{LlmClient, MetricsRecorder};
use crate::types::{LlmRequest, LlmResponse, MetricEvent};

pub const LLM_LATENCY_SECONDS: &str = "concierge_llm_latency_seconds";
pub const LLM_TOKENS_TOTAL: &str = "concierge_llm_tokens_total";

/// Wall-clock deadline of one turn. Unbounded when the caller set none.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn unbounded() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.map(|t| Instant::now() + t),
        }
    }

    /// The shorter of `per_call` and the time left before the deadline.
    pub fn budget(&self, per_call: Duration) -> Duration {
        match self.at {
            Some(at) => per_call.min(at.saturating_duration_since(Instant::now())),
            None => per_call,
        }
    }

    /// Time left, or `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Runs `fut` under `budget`; expiry becomes [`ConciergeError::Timeout`].
pub async fn with_budget<T, F>(budget: Duration, fut: F) -> Result<T, ConciergeError>
where
    F: Future<Output = Result<T, ConciergeError>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ConciergeError::Timeout { duration: budget }),
    }
}

/// Runs `fut` until the turn deadline. Unbounded deadlines never time out.
pub async fn within_deadline<T, F>(deadline: &Deadline, fut: F) -> Result<T, ConciergeError>
where
    F: Future<Output = Result<T, ConciergeError>>,
{
    match deadline.remaining() {
        Some(left) => with_budget(left, fut).await,
        None => fut.await,
    }
}

/// An LLM client that records latency and token metrics per call.
#[derive(Clone)]
pub struct MeteredLlm {
    client: Arc<dyn LlmClient>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl MeteredLlm {
    pub fn new(client: Arc<dyn LlmClient>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { client, metrics }
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsRecorder> {
        &self.metrics
    }

    /// Sends `request` under `budget`. Metric failures are logged and ignored.
    pub async fn complete(
        &self,
        request: LlmRequest,
        budget: Duration,
    ) -> Result<LlmResponse, ConciergeError> {
        let model = request.model.clone();
        let start = Instant::now();
        let result = with_budget(budget, self.client.complete(request)).await;
        let status = if result.is_ok() { "ok" } else { "error" };

        self.emit(MetricEvent::histogram(
            LLM_LATENCY_SECONDS,
            start.elapsed().as_secs_f64(),
            &[("model", &model), ("status", status)],
        ))
        .await;

        if let Ok(response) = &result {
            let usage = response.usage;
            for (kind, count) in [
                ("input", usage.input_tokens),
                ("output", usage.output_tokens),
                ("total", usage.total()),
            ] {
                if count > 0 {
                    self.emit(MetricEvent::counter(
                        LLM_TOKENS_TOTAL,
                        u64::from(count),
                        &[("model", &model), ("type", kind)],
                    ))
                    .await;
                }
            }
        }
        result
    }

    /// Records an event, logging instead of failing.
    pub async fn emit(&self, event: MetricEvent) {
        if let Err(e) = self.metrics.record(event).await {
            debug!(error = %e, "metric dropped");
        }
    }
}
