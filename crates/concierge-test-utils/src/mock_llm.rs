// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM client and recording metrics for deterministic testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use concierge_core::{
    ConciergeError, LlmClient, LlmRequest, LlmResponse, MetricEvent, MetricsRecorder, TokenUsage,
};

/// Default reply when nothing else matches.
pub const DEFAULT_REPLY: &str = "mock response";

#[derive(Debug, Clone)]
enum Failure {
    Upstream(String),
    Timeout(Duration),
    Other(String),
}

impl Failure {
    fn from_error(err: &ConciergeError) -> Self {
        match err {
            ConciergeError::Upstream { message, .. } => Self::Upstream(message.clone()),
            ConciergeError::Timeout { duration } => Self::Timeout(*duration),
            other => Self::Other(other.to_string()),
        }
    }

    fn to_error(&self) -> ConciergeError {
        match self {
            Self::Upstream(message) => ConciergeError::upstream(message.clone()),
            Self::Timeout(duration) => ConciergeError::Timeout {
                duration: *duration,
            },
            Self::Other(message) => ConciergeError::Internal(message.clone()),
        }
    }
}

#[derive(Default)]
struct State {
    routes: Vec<(String, String)>,
    queue: VecDeque<String>,
    default_reply: Option<String>,
    failure: Option<Failure>,
    delay: Option<Duration>,
    requests: Vec<LlmRequest>,
}

/// A mock LLM client.
///
/// Answers are chosen in order: a configured failure, the first route whose
/// marker appears in the request, the next queued reply, then the default
/// reply ("mock response" unless overridden). Every request is captured.
#[derive(Default)]
pub struct MockLlm {
    state: Mutex<State>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the default reply.
    pub fn with_reply(self, reply: &str) -> Self {
        self.lock().default_reply = Some(reply.to_string());
        self
    }

    /// Queues replies returned once each, in order.
    pub fn with_replies(self, replies: &[&str]) -> Self {
        self.lock()
            .queue
            .extend(replies.iter().map(|r| (*r).to_string()));
        self
    }

    /// Answers `reply` whenever `marker` appears in a system prompt or message.
    pub fn with_route(self, marker: &str, reply: &str) -> Self {
        self.lock()
            .routes
            .push((marker.to_string(), reply.to_string()));
        self
    }

    /// Fails every call with a copy of `err`.
    pub fn with_error(self, err: ConciergeError) -> Self {
        self.lock().failure = Some(Failure::from_error(&err));
        self
    }

    /// Sleeps before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    pub fn push_reply(&self, reply: &str) {
        self.lock().queue.push_back(reply.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.lock().requests.clone()
    }

    /// Requests whose system prompts or messages contain `marker`.
    pub fn requests_containing(&self, marker: &str) -> Vec<LlmRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| request_contains(r, marker))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, request: LlmRequest) -> (Option<Duration>, Result<String, ConciergeError>) {
        let mut state = self.lock();
        let delay = state.delay;
        let result = if let Some(failure) = &state.failure {
            Err(failure.to_error())
        } else if let Some((_, reply)) = state
            .routes
            .iter()
            .find(|(marker, _)| request_contains(&request, marker))
        {
            Ok(reply.clone())
        } else if let Some(reply) = state.queue.pop_front() {
            Ok(reply)
        } else {
            Ok(state
                .default_reply
                .clone()
                .unwrap_or_else(|| DEFAULT_REPLY.to_string()))
        };
        state.requests.push(request);
        (delay, result)
    }
}

fn request_contains(request: &LlmRequest, marker: &str) -> bool {
    request.system_prompts.iter().any(|s| s.contains(marker))
        || request.messages.iter().any(|m| m.content.contains(marker))
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, ConciergeError> {
        let (delay, result) = self.answer(request);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(LlmResponse {
            text: result?,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
            stop_reason: Some("end_turn".to_string()),
        })
    }
}

/// A metrics recorder that keeps every event for assertions.
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<MetricEvent>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Sum of counter increments for `name` whose labels include every pair in `labels`.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.events()
            .iter()
            .filter_map(|event| match event {
                MetricEvent::Counter { value, .. }
                    if event.name() == name
                        && labels.iter().all(|(k, v)| event.label(k) == Some(*v)) =>
                {
                    Some(*value)
                }
                _ => None,
            })
            .sum()
    }

    /// Number of histogram observations for `name`.
    pub fn histogram_count(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, MetricEvent::Histogram { .. }) && e.name() == name)
            .count()
    }
}

#[async_trait]
impl MetricsRecorder for RecordingMetrics {
    async fn record(&self, event: MetricEvent) -> Result<(), ConciergeError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        Ok(())
    }
}
