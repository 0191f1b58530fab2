// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and event forwarding.
//!
//! Everything goes through the metrics-rs facade, so whichever recorder is
//! installed (global or thread-local) collects it.

use concierge_agent::POLICY_BLOCK_TOTAL;
use concierge_core::MetricEvent;
use concierge_core::call::{LLM_LATENCY_SECONDS, LLM_TOKENS_TOTAL};
use concierge_deposit::DEPOSIT_DECISION_TOTAL;
use metrics::{Label, describe_counter, describe_histogram};

/// Registers descriptions for every metric the pipeline emits.
pub fn describe_metrics() {
    describe_histogram!(
        LLM_LATENCY_SECONDS,
        metrics::Unit::Seconds,
        "LLM call latency by model and status"
    );
    describe_counter!(LLM_TOKENS_TOTAL, "Tokens consumed by model and type");
    describe_counter!(
        DEPOSIT_DECISION_TOTAL,
        "Deposit classifier outcomes (collect, skip, error)"
    );
    describe_counter!(
        POLICY_BLOCK_TOTAL,
        "Messages refused or replaced by the safety guard, by reason"
    );
}

fn labels(pairs: &[(String, String)]) -> Vec<Label> {
    pairs
        .iter()
        .map(|(k, v)| Label::new(k.clone(), v.clone()))
        .collect()
}

/// Forwards one event to the installed recorder.
pub fn record_event(event: &MetricEvent) {
    match event {
        MetricEvent::Counter {
            name,
            value,
            labels: pairs,
        } => metrics::counter!(name.clone(), labels(pairs)).increment(*value),
        MetricEvent::Gauge {
            name,
            value,
            labels: pairs,
        } => metrics::gauge!(name.clone(), labels(pairs)).set(*value),
        MetricEvent::Histogram {
            name,
            value,
            labels: pairs,
        } => metrics::histogram!(name.clone(), labels(pairs)).record(*value),
    }
}
