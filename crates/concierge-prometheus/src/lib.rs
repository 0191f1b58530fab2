// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus-backed [`MetricsRecorder`] for the Concierge engine.
//!
//! The engine only ever sees the injected recorder trait. This crate bridges
//! it to the metrics-rs facade and the Prometheus exporter; the host renders
//! the text exposition wherever it serves metrics.

pub mod recording;

use async_trait::async_trait;
use concierge_core::{ConciergeError, MetricEvent, MetricsRecorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub use recording::{describe_metrics, record_event};

/// Prometheus metrics recorder.
pub struct PrometheusMetrics {
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    /// Installs the Prometheus recorder globally and registers metric
    /// descriptions.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, ConciergeError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ConciergeError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;
        describe_metrics();
        tracing::info!("prometheus metrics recorder installed");
        Ok(Self { handle })
    }

    /// Wraps an existing handle, e.g. from a recorder built by the host.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Prometheus text exposition of everything collected so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl MetricsRecorder for PrometheusMetrics {
    async fn record(&self, event: MetricEvent) -> Result<(), ConciergeError> {
        record_event(&event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_renders_what_the_recorder_collected() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let prom = PrometheusMetrics::from_handle(recorder.handle());
        let event = MetricEvent::counter("concierge_test_total", 1, &[("case", "forward")]);

        metrics::with_local_recorder(&recorder, || record_event(&event));
        // No global recorder is installed here; recording is a no-op.
        prom.record(event).await.unwrap();

        assert!(
            prom
                .render()
                .contains("concierge_test_total{case=\"forward\"} 1")
        );
    }
}
