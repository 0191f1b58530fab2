// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metrics and audit sinks.

use async_trait::async_trait;

use crate::error::ConciergeError;
use crate::types::{AuditEvent, MetricEvent};

/// Receives metric events. Injected so tests stay hermetic.
#[async_trait]
pub trait MetricsRecorder: Send + Sync {
    async fn record(&self, event: MetricEvent) -> Result<(), ConciergeError>;
}

/// Compliance and security audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, event: AuditEvent) -> Result<(), ConciergeError>;
}
