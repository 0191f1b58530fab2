// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Concierge turn pipeline.

use thiserror::Error;

/// The primary error type used across collaborator traits and turn processing.
///
/// Policy outcomes (blocked injection, PHI, medical advice) are never errors:
/// they complete the turn with a canned reply. Only [`Validation`](Self::Validation),
/// upstream failures, and storage failures propagate to the caller.
#[derive(Debug, Error)]
pub enum ConciergeError {
    /// A required request field is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// LLM or availability backend failure (transport, provider, empty response).
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A collaborator call exceeded its budget or the request deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The history store has no transcript for this conversation id.
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),

    /// History, lead, or audit store failure.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing fields, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed classifier output. Consumed inside the decision engines.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Duplicate-key race at an external store.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConciergeError {
    /// Shorthand for an upstream failure without an underlying source.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Whether the caller should treat this as a retryable upstream failure.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Timeout { .. })
    }
}
