// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM completion capability.

use async_trait::async_trait;

use crate::error::ConciergeError;
use crate::types::{LlmRequest, LlmResponse};

/// Single-shot completion against whatever backend the host wires in.
///
/// Transport and provider failures must surface as [`ConciergeError::Upstream`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, ConciergeError>;
}
