// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript and time-selection persistence.

use async_trait::async_trait;

use crate::error::ConciergeError;
use crate::types::{Message, TimeSelectionState};

/// Keyed store for transcripts and time-selection sub-state.
///
/// No locking is implied: callers serialize turns per conversation id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fails with [`ConciergeError::UnknownConversation`] when no transcript exists.
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>, ConciergeError>;

    async fn save(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), ConciergeError>;

    async fn load_time_selection(
        &self,
        conversation_id: &str,
    ) -> Result<Option<TimeSelectionState>, ConciergeError>;

    async fn save_time_selection(
        &self,
        conversation_id: &str,
        state: &TimeSelectionState,
    ) -> Result<(), ConciergeError>;

    async fn clear_time_selection(&self, conversation_id: &str) -> Result<(), ConciergeError>;
}
