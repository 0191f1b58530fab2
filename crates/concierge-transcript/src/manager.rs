// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use concierge_core::{
    ConciergeError, Deadline, HistoryStore, LlmRequest, Message, within_deadline,
};

use crate::trim::{split_system_and_messages, trim_history};

/// Owns the persisted transcript of each conversation.
///
/// Saves keep the newest `max_history` messages with the leading system
/// prompt pinned, so stored and model-bound transcripts have the same shape.
#[derive(Clone)]
pub struct TranscriptManager {
    store: Arc<dyn HistoryStore>,
    max_history: usize,
}

impl TranscriptManager {
    pub fn new(store: Arc<dyn HistoryStore>, max_history: usize) -> Self {
        Self { store, max_history }
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub async fn load(
        &self,
        conversation_id: &str,
        deadline: &Deadline,
    ) -> Result<Vec<Message>, ConciergeError> {
        within_deadline(deadline, self.store.load(conversation_id)).await
    }

    pub async fn save(
        &self,
        conversation_id: &str,
        messages: &[Message],
        deadline: &Deadline,
    ) -> Result<(), ConciergeError> {
        let trimmed = trim_history(messages, self.max_history);
        within_deadline(deadline, self.store.save(conversation_id, &trimmed)).await
    }

    /// Reply request over the trimmed transcript.
    pub fn reply_request(
        &self,
        history: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> LlmRequest {
        let trimmed = trim_history(history, self.max_history);
        let (system_prompts, messages) = split_system_and_messages(&trimmed);
        LlmRequest {
            model: model.to_string(),
            system_prompts,
            messages,
            max_tokens,
            temperature,
        }
    }
}
