// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term conversation archive.

use async_trait::async_trait;

use crate::error::ConciergeError;
use crate::types::Message;

/// Relational archive of conversations and their messages.
#[async_trait]
pub trait ConversationArchive: Send + Sync {
    /// Record id for a conversation, if one exists.
    async fn find(&self, conversation_id: &str) -> Result<Option<String>, ConciergeError>;

    /// Inserts a new record and returns its id.
    ///
    /// Fails with [`ConciergeError::Conflict`] when another writer inserted
    /// the same conversation first.
    async fn create(&self, conversation_id: &str, org_id: &str) -> Result<String, ConciergeError>;

    /// Marks the record as recently active.
    async fn touch(&self, record_id: &str) -> Result<(), ConciergeError>;

    async fn append_message(
        &self,
        record_id: &str,
        message: &Message,
    ) -> Result<(), ConciergeError>;
}
