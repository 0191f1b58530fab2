// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive writer with a bounded retry on insert races.

use std::sync::Arc;

use concierge_core::{ConciergeError, ConversationArchive, Message};
use tracing::{debug, warn};

/// Retries after a duplicate-key conflict before giving up.
pub const MAX_CONFLICT_RETRIES: usize = 2;

pub struct ArchiveWriter {
    archive: Arc<dyn ConversationArchive>,
}

impl ArchiveWriter {
    pub fn new(archive: Arc<dyn ConversationArchive>) -> Self {
        Self { archive }
    }

    /// Record id for the conversation, creating the record when missing.
    ///
    /// A conflict means another writer created it first; the lookup is
    /// repeated at most [`MAX_CONFLICT_RETRIES`] times.
    pub async fn ensure(&self, conversation_id: &str, org_id: &str) -> Result<String, ConciergeError> {
        let mut attempt = 0;
        loop {
            if let Some(id) = self.archive.find(conversation_id).await? {
                if let Err(e) = self.archive.touch(&id).await {
                    warn!(conversation_id, error = %e, "failed to touch archived conversation");
                }
                return Ok(id);
            }
            match self.archive.create(conversation_id, org_id).await {
                Ok(id) => return Ok(id),
                Err(ConciergeError::Conflict(detail)) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(conversation_id, attempt, %detail, "archive insert raced, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Appends messages to the conversation's record.
    pub async fn append(
        &self,
        conversation_id: &str,
        org_id: &str,
        messages: &[Message],
    ) -> Result<(), ConciergeError> {
        if messages.is_empty() {
            return Ok(());
        }
        let id = self.ensure(conversation_id, org_id).await?;
        for message in messages {
            self.archive.append_message(&id, message).await?;
        }
        Ok(())
    }
}
