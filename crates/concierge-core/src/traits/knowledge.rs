// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clinic knowledge retrieval.

use async_trait::async_trait;

use crate::error::ConciergeError;

/// Returns the most relevant knowledge snippets for a clinic.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn query(
        &self,
        clinic_id: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<String>, ConciergeError>;
}

/// Append-only document source with a monotonically increasing version per clinic.
///
/// The empty clinic id addresses documents shared by every clinic.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn version(&self, clinic_id: &str) -> Result<u64, ConciergeError>;

    async fn documents(&self, clinic_id: &str) -> Result<Vec<String>, ConciergeError>;
}
