// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Version-stamped knowledge cache.
//!
//! Each clinic's documents are cached with the source version they were read
//! at. A query first asks the source for its current version; a different
//! stamp replaces the cached entry wholesale. Documents under the empty
//! clinic id are shared by every clinic and cached the same way.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::{ConciergeError, KnowledgeRetriever, KnowledgeSource};
use tokio::sync::RwLock;
use tracing::debug;

const SHARED: &str = "";

#[derive(Debug, Clone)]
struct Entry {
    version: u64,
    documents: Arc<Vec<String>>,
}

pub struct VersionedKnowledgeCache {
    source: Arc<dyn KnowledgeSource>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl VersionedKnowledgeCache {
    pub fn new(source: Arc<dyn KnowledgeSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached version for a clinic, if loaded.
    pub async fn cached_version(&self, clinic_id: &str) -> Option<u64> {
        self.entries.read().await.get(clinic_id).map(|e| e.version)
    }

    async fn documents(&self, clinic_id: &str) -> Result<Arc<Vec<String>>, ConciergeError> {
        let version = self.source.version(clinic_id).await?;
        if let Some(entry) = self.entries.read().await.get(clinic_id)
            && entry.version == version
        {
            return Ok(entry.documents.clone());
        }

        let documents = Arc::new(self.source.documents(clinic_id).await?);
        debug!(clinic_id, version, count = documents.len(), "knowledge cache reloaded");
        self.entries.write().await.insert(
            clinic_id.to_string(),
            Entry {
                version,
                documents: documents.clone(),
            },
        );
        Ok(documents)
    }
}

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Documents sharing the most query terms, best first. Ties keep source order.
pub fn rank_documents<'a>(documents: impl IntoIterator<Item = &'a String>, text: &str, top_k: usize) -> Vec<String> {
    let query = terms(text);
    if query.is_empty() || top_k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(usize, &String)> = documents
        .into_iter()
        .filter_map(|doc| {
            let lower = doc.to_lowercase();
            let score = query.iter().filter(|t| lower.contains(t.as_str())).count();
            (score > 0).then_some((score, doc))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(top_k).map(|(_, doc)| doc.clone()).collect()
}

#[async_trait]
impl KnowledgeRetriever for VersionedKnowledgeCache {
    async fn query(
        &self,
        clinic_id: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<String>, ConciergeError> {
        let own = self.documents(clinic_id).await?;
        let shared = if clinic_id.is_empty() {
            Arc::new(Vec::new())
        } else {
            self.documents(SHARED).await?
        };
        Ok(rank_documents(own.iter().chain(shared.iter()), text, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_prefers_more_terms() {
        let docs = vec![
            "Parking is free behind the building.".to_string(),
            "Botox starts at $12 per unit.".to_string(),
            "Botox results last three to four months per unit.".to_string(),
        ];
        let ranked = rank_documents(&docs, "how long does botox last", 2);
        assert_eq!(ranked[0], docs[2]);
        assert_eq!(ranked[1], docs[1]);
        assert!(rank_documents(&docs, "hi", 3).is_empty());
    }
}
