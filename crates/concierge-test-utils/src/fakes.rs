// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned collaborators: clinic configs, payment status, availability, knowledge.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use concierge_core::{
    Availability, AvailabilityFetcher, AvailabilityQuery, ClinicConfig, ClinicConfigProvider,
    ConciergeError, DepositStatus, KnowledgeRetriever, KnowledgeSource, PaymentStatusChecker,
};

/// Clinic configs keyed by org id.
#[derive(Default)]
pub struct StaticClinicConfig {
    configs: Mutex<HashMap<String, ClinicConfig>>,
}

impl StaticClinicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, config: ClinicConfig) -> Self {
        self.insert(config);
        self
    }

    pub fn insert(&self, config: ClinicConfig) {
        if let Ok(mut map) = self.configs.lock() {
            map.insert(config.org_id.clone(), config);
        }
    }
}

#[async_trait]
impl ClinicConfigProvider for StaticClinicConfig {
    async fn get(&self, org_id: &str) -> Result<Option<ClinicConfig>, ConciergeError> {
        Ok(self
            .configs
            .lock()
            .ok()
            .and_then(|map| map.get(org_id).cloned()))
    }
}

/// Reports one fixed deposit status for every lead.
pub struct StaticPayment {
    status: Option<DepositStatus>,
}

impl StaticPayment {
    pub fn new(status: Option<DepositStatus>) -> Self {
        Self { status }
    }
}

#[async_trait]
impl PaymentStatusChecker for StaticPayment {
    async fn open_deposit_status(
        &self,
        _org_id: &str,
        _lead_id: &str,
    ) -> Result<Option<DepositStatus>, ConciergeError> {
        Ok(self.status.clone())
    }
}

#[derive(Default)]
struct AvailabilityState {
    queue: VecDeque<Availability>,
    fallback: Availability,
    failure: Option<String>,
    delay: Option<Duration>,
    queries: Vec<AvailabilityQuery>,
}

/// Availability fetcher returning queued results, then a fixed fallback.
#[derive(Default)]
pub struct StaticAvailability {
    state: Mutex<AvailabilityState>,
}

impl StaticAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every query with these slots as an exact match.
    pub fn with_slots(self, slots: Vec<NaiveDateTime>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.fallback = Availability {
                slots,
                exact_match: true,
                message: String::new(),
            };
        }
        self
    }

    /// Queues a result used once before the fallback.
    pub fn then(self, availability: Availability) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.queue.push_back(availability);
        }
        self
    }

    pub fn failing(self, message: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failure = Some(message.to_string());
        }
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.delay = Some(delay);
        }
        self
    }

    pub fn queries(&self) -> Vec<AvailabilityQuery> {
        self.state
            .lock()
            .map(|s| s.queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AvailabilityFetcher for StaticAvailability {
    async fn fetch(&self, query: AvailabilityQuery) -> Result<Availability, ConciergeError> {
        let (delay, result) = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| ConciergeError::Internal("availability lock poisoned".to_string()))?;
            state.queries.push(query);
            let result = match &state.failure {
                Some(message) => Err(ConciergeError::upstream(message.clone())),
                None => Ok(state
                    .queue
                    .pop_front()
                    .unwrap_or_else(|| state.fallback.clone())),
            };
            (state.delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

/// Retriever returning the same snippets for every query.
pub struct StaticKnowledge {
    snippets: Vec<String>,
}

impl StaticKnowledge {
    pub fn new(snippets: &[&str]) -> Self {
        Self {
            snippets: snippets.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticKnowledge {
    async fn query(
        &self,
        _clinic_id: &str,
        _text: &str,
        top_k: usize,
    ) -> Result<Vec<String>, ConciergeError> {
        Ok(self.snippets.iter().take(top_k).cloned().collect())
    }
}

/// Versioned document source. Every `add` bumps the clinic's version.
#[derive(Default)]
pub struct InMemoryKnowledgeSource {
    docs: Mutex<HashMap<String, (u64, Vec<String>)>>,
    loads: AtomicUsize,
}

impl InMemoryKnowledgeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, clinic_id: &str, document: &str) {
        if let Ok(mut docs) = self.docs.lock() {
            let entry = docs.entry(clinic_id.to_string()).or_default();
            entry.0 += 1;
            entry.1.push(document.to_string());
        }
    }

    /// Number of `documents` calls served.
    pub fn document_loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSource for InMemoryKnowledgeSource {
    async fn version(&self, clinic_id: &str) -> Result<u64, ConciergeError> {
        Ok(self
            .docs
            .lock()
            .ok()
            .and_then(|docs| docs.get(clinic_id).map(|(v, _)| *v))
            .unwrap_or_default())
    }

    async fn documents(&self, clinic_id: &str) -> Result<Vec<String>, ConciergeError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .docs
            .lock()
            .ok()
            .and_then(|docs| docs.get(clinic_id).map(|(_, d)| d.clone()))
            .unwrap_or_default())
    }
}
