// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory stores standing in for Redis, the leads database, the audit
//! table, and the conversation archive.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use concierge_core::{
    AuditEvent, AuditKind, AuditLog, ConciergeError, ConversationArchive, HistoryStore, Lead,
    LeadsRepository, Message, QualificationSnapshot, SelectedAppointment, TimeSelectionState,
};

fn storage_failure(what: &str) -> ConciergeError {
    ConciergeError::storage(std::io::Error::other(format!("{what} unavailable")))
}

/// Transcript and time-selection store keyed by conversation id.
#[derive(Default)]
pub struct InMemoryHistory {
    transcripts: Mutex<HashMap<String, Vec<Message>>>,
    selections: Mutex<HashMap<String, TimeSelectionState>>,
    fail_saves: AtomicBool,
    fail_selection_loads: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a transcript as if an earlier turn had saved it.
    pub fn seed(&self, conversation_id: &str, messages: Vec<Message>) {
        if let Ok(mut map) = self.transcripts.lock() {
            map.insert(conversation_id.to_string(), messages);
        }
    }

    pub fn transcript(&self, conversation_id: &str) -> Option<Vec<Message>> {
        self.transcripts
            .lock()
            .ok()
            .and_then(|map| map.get(conversation_id).cloned())
    }

    pub fn time_selection(&self, conversation_id: &str) -> Option<TimeSelectionState> {
        self.selections
            .lock()
            .ok()
            .and_then(|map| map.get(conversation_id).cloned())
    }

    pub fn set_time_selection(&self, conversation_id: &str, state: TimeSelectionState) {
        if let Ok(mut map) = self.selections.lock() {
            map.insert(conversation_id.to_string(), state);
        }
    }

    /// Makes every transcript save fail with a storage error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Makes time-selection loads fail with a storage error.
    pub fn fail_time_selection_loads(&self, fail: bool) {
        self.fail_selection_loads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful transcript saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>, ConciergeError> {
        self.transcript(conversation_id)
            .ok_or_else(|| ConciergeError::UnknownConversation(conversation_id.to_string()))
    }

    async fn save(&self, conversation_id: &str, messages: &[Message]) -> Result<(), ConciergeError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(storage_failure("history"));
        }
        self.seed(conversation_id, messages.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_time_selection(
        &self,
        conversation_id: &str,
    ) -> Result<Option<TimeSelectionState>, ConciergeError> {
        if self.fail_selection_loads.load(Ordering::SeqCst) {
            return Err(storage_failure("time selection"));
        }
        Ok(self.time_selection(conversation_id))
    }

    async fn save_time_selection(
        &self,
        conversation_id: &str,
        state: &TimeSelectionState,
    ) -> Result<(), ConciergeError> {
        self.set_time_selection(conversation_id, state.clone());
        Ok(())
    }

    async fn clear_time_selection(&self, conversation_id: &str) -> Result<(), ConciergeError> {
        if let Ok(mut map) = self.selections.lock() {
            map.remove(conversation_id);
        }
        Ok(())
    }
}

/// Lead records keyed by `(org_id, lead_id)`. Updates create missing leads.
#[derive(Default)]
pub struct InMemoryLeads {
    leads: Mutex<HashMap<(String, String), Lead>>,
}

impl InMemoryLeads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, lead: Lead) {
        if let Ok(mut map) = self.leads.lock() {
            map.insert((lead.org_id.clone(), lead.id.clone()), lead);
        }
    }

    pub fn lead(&self, org_id: &str, lead_id: &str) -> Option<Lead> {
        self.leads
            .lock()
            .ok()
            .and_then(|map| map.get(&(org_id.to_string(), lead_id.to_string())).cloned())
    }

    fn upsert(&self, org_id: &str, lead_id: &str, apply: impl FnOnce(&mut Lead)) {
        if let Ok(mut map) = self.leads.lock() {
            let lead = map
                .entry((org_id.to_string(), lead_id.to_string()))
                .or_insert_with(|| Lead {
                    id: lead_id.to_string(),
                    org_id: org_id.to_string(),
                    ..Default::default()
                });
            apply(lead);
        }
    }
}

#[async_trait]
impl LeadsRepository for InMemoryLeads {
    async fn get(&self, org_id: &str, lead_id: &str) -> Result<Option<Lead>, ConciergeError> {
        Ok(self.lead(org_id, lead_id))
    }

    async fn update_preferences(
        &self,
        org_id: &str,
        lead_id: &str,
        preferences: &QualificationSnapshot,
        notes: Option<&str>,
    ) -> Result<(), ConciergeError> {
        self.upsert(org_id, lead_id, |lead| {
            lead.preferences = preferences.clone();
            if let Some(notes) = notes {
                lead.notes = notes.to_string();
            }
        });
        Ok(())
    }

    async fn update_email(
        &self,
        org_id: &str,
        lead_id: &str,
        email: &str,
    ) -> Result<(), ConciergeError> {
        self.upsert(org_id, lead_id, |lead| lead.email = email.to_string());
        Ok(())
    }

    async fn set_selected_appointment(
        &self,
        org_id: &str,
        lead_id: &str,
        appointment: Option<SelectedAppointment>,
    ) -> Result<(), ConciergeError> {
        self.upsert(org_id, lead_id, |lead| lead.selected_appointment = appointment);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAudit {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<AuditKind> {
        self.events().iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl AuditLog for InMemoryAudit {
    async fn append(&self, event: AuditEvent) -> Result<(), ConciergeError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        Ok(())
    }
}

#[derive(Default)]
struct ArchiveState {
    records: HashMap<String, String>,
    messages: HashMap<String, Vec<Message>>,
    failing_creates: usize,
    race_pending: bool,
    create_calls: usize,
    touches: usize,
}

/// Conversation archive with injectable create conflicts.
#[derive(Default)]
pub struct InMemoryArchive {
    state: Mutex<ArchiveState>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` creates fail with a conflict and insert nothing.
    pub fn fail_creates(&self, n: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_creates = n;
        }
    }

    /// The next create loses a race: another writer's record appears and the
    /// call fails with a conflict.
    pub fn race_on_create(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.race_pending = true;
        }
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().map(|s| s.create_calls).unwrap_or_default()
    }

    pub fn touches(&self) -> usize {
        self.state.lock().map(|s| s.touches).unwrap_or_default()
    }

    /// Archived messages of a conversation, in append order.
    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.state
            .lock()
            .ok()
            .and_then(|s| {
                let record = s.records.get(conversation_id)?;
                s.messages.get(record).cloned()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationArchive for InMemoryArchive {
    async fn find(&self, conversation_id: &str) -> Result<Option<String>, ConciergeError> {
        Ok(self
            .state
            .lock()
            .ok()
            .and_then(|s| s.records.get(conversation_id).cloned()))
    }

    async fn create(&self, conversation_id: &str, _org_id: &str) -> Result<String, ConciergeError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ConciergeError::Internal("archive lock poisoned".to_string()))?;
        state.create_calls += 1;
        let record_id = format!("rec_{conversation_id}");
        if state.race_pending {
            state.race_pending = false;
            state
                .records
                .insert(conversation_id.to_string(), record_id);
            return Err(ConciergeError::Conflict(conversation_id.to_string()));
        }
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            return Err(ConciergeError::Conflict(conversation_id.to_string()));
        }
        if state.records.contains_key(conversation_id) {
            return Err(ConciergeError::Conflict(conversation_id.to_string()));
        }
        state
            .records
            .insert(conversation_id.to_string(), record_id.clone());
        Ok(record_id)
    }

    async fn touch(&self, _record_id: &str) -> Result<(), ConciergeError> {
        if let Ok(mut state) = self.state.lock() {
            state.touches += 1;
        }
        Ok(())
    }

    async fn append_message(&self, record_id: &str, message: &Message) -> Result<(), ConciergeError> {
        if let Ok(mut state) = self.state.lock() {
            state
                .messages
                .entry(record_id.to_string())
                .or_default()
                .push(message.clone());
        }
        Ok(())
    }
}
