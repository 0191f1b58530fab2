// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end turn testing.
//!
//! `TestHarness` wires a [`ConversationEngine`] to in-memory stores and a
//! [`MockLlm`], keeping handles to every fake so tests can script inputs and
//! assert on what was persisted.

use std::sync::Arc;
use std::time::Duration;

use concierge_agent::{Collaborators, ConversationEngine, EngineSettings};
use concierge_core::{
    ClinicConfig, ConciergeError, DepositStatus, Lead, Message, TurnRequest, TurnResponse,
};

use crate::fakes::{StaticAvailability, StaticClinicConfig, StaticKnowledge, StaticPayment};
use crate::mock_llm::{MockLlm, RecordingMetrics};
use crate::stores::{InMemoryArchive, InMemoryAudit, InMemoryHistory, InMemoryLeads};

pub const TEST_ORG: &str = "org_test";
pub const TEST_LEAD: &str = "lead_test";
pub const TEST_PHONE: &str = "+15550001111";

/// Builder for a wired engine with configurable fakes.
pub struct TestHarnessBuilder {
    llm: MockLlm,
    clinics: Vec<ClinicConfig>,
    leads: Vec<Lead>,
    availability: Option<StaticAvailability>,
    payment: Option<DepositStatus>,
    knowledge: Vec<String>,
    settings: EngineSettings,
    archive: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            llm: MockLlm::new(),
            clinics: Vec::new(),
            leads: Vec::new(),
            availability: None,
            payment: None,
            knowledge: Vec::new(),
            settings: EngineSettings {
                model: "test-model".to_string(),
                ..EngineSettings::default()
            },
            archive: false,
        }
    }

    /// Replaces the mock LLM.
    pub fn with_llm(mut self, llm: MockLlm) -> Self {
        self.llm = llm;
        self
    }

    /// Queues reply-model responses, consumed in order.
    pub fn with_replies(mut self, replies: &[&str]) -> Self {
        self.llm = self.llm.with_replies(replies);
        self
    }

    pub fn with_clinic(mut self, config: ClinicConfig) -> Self {
        self.clinics.push(config);
        self
    }

    /// Registers a lead for [`TEST_ORG`]/[`TEST_LEAD`] unless ids are set.
    pub fn with_lead(mut self, mut lead: Lead) -> Self {
        if lead.id.is_empty() {
            lead.id = TEST_LEAD.to_string();
        }
        if lead.org_id.is_empty() {
            lead.org_id = TEST_ORG.to_string();
        }
        self.leads.push(lead);
        self
    }

    pub fn with_availability(mut self, availability: StaticAvailability) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_payment(mut self, status: DepositStatus) -> Self {
        self.payment = Some(status);
        self
    }

    pub fn with_knowledge(mut self, snippets: &[&str]) -> Self {
        self.knowledge = snippets.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_archive(mut self) -> Self {
        self.archive = true;
        self
    }

    pub fn build(self) -> TestHarness {
        let llm = Arc::new(self.llm);
        let history = Arc::new(InMemoryHistory::new());
        let metrics = Arc::new(RecordingMetrics::default());
        let leads = Arc::new(InMemoryLeads::new());
        for lead in self.leads {
            leads.insert(lead);
        }
        let audit = Arc::new(InMemoryAudit::default());
        let clinics = Arc::new(StaticClinicConfig::new());
        for config in self.clinics {
            clinics.insert(config);
        }
        let archive = Arc::new(InMemoryArchive::new());
        let availability = self.availability.map(Arc::new);

        let mut collaborators = Collaborators::new(llm.clone(), history.clone(), metrics.clone())
            .with_clinics(clinics.clone())
            .with_leads(leads.clone())
            .with_audit(audit.clone());
        if let Some(status) = self.payment {
            collaborators = collaborators.with_payment(Arc::new(StaticPayment::new(Some(status))));
        }
        if !self.knowledge.is_empty() {
            let snippets: Vec<&str> = self.knowledge.iter().map(String::as_str).collect();
            collaborators = collaborators.with_knowledge(Arc::new(StaticKnowledge::new(&snippets)));
        }
        if let Some(availability) = &availability {
            collaborators = collaborators.with_availability(availability.clone());
        }
        if self.archive {
            collaborators = collaborators.with_archive(archive.clone());
        }

        TestHarness {
            engine: ConversationEngine::new(collaborators, self.settings),
            llm,
            history,
            metrics,
            leads,
            audit,
            clinics,
            archive,
            availability,
        }
    }
}

/// A wired engine plus handles to every fake behind it.
pub struct TestHarness {
    pub engine: ConversationEngine,
    pub llm: Arc<MockLlm>,
    pub history: Arc<InMemoryHistory>,
    pub metrics: Arc<RecordingMetrics>,
    pub leads: Arc<InMemoryLeads>,
    pub audit: Arc<InMemoryAudit>,
    pub clinics: Arc<StaticClinicConfig>,
    /// Only wired into the engine when built `with_archive`.
    pub archive: Arc<InMemoryArchive>,
    pub availability: Option<Arc<StaticAvailability>>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A request from the test lead on SMS.
    pub fn request(conversation_id: &str, message: &str) -> TurnRequest {
        TurnRequest {
            conversation_id: conversation_id.to_string(),
            org_id: TEST_ORG.to_string(),
            lead_id: TEST_LEAD.to_string(),
            from: TEST_PHONE.to_string(),
            message: message.to_string(),
            ..Default::default()
        }
    }

    /// Opens `conversation_id` with `intro`.
    pub async fn start(
        &self,
        conversation_id: &str,
        intro: &str,
    ) -> Result<TurnResponse, ConciergeError> {
        let request = TurnRequest {
            intro: intro.to_string(),
            message: String::new(),
            ..Self::request(conversation_id, "")
        };
        self.engine.start_conversation(request).await
    }

    /// Sends one follow-up message.
    pub async fn send(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<TurnResponse, ConciergeError> {
        self.engine
            .process_message(Self::request(conversation_id, message))
            .await
    }

    /// Sends one message with a turn deadline.
    pub async fn send_within(
        &self,
        conversation_id: &str,
        message: &str,
        timeout: Duration,
    ) -> Result<TurnResponse, ConciergeError> {
        let request = TurnRequest {
            timeout: Some(timeout),
            ..Self::request(conversation_id, message)
        };
        self.engine.process_message(request).await
    }

    /// Stored transcript, empty when none exists.
    pub fn transcript(&self, conversation_id: &str) -> Vec<Message> {
        self.history.transcript(conversation_id).unwrap_or_default()
    }

    /// The test lead as currently stored.
    pub fn lead(&self) -> Option<Lead> {
        self.leads.lead(TEST_ORG, TEST_LEAD)
    }
}
