// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits for the collaborators the turn pipeline depends on.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` by the orchestrator.

pub mod archive;
pub mod availability;
pub mod clinic;
pub mod history;
pub mod knowledge;
pub mod leads;
pub mod llm;
pub mod observability;
pub mod payment;

pub use archive::ConversationArchive;
pub use availability::AvailabilityFetcher;
pub use clinic::ClinicConfigProvider;
pub use history::HistoryStore;
pub use knowledge::{KnowledgeRetriever, KnowledgeSource};
pub use leads::LeadsRepository;
pub use llm::LlmClient;
pub use observability::{AuditLog, MetricsRecorder};
pub use payment::PaymentStatusChecker;
