// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Concierge integration tests.
//!
//! Provides mock collaborators and a test harness for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockLlm`] - Mock LLM client with routed, queued, and failing responses
//! - [`RecordingMetrics`] - Metrics recorder that keeps every event
//! - [`InMemoryHistory`], [`InMemoryLeads`], [`InMemoryAudit`], [`InMemoryArchive`] - stores
//! - [`StaticClinicConfig`], [`StaticPayment`], [`StaticAvailability`], [`StaticKnowledge`] - fakes
//! - [`TestHarness`] - a wired [`ConversationEngine`](concierge_agent::ConversationEngine)

pub mod fakes;
pub mod harness;
pub mod mock_llm;
pub mod stores;

pub use fakes::{
    InMemoryKnowledgeSource, StaticAvailability, StaticClinicConfig, StaticKnowledge,
    StaticPayment,
};
pub use harness::{TEST_LEAD, TEST_ORG, TEST_PHONE, TestHarness, TestHarnessBuilder};
pub use mock_llm::{MockLlm, RecordingMetrics};
pub use stores::{InMemoryArchive, InMemoryAudit, InMemoryHistory, InMemoryLeads};
