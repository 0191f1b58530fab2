// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript management for the Concierge turn pipeline.
//!
//! Covers loading and saving transcripts, trimming them for the model with
//! a pinned system prompt, the per-turn context messages, SMS cleanup of
//! generated replies, and the long-term archive.

pub mod archive;
pub mod context;
pub mod intro;
pub mod knowledge;
pub mod manager;
pub mod sanitize;
pub mod trim;

pub use archive::{ArchiveWriter, MAX_CONFLICT_RETRIES};
pub use context::{
    ContextInjector, ContextSettings, ContextSources, InjectedContext, contains_booking_intent,
    deposit_amount_notice, format_availability_for_llm, payment_notice,
};
pub use intro::format_intro_message;
pub use knowledge::{VersionedKnowledgeCache, rank_documents};
pub use manager::TranscriptManager;
pub use sanitize::sanitize_sms;
pub use trim::{split_system_and_messages, trim_history};
