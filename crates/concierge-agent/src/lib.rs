// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration for the Concierge conversation pipeline.
//!
//! The [`ConversationEngine`] runs each inbound message through:
//! - the safety guard (injection, PHI, medical advice)
//! - context injection, deterministic shortcuts and canned FAQ answers
//! - reply generation with the outbound guard
//! - deposit, variant and time-selection decisions
//! - the booking hand-off for structured-booking clinics
//!
//! Every write of a turn is staged and applied once the reply is final.

pub mod booking;
pub mod engine;
pub mod faq;
pub mod prompt;
pub mod settings;
pub mod shortcuts;
pub mod start;
pub mod turn;

pub use booking::{Handoff, prepare_handoff};
pub use engine::{Collaborators, ConversationEngine, POLICY_BLOCK_TOTAL, provider_question};
pub use faq::{FaqResponder, FaqSettings, FaqTopic};
pub use prompt::{DEFAULT_SMS_PROMPT, SILENT_START_NOTE, build_system_prompt};
pub use settings::EngineSettings;
pub use shortcuts::{INTENT_CLARIFY_REPLY, QUESTION_INVITE_REPLY, Shortcut, match_shortcut};
pub use start::new_conversation_id;
