// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Qualification extraction for the Concierge turn pipeline.
//!
//! Every turn the whole transcript is re-scanned into a
//! [`QualificationSnapshot`](concierge_core::QualificationSnapshot). The
//! snapshot drives two decisions: which guardrail directive (if any) to add
//! before generation, and whether live availability can be fetched.

pub mod email;
pub mod extract;
pub mod guardrail;
pub mod history;
pub mod name;
pub mod patient;
pub mod provider;
pub mod readiness;
pub mod schedule;
pub mod service;

pub use email::{extract_email, extract_email_from_history};
pub use extract::extract_preferences;
pub use guardrail::{Requirement, guardrail_directive, inject_guardrails, next_requirement};
pub use history::{collect_user_messages, last_assistant_message, previous_assistant_message};
pub use name::extract_name_parts;
pub use readiness::{
    LEAD_CONTEXT_HEADER, format_lead_context, merge_lead_context, should_fetch_availability,
};
pub use service::{detect_service_key, match_service, sorted_aliases};
