// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time selection for the Concierge turn pipeline.
//!
//! Once a patient is qualified, live availability is fetched and presented
//! as a numbered list. Later replies are matched against that list ("2",
//! "the 3pm", "tuesday"), or trigger a refined re-fetch ("any later
//! times?"). The presented list is persisted per conversation so the LLM can
//! be pinned to times that were actually offered.

pub mod coordinator;
pub mod format;
pub mod preferences;
pub mod refine;
pub mod selection;

pub use coordinator::{
    Presentation, ScheduleSettings, SlotsTurn, StateWrite, TimeSelectionCoordinator,
    detect_service_switch,
};
pub use format::{build_slots, format_slots_for_sms, long_label, slot_label, spread_slots_across_days};
pub use preferences::{extract_time_preferences, format_preferences_for_llm, matches_preferences};
pub use refine::{build_refined_preferences, extract_specific_dates, is_more_times_request};
pub use selection::detect_time_selection;
