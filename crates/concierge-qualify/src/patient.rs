// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! New vs. existing patient detection.

use std::sync::LazyLock;

use concierge_core::{Message, PatientType};
use regex::Regex;

use crate::history::{normalize_apostrophes, previous_assistant_message};

static NEW_PATIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bnew patient\b|first time|\bi'm new\b|\bi am new\b|\bnever been\b|,\s*new\s*[,.]|\bnew here\b",
    )
    .unwrap()
});

static EXISTING_PATIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\breturning\b|\bexisting patient\b|\bi've been\b|\bi have been\b|\bbeen there\b|\bbeen before\b|\bvisited before\b|\bcome before\b|\bcome here before\b|,\s*returning\s*[,.]|,\s*existing\s*[,.]",
    )
    .unwrap()
});

const NEW_REPLIES: &[&str] = &[
    "new",
    "new patient",
    "new here",
    "first time",
    "first-time",
    "never been",
    "never been before",
    "i'm new",
    "im new",
    "i am new",
];

const EXISTING_REPLIES: &[&str] = &[
    "existing",
    "returning",
    "existing patient",
    "returning patient",
    "been before",
    "i've been before",
    "i have been before",
    "not new",
    "visited before",
    "i've visited before",
    "i have visited before",
    "come before",
    "i've come before",
    "been here before",
    "yes i have",
];

/// Classifies a short standalone reply such as "new" or "returning patient".
fn classify_short_reply(reply: &str) -> Option<PatientType> {
    let cleaned: String = normalize_apostrophes(reply.trim())
        .to_lowercase()
        .chars()
        .filter(|c| !".,!?".contains(*c))
        .collect();
    let cleaned = cleaned.trim();
    if NEW_REPLIES.contains(&cleaned) {
        Some(PatientType::New)
    } else if EXISTING_REPLIES.contains(&cleaned) {
        Some(PatientType::Existing)
    } else {
        None
    }
}

/// Whether an assistant turn asked if the patient has visited before.
pub fn assistant_asked_patient_type(message: &str) -> bool {
    let m = normalize_apostrophes(message).to_lowercase();
    m.contains("new patient")
        || m.contains("existing patient")
        || m.contains("returning patient")
        || (m.contains("visited") && m.contains("before"))
        || (m.contains("been") && m.contains("before"))
        || (m.contains("new") && (m.contains("existing") || m.contains("returning")))
        || (m.contains("are you new")
            && (m.contains("patient") || m.contains("here") || m.contains("before")))
}

/// Explicit phrases anywhere in user text win; otherwise the latest short
/// reply that directly answers a patient-type question.
pub fn extract_patient_type(history: &[Message], user_text_lower: &str) -> Option<PatientType> {
    let text = normalize_apostrophes(user_text_lower);
    if NEW_PATIENT.is_match(&text) {
        return Some(PatientType::New);
    }
    if EXISTING_PATIENT.is_match(&text) {
        return Some(PatientType::Existing);
    }
    history
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, m)| m.is_user())
        .find_map(|(i, m)| {
            let kind = classify_short_reply(&m.content)?;
            previous_assistant_message(history, i)
                .filter(|prev| assistant_asked_patient_type(prev))
                .map(|_| kind)
        })
}
