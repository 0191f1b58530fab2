// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider preference resolution.

use concierge_core::{Message, Role};

use crate::history::normalize_apostrophes;

pub const NO_PREFERENCE: &str = "no preference";

const NO_PREFERENCE_PHRASES: &[&str] = &[
    "no preference",
    "no provider preference",
    "don't care",
    "doesn't matter",
    "either is fine",
    "either one",
    "anyone",
    "any provider",
    "whoever",
    "whoever is available",
    "no pref",
    "don't have a preference",
];

const PROVIDER_QUESTION: &[&str] = &[
    "provider preference",
    "preferred provider",
    "specific provider",
    "particular provider",
    "who would you like",
    "do you have a preference for a provider",
];

const SHORT_NO_PREFERENCE: &[&str] = &[
    "no preference",
    "doesn't matter",
    "don't care",
    "either",
    "anyone",
    "whoever",
];

const ROSTER_PREFIXES: &[&str] = &["we have ", "available providers: ", "providers: "];

const SERVICE_WORDS: &[&str] = &[
    "botox", "filler", "facial", "laser", "peel", "injection", "treatment", "consultation",
    "service", "appointment", "provider", "available", "today",
];

pub fn assistant_asked_provider(message: &str) -> bool {
    let m = normalize_apostrophes(message).to_lowercase();
    PROVIDER_QUESTION.iter().any(|cue| m.contains(cue))
}

/// Answer to the most recent provider question, if the patient replied.
fn reply_after_provider_question(history: &[Message]) -> Option<String> {
    for (i, msg) in history.iter().enumerate().rev() {
        if !msg.is_user() {
            continue;
        }
        let asked = history[..i]
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .is_some_and(|m| assistant_asked_provider(&m.content));
        if !asked {
            continue;
        }
        let reply = msg.content.trim();
        let lower = normalize_apostrophes(reply).to_lowercase();
        let bare = lower.trim_matches(|c: char| c.is_ascii_punctuation());
        if bare == "no" || bare == "nope" || SHORT_NO_PREFERENCE.iter().any(|p| lower.contains(p)) {
            return Some(NO_PREFERENCE.to_string());
        }
        let len = reply.chars().count();
        if len > 1 && len < 50 {
            return Some(reply.to_string());
        }
    }
    None
}

fn looks_like_person_name(candidate: &str) -> bool {
    let words: Vec<&str> = candidate.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }
    let lower = candidate.to_lowercase();
    !SERVICE_WORDS.iter().any(|w| lower.contains(w))
}

/// Provider names listed in system/assistant turns that mention providers.
pub fn listed_provider_names(history: &[Message]) -> Vec<String> {
    let mut names = Vec::new();
    for msg in history.iter().filter(|m| m.role != Role::User) {
        let lower = msg.content.to_ascii_lowercase();
        if !lower.contains("provider") {
            continue;
        }
        for prefix in ROSTER_PREFIXES {
            let Some(start) = lower.find(prefix) else { continue };
            let segment = &msg.content[start + prefix.len()..];
            let segment = segment
                .split(['.', '!', '?', '\n'])
                .next()
                .unwrap_or_default();
            let segment = segment.split(" - ").next().unwrap_or_default();
            let segment = segment.replace(" and ", ", ");
            for candidate in segment.split(", ") {
                let candidate = candidate.trim().trim_end_matches(',');
                if looks_like_person_name(candidate) && !names.iter().any(|n| n == candidate) {
                    names.push(candidate.to_string());
                }
            }
        }
    }
    names
}

/// First listed provider whose first name appears in user text.
pub fn match_named_provider(names: &[String], user_text_lower: &str) -> Option<String> {
    names
        .iter()
        .find(|name| {
            name.split_whitespace()
                .next()
                .map(str::to_lowercase)
                .is_some_and(|first| first.chars().count() > 2 && user_text_lower.contains(&first))
        })
        .cloned()
}

/// "no preference", a reply to a provider question, or a named provider.
pub fn extract_provider_preference(history: &[Message], user_text_lower: &str) -> String {
    let text = normalize_apostrophes(user_text_lower);
    if NO_PREFERENCE_PHRASES.iter().any(|p| text.contains(p)) {
        return NO_PREFERENCE.to_string();
    }
    if let Some(reply) = reply_after_provider_question(history) {
        return reply;
    }
    match_named_provider(&listed_provider_names(history), &text).unwrap_or_default()
}
