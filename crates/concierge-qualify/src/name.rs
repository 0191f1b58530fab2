// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Patient name extraction.

use std::sync::LazyLock;

use concierge_core::Message;
use regex::Regex;

use crate::history::{normalize_apostrophes, previous_assistant_message};

const NAME_WORD: &str = r"[\p{L}][\p{L}\p{M}'-]*";

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let name = format!(r"{NAME_WORD}(?:\s+{NAME_WORD}){{0,2}}");
    [
        format!(r"(?i)my name is\s+({name})"),
        format!(r"(?i)i'?m\s+({name})(?:\s|,|\.|!|$)"),
        format!(r"(?i)i am\s+({name})(?:\s|,|\.|!|$)"),
        format!(r"(?i)this is\s+({name})"),
        format!(r"(?i)call me\s+({name})"),
        format!(r"(?i)it'?s\s+({name})(?:\s|,|\.|!|$)"),
        format!(r"(?i)name'?s\s+({name})"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Words that are never part of a name.
const COMMON_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "had", "has", "his", "how", "its", "may", "new", "now", "old", "see", "way",
    "who", "boy", "did", "get", "let", "put", "say", "she", "too", "use", "yes", "no", "hi",
    "hey", "thanks", "thank", "please", "ok", "okay", "sure", "good", "great", "fine", "well",
    "just", "like", "want", "need", "have", "interested", "looking", "book", "booking",
    "appointment", "morning", "afternoon", "evening", "weekday", "weekend", "available",
    "schedule", "scheduling", "time", "botox", "filler", "facial", "laser", "consultation",
    "treatment", "service", "existing", "returning", "patient", "calling", "texting", "in", "on",
    "at", "to", "of", "is", "it", "an", "as", "be", "by", "do", "if", "or", "so", "up", "we",
    "me", "my", "he", "weight", "loss", "skin", "body", "face", "lip", "hair", "nail", "peel",
    "tox", "about", "with", "from", "this", "that", "what", "when", "your", "some", "been",
    "were", "them", "then", "than", "also", "very", "more", "much", "here", "there", "where",
    "which", "their", "would", "could", "should", "will", "inquiring", "writing", "reaching",
    "contacting", "wondering", "asking", "checking", "getting",
];

fn is_common_word(word: &str) -> bool {
    COMMON_WORDS.contains(&word.to_lowercase().as_str())
}

fn clean_token(word: &str) -> &str {
    word.trim()
        .trim_matches(|c| ".,!?\"()[]{}".contains(c))
        .trim_matches(|c| c == '\'' || c == '-')
}

fn looks_like_name_word(word: &str) -> bool {
    let count = word.chars().count();
    if !(2..=30).contains(&count) {
        return false;
    }
    word.chars().next().is_some_and(char::is_alphabetic) && !is_common_word(word)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Up to two capitalized name words from free text.
///
/// Leading non-name words are skipped; the first non-name word after a name
/// word ends the name.
pub fn extract_name_parts(raw: &str) -> Vec<String> {
    let normalized = normalize_apostrophes(raw);
    let mut parts = Vec::with_capacity(2);
    for word in normalized.split_whitespace() {
        let cleaned = clean_token(word);
        if cleaned.is_empty() {
            continue;
        }
        if !looks_like_name_word(cleaned) {
            if !parts.is_empty() {
                break;
            }
            continue;
        }
        parts.push(capitalize(cleaned));
        if parts.len() == 2 {
            break;
        }
    }
    parts
}

fn full_and_first(parts: &[String]) -> (Option<String>, Option<String>) {
    match parts {
        [first, last, ..] => (Some(format!("{first} {last}")), Some(first.clone())),
        [first] => (None, Some(first.clone())),
        [] => (None, None),
    }
}

pub fn assistant_asked_for_name(message: &str) -> bool {
    let message = normalize_apostrophes(message).to_lowercase();
    if !message.contains("name") {
        return false;
    }
    [
        "full name",
        "first and last",
        "first name",
        "last name",
        "your name",
        "may i",
        "what",
        "can i",
        "could i",
    ]
    .iter()
    .any(|cue| message.contains(cue))
}

fn assistant_asked_for_first_name(message: &str) -> bool {
    normalize_apostrophes(message).to_lowercase().contains("first name")
}

fn assistant_asked_for_last_name(message: &str) -> bool {
    let message = normalize_apostrophes(message).to_lowercase();
    ["last name", "surname", "family name"]
        .iter()
        .any(|cue| message.contains(cue))
}

/// Whether the most recent assistant turn already asked for the patient's name.
pub fn last_assistant_asked_for_name(history: &[Message]) -> bool {
    crate::history::last_assistant_message(history).is_some_and(assistant_asked_for_name)
}

/// "my name is X" style introductions across all user text.
fn find_introduced_name(user_text: &str) -> (Option<String>, Option<String>) {
    let normalized = normalize_apostrophes(user_text);
    let mut first_only = None;
    for pattern in NAME_PATTERNS.iter() {
        for caps in pattern.captures_iter(&normalized) {
            let Some(m) = caps.get(1) else { continue };
            let (full, first) = full_and_first(&extract_name_parts(m.as_str()));
            if full.is_some() {
                return (full, None);
            }
            if first_only.is_none() {
                first_only = first;
            }
        }
    }
    (None, first_only)
}

/// The user reply right after an assistant name question.
fn name_from_reply(history: &[Message]) -> (Option<String>, Option<String>) {
    for (i, msg) in history.iter().enumerate() {
        if !msg.is_user() {
            continue;
        }
        if !previous_assistant_message(history, i).is_some_and(assistant_asked_for_name) {
            continue;
        }
        let (full, first) = full_and_first(&extract_name_parts(&msg.content));
        if full.is_some() || first.is_some() {
            return (full, first);
        }
    }
    (None, None)
}

/// Joins a first-name-only reply with a later last-name-only reply.
fn combine_split_replies(history: &[Message], first_name: Option<String>) -> Option<String> {
    let mut first = first_name;
    for (i, msg) in history.iter().enumerate() {
        if !msg.is_user() {
            continue;
        }
        let Some(prev) = previous_assistant_message(history, i) else {
            continue;
        };
        if first.is_none() && (assistant_asked_for_name(prev) || assistant_asked_for_first_name(prev))
        {
            let (full, first_only) = full_and_first(&extract_name_parts(&msg.content));
            if full.is_some() {
                return full;
            }
            if first_only.is_some() {
                first = first_only;
            }
            continue;
        }
        if let Some(known) = &first
            && assistant_asked_for_last_name(prev)
        {
            let parts = extract_name_parts(&msg.content);
            match parts.as_slice() {
                [] => continue,
                [a, b, ..] => return Some(format!("{a} {b}")),
                [last] => return Some(format!("{known} {last}")),
            }
        }
    }
    None
}

/// Full name when known, else a first name, else empty.
pub fn extract_name(history: &[Message], user_text_original: &str) -> String {
    let (mut full, mut first) = find_introduced_name(user_text_original);
    if full.is_none() {
        let (reply_full, reply_first) = name_from_reply(history);
        full = reply_full;
        if first.is_none() {
            first = reply_first;
        }
    }
    if full.is_none() {
        full = combine_split_replies(history, first.clone());
    }
    full.or(first).unwrap_or_default()
}
