// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript walking helpers shared by the extractors.

use concierge_core::{Message, Role};

/// Content of the assistant turn right before `index`, skipping system turns.
///
/// Returns `None` when the nearest non-system turn is not an assistant turn.
pub fn previous_assistant_message(history: &[Message], index: usize) -> Option<&str> {
    history[..index.min(history.len())]
        .iter()
        .rev()
        .find(|m| m.role != Role::System)
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str())
}

/// Most recent assistant turn anywhere in the transcript.
pub fn last_assistant_message(history: &[Message]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str())
}

/// All user turns joined with spaces: `(lowercase, original)`.
pub fn collect_user_messages(history: &[Message]) -> (String, String) {
    let mut lower = String::new();
    let mut original = String::new();
    for msg in history.iter().filter(|m| m.role == Role::User) {
        lower.push_str(&msg.content.to_lowercase());
        lower.push(' ');
        original.push_str(&msg.content);
        original.push(' ');
    }
    (lower, original)
}

/// Curly and prime apostrophes normalized to `'`.
pub fn normalize_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}', '\u{2032}'], "'")
}
