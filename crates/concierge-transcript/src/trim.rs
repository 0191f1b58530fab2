// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History trimming and request shaping.

use concierge_core::Message;

/// Keeps the newest `limit` messages.
///
/// A leading system message is pinned: it stays first and counts toward the
/// limit. Order is never changed. A zero limit disables trimming.
pub fn trim_history(history: &[Message], limit: usize) -> Vec<Message> {
    if limit == 0 || history.len() <= limit {
        return history.to_vec();
    }
    match history.first() {
        Some(first) if first.is_system() => {
            let keep = limit - 1;
            let start = (history.len() - keep).max(1);
            let mut out = Vec::with_capacity(limit);
            out.push(first.clone());
            out.extend_from_slice(&history[start..]);
            out
        }
        _ => history[history.len() - limit..].to_vec(),
    }
}

/// Splits system content from the dialogue. Blank messages are dropped.
pub fn split_system_and_messages(history: &[Message]) -> (Vec<String>, Vec<Message>) {
    let mut system = Vec::with_capacity(4);
    let mut messages = Vec::with_capacity(history.len());
    for msg in history.iter().filter(|m| !m.content.trim().is_empty()) {
        if msg.is_system() {
            system.push(msg.content.clone());
        } else {
            messages.push(msg.clone());
        }
    }
    (system, messages)
}
