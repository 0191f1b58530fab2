// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email capture from patient messages.

use std::sync::LazyLock;

use concierge_core::Message;
use regex::Regex;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").unwrap());

/// First email address in `text`, lowercased.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_lowercase())
}

/// Most recent email address a patient typed.
pub fn extract_email_from_history(history: &[Message]) -> Option<String> {
    history
        .iter()
        .rev()
        .filter(|m| m.is_user())
        .find_map(|m| extract_email(&m.content))
}
