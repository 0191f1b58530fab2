// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Markdown stripping for SMS delivery.

use std::sync::LazyLock;

use regex::Regex;

static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^\s*][^*]*[^\s*])\*").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[-•]\s+").unwrap());
static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").unwrap());
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Removes markdown that SMS clients show literally: bold and italic
/// markers, list bullets, list numbering. Whitespace runs collapse to one
/// space.
pub fn sanitize_sms(text: &str) -> String {
    let text = text.replace("**", "");
    let text = ITALIC.replace_all(&text, "$1");
    let text = BULLET.replace_all(&text, "");
    let text = NUMBERED.replace_all(&text, "");
    let text = MULTI_SPACE.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_emphasis() {
        assert_eq!(
            sanitize_sms("**Botox** is *really* popular"),
            "Botox is really popular"
        );
    }

    #[test]
    fn strips_lists() {
        let text = "Options:\n- Botox\n• Filler\n1. Facial\n  2. Peel";
        assert_eq!(sanitize_sms(text), "Options:\nBotox\nFiller\nFacial\nPeel");
    }

    #[test]
    fn keeps_lone_asterisk_and_prices() {
        assert_eq!(sanitize_sms("Deposit is $50 * refundable"), "Deposit is $50 * refundable");
        assert_eq!(sanitize_sms("  hi   there  "), "hi there");
    }
}
