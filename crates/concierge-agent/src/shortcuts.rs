// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic replies that skip the reply model.

use std::sync::LazyLock;

use concierge_core::ClinicConfig;
use concierge_qualify::detect_service_key;
use regex::Regex;

pub const PRICE_SHOPPER_NOTE: &str = "tag:price_shopper";
pub const NEEDS_INTENT_NOTE: &str = "state:needs_intent";

pub const QUESTION_INVITE_REPLY: &str = "Absolutely - what can I help with? If it's about a specific service (Botox, fillers, facials, lasers), let me know which one.";

pub const INTENT_CLARIFY_REPLY: &str = "Happy to help. Are you looking to book an appointment, or do you have a question about a specific service (Botox, fillers, facials, lasers)?";

static PRICE_INQUIRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:how much|price|pricing|cost|rate|rates|charge)\b").unwrap()
});

const BARE_QUESTIONS: &[&str] = &[
    "question",
    "quick question",
    "a question",
    "a quick question",
    "just a question",
    "just a quick question",
    "i had a question",
    "i had a quick question",
    "i just had a question",
    "i just had a quick question",
    "i have a question",
    "i have a quick question",
    "i just have a question",
    "i just have a quick question",
    "i got a question",
    "i got a quick question",
    "i've got a question",
    "i've got a quick question",
    "had a question",
    "had a quick question",
    "have a question",
    "have a quick question",
    "got a question",
    "got a quick question",
    "question please",
    "quick question please",
    "quick question for you",
    "i have a quick question for you",
    "i had a quick question for you",
    "i just had a quick question for you",
    "just a question please",
    "just a quick question please",
];

const QUESTION_BYPASS: &[&str] = &[
    "book",
    "appointment",
    "schedule",
    "botox",
    "filler",
    "facial",
    "laser",
    "peel",
    "microneedling",
];

const HELP_BYPASS: &[&str] = &[
    "book",
    "appointment",
    "schedule",
    "available",
    "opening",
    "botox",
    "filler",
    "facial",
    "laser",
    "peel",
    "microneedling",
    "hydrafacial",
];

/// A shortcut reply and the lead note it adds, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub reply: String,
    pub note: Option<&'static str>,
}

pub fn is_price_inquiry(message: &str) -> bool {
    let message = message.trim();
    !message.is_empty() && (PRICE_INQUIRY.is_match(message) || message.contains('$'))
}

/// "I have a quick question" with nothing else to go on.
pub fn is_question_selection(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    let stripped = lower.trim_matches(|c| matches!(c, '.' | '!' | '?'));
    let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() || normalized.contains('?') {
        return false;
    }
    if QUESTION_BYPASS.iter().any(|kw| normalized.contains(kw)) {
        return false;
    }
    BARE_QUESTIONS.contains(&normalized.as_str())
}

/// Asks for help or info without naming a service or booking intent.
pub fn is_ambiguous_help(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    if !["help", "question", "info"].iter().any(|kw| lower.contains(kw)) {
        return false;
    }
    !HELP_BYPASS.iter().any(|kw| lower.contains(kw))
}

/// Display name for a detected service key: the configured spelling when
/// listed, else title case.
fn display_name(service: &str, cfg: &ClinicConfig) -> String {
    if let Some(listed) = cfg.services.iter().find(|s| s.eq_ignore_ascii_case(service)) {
        return listed.clone();
    }
    service
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Price reply for a priced service named in `message`.
pub fn price_reply(message: &str, cfg: &ClinicConfig) -> Option<String> {
    if !is_price_inquiry(message) {
        return None;
    }
    let service = detect_service_key(message, cfg)?;
    let price = cfg.price_text_for_service(&service)?;
    let deposit = cfg.deposit_amount_for_service(&service) as f64 / 100.0;
    Some(format!(
        "{} pricing: {price}. To secure priority booking, we collect a small refundable deposit of ${deposit:.0} that applies toward your treatment. Would you like to proceed?",
        display_name(&service, cfg)
    ))
}

/// First matching shortcut. Price replies need clinic config.
pub fn match_shortcut(message: &str, cfg: Option<&ClinicConfig>) -> Option<Shortcut> {
    if let Some(cfg) = cfg
        && let Some(reply) = price_reply(message, cfg)
    {
        return Some(Shortcut {
            reply,
            note: Some(PRICE_SHOPPER_NOTE),
        });
    }
    if is_question_selection(message) {
        return Some(Shortcut {
            reply: QUESTION_INVITE_REPLY.to_string(),
            note: None,
        });
    }
    if is_ambiguous_help(message) {
        return Some(Shortcut {
            reply: INTENT_CLARIFY_REPLY.to_string(),
            note: Some(NEEDS_INTENT_NOTE),
        });
    }
    None
}

/// Appends `note` to existing lead notes with ` | `, skipping duplicates.
pub fn append_lead_note(existing: &str, note: &str) -> String {
    let existing = existing.trim();
    let note = note.trim();
    if existing.is_empty() {
        note.to_string()
    } else if note.is_empty() || existing.contains(note) {
        existing.to_string()
    } else {
        format!("{existing} | {note}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clinic() -> ClinicConfig {
        let mut cfg = ClinicConfig::new("org_1", "Glow Med Spa");
        cfg.services = vec!["Botox".into(), "Hydrafacial".into()];
        cfg.service_price_text
            .insert("botox".into(), "$12 per unit".into());
        cfg.service_deposit_amount_cents.insert("botox".into(), 7500);
        cfg
    }

    #[test]
    fn price_inquiry_for_priced_service() {
        let reply = price_reply("How much is Botox?", &clinic()).unwrap();
        assert_eq!(
            reply,
            "Botox pricing: $12 per unit. To secure priority booking, we collect a small refundable deposit of $75 that applies toward your treatment. Would you like to proceed?"
        );
    }

    #[test]
    fn price_inquiry_without_price_text_falls_through() {
        assert!(price_reply("how much is a hydrafacial", &clinic()).is_none());
        assert!(price_reply("botox please", &clinic()).is_none());
    }

    #[test]
    fn bare_question_detection() {
        assert!(is_question_selection("I have a quick question!"));
        assert!(is_question_selection("  Quick   question. "));
        assert!(!is_question_selection("I have a question about botox"));
        assert!(!is_question_selection("can I ask a question?"));
    }

    #[test]
    fn ambiguous_help_detection() {
        assert!(is_ambiguous_help("I need some help"));
        assert!(is_ambiguous_help("looking for info"));
        assert!(!is_ambiguous_help("help me book botox"));
        assert!(!is_ambiguous_help("anything available thursday? need help"));
        assert!(!is_ambiguous_help("hello there"));
    }

    #[test]
    fn shortcut_order() {
        let cfg = clinic();
        let price = match_shortcut("what's the price of botox", Some(&cfg)).unwrap();
        assert_eq!(price.note, Some(PRICE_SHOPPER_NOTE));
        let invite = match_shortcut("quick question", Some(&cfg)).unwrap();
        assert_eq!(invite.reply, QUESTION_INVITE_REPLY);
        assert_eq!(invite.note, None);
        let help = match_shortcut("can you help", None).unwrap();
        assert_eq!(help.note, Some(NEEDS_INTENT_NOTE));
        assert!(match_shortcut("I'd like botox on friday", Some(&cfg)).is_none());
    }

    #[test]
    fn lead_notes_are_deduplicated() {
        assert_eq!(append_lead_note("", "tag:a"), "tag:a");
        assert_eq!(append_lead_note("tag:a", "tag:b"), "tag:a | tag:b");
        assert_eq!(append_lead_note("tag:a | tag:b", "tag:b"), "tag:a | tag:b");
    }
}
