// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM fallback that classifies whether to send a deposit link.

use concierge_core::{ConciergeError, Message};
use serde::Deserialize;

/// Raw classifier verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClassifierDecision {
    #[serde(default)]
    pub collect: bool,
    #[serde(default)]
    pub amount_cents: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub success_url: String,
    #[serde(default)]
    pub cancel_url: String,
}

pub fn system_prompt(default_amount_cents: i64) -> String {
    format!(
        r#"You are a deposit decision agent for a med spa assistant. Analyze a conversation and decide if we should send a payment link to collect a deposit.

CRITICAL: Return ONLY a JSON object, nothing else. No markdown, no code fences, no explanation.

Return this exact format:
{{"collect": true, "amount_cents": {default_amount_cents}, "description": "Refundable deposit", "success_url": "", "cancel_url": ""}}

Rules:
- ONLY set collect=true if the customer EXPLICITLY agreed to the deposit with words like "yes", "sure", "ok", "proceed", "let's do it", "I'll pay", etc.
- Set collect=false if:
  - Customer hasn't been asked about the deposit yet
  - Customer was just offered the deposit but hasn't responded yet
  - Customer declined or said "no", "not now", "maybe later", etc.
  - The assistant just asked "Would you like to proceed?" - WAIT for their response
- Default amount: {default_amount_cents} cents
- For success_url and cancel_url: use empty strings
"#
    )
}

/// The last `limit` messages as `role: content` lines.
pub fn condense_transcript(history: &[Message], limit: usize) -> String {
    let start = history.len().saturating_sub(limit);
    let mut out = String::new();
    for msg in &history[start..] {
        out.push_str(&msg.role.to_string());
        out.push_str(": ");
        out.push_str(&msg.content);
        out.push('\n');
    }
    out
}

/// Code fences stripped and trimmed.
pub fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parses classifier output, tolerating fences and surrounding prose.
pub fn parse_decision(raw: &str) -> Result<ClassifierDecision, ConciergeError> {
    let text = strip_fences(raw);
    let json = if text.starts_with('{') {
        text
    } else {
        match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if end > start => &text[start..=end],
            _ => text,
        }
    };
    serde_json::from_str(json).map_err(|e| ConciergeError::Parse {
        message: format!("deposit classifier: {e}"),
    })
}

/// At most `max` bytes of `raw`, cut on a char boundary.
pub fn truncate_for_log(raw: &str, max: usize) -> String {
    let raw = raw.trim();
    if raw.len() <= max {
        return raw.to_string();
    }
    let mut end = max;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &raw[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let d = parse_decision(r#"{"collect": true, "amount_cents": 7500}"#).unwrap();
        assert!(d.collect);
        assert_eq!(d.amount_cents, 7500);
        assert_eq!(d.description, "");
    }

    #[test]
    fn parses_fenced_and_wrapped_json() {
        let fenced = "```json\n{\"collect\": false}\n```";
        assert!(!parse_decision(fenced).unwrap().collect);

        let chatty = "Sure! Here is my answer: {\"collect\": true, \"description\": \"Deposit\"} Hope that helps.";
        let d = parse_decision(chatty).unwrap();
        assert!(d.collect);
        assert_eq!(d.description, "Deposit");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_decision("I think they want to pay"),
            Err(ConciergeError::Parse { .. })
        ));
        assert!(parse_decision("{not json}").is_err());
    }

    #[test]
    fn condensed_transcript_keeps_tail() {
        let history = vec![
            Message::system("prompt"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        assert_eq!(condense_transcript(&history, 2), "user: hi\nassistant: hello\n");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_for_log("short", 512), "short");
        let long = "é".repeat(400);
        let cut = truncate_for_log(&long, 511);
        assert!(cut.ends_with("...(truncated)"));
        assert_eq!(cut.len(), 510 + "...(truncated)".len());
    }

    #[test]
    fn prompt_carries_default_amount() {
        assert!(system_prompt(5000).contains("Default amount: 5000 cents"));
        assert!(system_prompt(5000).contains(r#"{"collect": true, "amount_cents": 5000"#));
    }
}
