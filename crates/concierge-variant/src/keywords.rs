// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword pass and clarification wording.

const IN_PERSON_CUES: &[&str] = &[
    "in person",
    "in-person",
    "come in",
    "office",
    "clinic",
    "walk in",
    "walk-in",
    "face to face",
    "on-site",
    "on site",
];

const VIRTUAL_CUES: &[&str] = &[
    "virtual",
    "telehealth",
    "online",
    "video",
    "zoom",
    "remote",
    "from home",
    "phone call",
    "telemedicine",
];

fn is_in_person_variant(variant_lower: &str) -> bool {
    variant_lower.contains("in person") || variant_lower.contains("in-person")
}

fn is_virtual_variant(variant_lower: &str) -> bool {
    VIRTUAL_CUES[..3].iter().any(|cue| variant_lower.contains(cue))
}

/// First variant whose cue set matches a message. Messages are scanned in
/// the order given, so pass the most recent first.
pub fn keyword_match<'a, S: AsRef<str>>(variants: &'a [String], messages: &[S]) -> Option<&'a str> {
    for msg in messages {
        let msg = msg.as_ref().to_lowercase();
        for variant in variants {
            let lower = variant.to_lowercase();
            let cues = if is_in_person_variant(&lower) {
                IN_PERSON_CUES
            } else if is_virtual_variant(&lower) {
                VIRTUAL_CUES
            } else {
                continue;
            };
            if cues.iter().any(|cue| msg.contains(cue)) {
                return Some(variant.as_str());
            }
        }
    }
    None
}

/// The part after `" - "`, which is what patients recognise.
fn short_label(variant: &str) -> &str {
    variant.split_once(" - ").map_or(variant, |(_, tail)| tail)
}

pub fn clarification_question(variants: &[String]) -> String {
    let names: Vec<&str> = variants.iter().map(|v| short_label(v)).collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => format!("Would you like {only}?"),
        [a, b] => format!("We offer {a} and {b}. Which are you interested in?"),
        [rest @ .., last] => format!(
            "We offer {}, or {last}. Which are you interested in?",
            rest.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants() -> Vec<String> {
        vec![
            "Weight Loss Consult - In Person".to_string(),
            "Weight Loss Consult - Virtual".to_string(),
        ]
    }

    #[test]
    fn newest_message_wins() {
        let v = variants();
        let messages = ["can we do it over zoom", "i'd rather come in"];
        assert_eq!(keyword_match(&v, &messages), Some("Weight Loss Consult - Virtual"));
        let messages = ["i'd rather come in", "can we do it over zoom"];
        assert_eq!(keyword_match(&v, &messages), Some("Weight Loss Consult - In Person"));
        assert_eq!(keyword_match(&v, &["next tuesday"]), None);
    }

    #[test]
    fn question_wording() {
        assert_eq!(
            clarification_question(&variants()),
            "We offer In Person and Virtual. Which are you interested in?"
        );
        let three = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(
            clarification_question(&three),
            "We offer A, B, or C. Which are you interested in?"
        );
    }
}
