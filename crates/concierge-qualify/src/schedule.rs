// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preferred days and times from free text.

use std::sync::LazyLock;

use concierge_core::Message;
use regex::Regex;

use crate::history::{normalize_apostrophes, previous_assistant_message};

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d{1,2})(?::(\d{2}))?\s*(a\.m\.|p\.m\.|am|pm|a|p)?\s*[-–—]\s*(\d{1,2})(?::(\d{2}))?\s*(a\.m\.|p\.m\.|am|pm|a|p)",
    )
    .unwrap()
});

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)between\s+(\d{1,2})(?::(\d{2}))?\s*(a\.m\.|p\.m\.|am|pm|a|p)?\s+and\s+(\d{1,2})(?::(\d{2}))?\s*(a\.m\.|p\.m\.|am|pm|a|p)",
    )
    .unwrap()
});

static SPECIFIC_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(around |about |at |after |before )?(\d{1,2})(?::(\d{2}))?\s*(a\.m\.|p\.m\.|am|pm|a|p)\b")
        .unwrap()
});

static NOON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(noon|midday)\b").unwrap());

const DAY_NAMES: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const ANY_DAY: &[&str] = &["any day", "flexible", "anytime", "whenever", "open schedule"];

const FLEXIBLE_TIME: &[&str] = &[
    "anytime",
    "any time",
    "flexible",
    "whenever",
    "doesn't matter",
    "don't care",
    "works for me",
    "i'm free",
    "i am free",
    "open schedule",
];

const SCHEDULE_QUESTION: &[&str] = &[
    "days and times",
    "day and time",
    "what days",
    "what times",
    "when works",
    "when would",
    "preferred time",
    "preferred day",
    "schedule",
    "availability",
    "work best for you",
    "work for you",
    "convenient for you",
];

static FLEXIBLE_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(whenever\w*|anything\w*|open|i'?m open|i am open|wide open|no pref(erence)?|doesn'?t matter|dont matter|don'?t care|dont care|whatever\w*|any|any ?time|any day|flexible\w*|free\w*|works for me|all good|good with anything)\b",
    )
    .unwrap()
});

/// Day preference: "weekdays", "weekends", "any", or named days.
pub fn extract_days(text_lower: &str) -> String {
    if text_lower.contains("weekday") {
        return "weekdays".to_string();
    }
    if text_lower.contains("weekend") {
        return "weekends".to_string();
    }
    if ANY_DAY.iter().any(|p| text_lower.contains(p)) {
        return "any".to_string();
    }
    DAY_NAMES
        .iter()
        .filter(|day| text_lower.contains(*day))
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn meridiem(raw: &str) -> &'static str {
    if raw.to_lowercase().starts_with('a') {
        "am"
    } else {
        "pm"
    }
}

fn clock(hour: &str, minute: Option<regex::Match<'_>>) -> String {
    match minute {
        Some(m) => format!("{hour}:{}", m.as_str()),
        None => hour.to_string(),
    }
}

/// A start without its own am/pm takes the end's, except "10-2pm" style
/// ranges where a larger start hour can only be morning.
fn range_from(caps: &regex::Captures<'_>) -> String {
    let end = meridiem(&caps[6].replace('.', ""));
    let start = match caps.get(3) {
        Some(own) => meridiem(&own.as_str().replace('.', "")),
        None => {
            let hour = |raw: &str| raw.parse::<u32>().map(|h| h % 12).unwrap_or_default();
            if end == "pm" && hour(&caps[1]) > hour(&caps[4]) {
                "am"
            } else {
                end
            }
        }
    };
    format!(
        "after {}{start}, before {}{end}",
        clock(&caps[1], caps.get(2)),
        clock(&caps[4], caps.get(5)),
    )
}

/// Time preference: an explicit range, specific times, or a bucket.
pub fn extract_times(text_lower: &str) -> String {
    if let Some(caps) = TIME_RANGE.captures(text_lower).or_else(|| BETWEEN.captures(text_lower)) {
        return range_from(&caps);
    }

    let specific: Vec<String> = SPECIFIC_TIME
        .captures_iter(text_lower)
        .map(|caps| {
            let qualifier = caps
                .get(1)
                .map(|q| q.as_str().trim())
                .filter(|q| *q == "after" || *q == "before")
                .map(|q| format!("{q} "))
                .unwrap_or_default();
            let ampm = meridiem(&caps[4].replace('.', ""));
            format!("{qualifier}{}{ampm}", clock(&caps[2], caps.get(3)))
        })
        .collect();
    if !specific.is_empty() {
        return specific.join(", ");
    }

    if NOON.is_match(text_lower) {
        "noon".to_string()
    } else if text_lower.contains("morning") {
        "morning".to_string()
    } else if text_lower.contains("afternoon") {
        "afternoon".to_string()
    } else if ["evening", "after work", "late"]
        .iter()
        .any(|p| text_lower.contains(p))
    {
        "evening".to_string()
    } else if FLEXIBLE_TIME.iter().any(|p| text_lower.contains(p)) {
        "flexible".to_string()
    } else {
        String::new()
    }
}

fn assistant_asked_schedule(message: &str) -> bool {
    let m = normalize_apostrophes(message).to_lowercase();
    SCHEDULE_QUESTION.iter().any(|cue| m.contains(cue))
}

/// "whenever works" style reply to a schedule question.
///
/// Only consulted when neither days nor times were found anywhere.
pub fn flexible_schedule_reply(history: &[Message]) -> bool {
    history.iter().enumerate().rev().any(|(i, msg)| {
        msg.is_user()
            && previous_assistant_message(history, i).is_some_and(assistant_asked_schedule)
            && FLEXIBLE_REPLY.is_match(&normalize_apostrophes(&msg.content).to_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_buckets() {
        assert_eq!(extract_days("weekdays are best"), "weekdays");
        assert_eq!(extract_days("only on the weekend"), "weekends");
        assert_eq!(extract_days("tuesday or thursday"), "tuesday, thursday");
        assert_eq!(extract_days("i'm flexible"), "any");
        assert_eq!(extract_days("saturday"), "saturday");
        assert_eq!(extract_days("no idea"), "");
    }

    #[test]
    fn ranges_keep_each_meridiem() {
        assert_eq!(extract_times("tuesdays 10am-2pm"), "after 10am, before 2pm");
        assert_eq!(extract_times("between 9 a.m. and 1 p.m."), "after 9am, before 1pm");
        assert_eq!(extract_times("11:30am - 1pm"), "after 11:30am, before 1pm");
    }

    #[test]
    fn bare_range_start_borrows_the_end_meridiem() {
        assert_eq!(extract_times("10-2pm works"), "after 10am, before 2pm");
        assert_eq!(extract_times("12-3pm"), "after 12pm, before 3pm");
        assert_eq!(extract_times("between 1 and 4 p.m."), "after 1pm, before 4pm");
        assert_eq!(extract_times("9:30 - 11:00am"), "after 9:30am, before 11:00am");
    }

    #[test]
    fn specific_times_with_qualifiers() {
        assert_eq!(extract_times("after 3pm"), "after 3pm");
        assert_eq!(extract_times("around 10am or before 4:15 pm"), "10am, before 4:15pm");
    }

    #[test]
    fn buckets() {
        assert_eq!(extract_times("lunch at noon"), "noon");
        assert_eq!(extract_times("mornings please"), "morning");
        assert_eq!(extract_times("after work is best"), "evening");
        assert_eq!(extract_times("anytime"), "flexible");
        assert_eq!(extract_times("botox"), "");
    }

    #[test]
    fn flexible_reply_requires_schedule_question() {
        let asked = vec![
            Message::assistant("What days and times work best?"),
            Message::user("whenever works"),
        ];
        assert!(flexible_schedule_reply(&asked));

        let unrelated = vec![
            Message::assistant("What's your name?"),
            Message::user("whatever"),
        ];
        assert!(!flexible_schedule_reply(&unrelated));
    }
}
