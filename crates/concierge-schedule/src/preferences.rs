// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parses free-text scheduling preferences into a [`TimePreferences`] window.
//!
//! Input is usually the snapshot's `preferred_days` and `preferred_times`
//! joined with a space, e.g. `"monday, thursday after 4pm"`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use concierge_core::TimePreferences;
use regex::{Captures, Regex};

const DAY: &str = r"(sun(?:day)?|mon(?:day)?|tue(?:s(?:day)?)?|wed(?:nesday)?|thu(?:rs(?:day)?)?|fri(?:day)?|sat(?:urday)?)";

static DAY_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"\b{DAY}s?\b")).unwrap());

static DAY_DASH_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b{DAY}\s*[-–—]\s*{DAY}\b")).unwrap());

static DAY_THROUGH_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b{DAY}\s+(?:through|thru|to)\s+{DAY}\b")).unwrap());

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})(?::(\d{2}))?\s*(am|pm|a|p)?\s*[-–—]\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm|a|p)\b")
        .unwrap()
});

static BETWEEN_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"between\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm|a|p)?\s+and\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm|a|p)\b")
        .unwrap()
});

static AFTER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"after\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?",
        r"(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s+or\s+later",
        r"(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s+onwards?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static BARE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d{1,2})(?::(\d{2}))?\s*(am|pm)").unwrap());

static BEFORE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"before\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?",
        r"\bby\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Day number (Sunday = 0) for a day name or abbreviation.
pub fn day_number(word: &str) -> Option<u32> {
    let w = word.trim().to_lowercase();
    let prefix = w.get(..3)?;
    match prefix {
        "sun" => Some(0),
        "mon" => Some(1),
        "tue" => Some(2),
        "wed" => Some(3),
        "thu" => Some(4),
        "fri" => Some(5),
        "sat" => Some(6),
        _ => None,
    }
}

pub fn day_name(day: u32) -> Option<&'static str> {
    DAY_NAMES.get(day as usize).copied()
}

/// Parses `text` into days and an exclusive time window.
///
/// An explicit range ("5-6pm", "between 3 and 5pm") sets both bounds.
/// Otherwise "after"/"before" cues and the morning/afternoon/evening
/// buckets set one bound each. A bare "3pm" counts as "after 3pm".
pub fn extract_time_preferences(text: &str) -> TimePreferences {
    let text = text.to_lowercase();
    let days_of_week = extract_days_of_week(&text);
    let (after, before) = match extract_time_range(&text) {
        Some((after, before)) => (Some(after), Some(before)),
        None => (extract_after_time(&text), extract_before_time(&text)),
    };
    TimePreferences {
        days_of_week,
        after,
        before,
        specific_dates: Vec::new(),
        raw_text: text,
    }
}

fn extract_days_of_week(text: &str) -> Vec<u32> {
    let mut days = BTreeSet::new();

    for re in [&*DAY_DASH_RANGE, &*DAY_THROUGH_RANGE] {
        if let Some(caps) = re.captures(text)
            && let (Some(start), Some(end)) = (day_number(&caps[1]), day_number(&caps[2]))
        {
            // Wraps past Saturday, so "fri-mon" covers the weekend.
            let mut day = start;
            loop {
                days.insert(day);
                if day == end {
                    break;
                }
                day = (day + 1) % 7;
            }
        }
    }

    for caps in DAY_NAME.captures_iter(text) {
        if let Some(day) = day_number(&caps[1]) {
            days.insert(day);
        }
    }

    if text.contains("weekday") {
        days.extend(1..=5);
    }
    if text.contains("weekend") {
        days.extend([0, 6]);
    }
    if text.contains("any day") || text.contains("anytime") {
        days.extend(0..=6);
    }

    days.into_iter().collect()
}

fn normalize_meridiem(m: &str) -> &str {
    match m {
        "a" => "am",
        "p" => "pm",
        other => other,
    }
}

fn number(caps: &Captures<'_>, index: usize) -> u32 {
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// 24-hour time from clock parts. No meridiem leaves the hour as written.
fn clock(hour: u32, minute: u32, meridiem: &str) -> Option<NaiveTime> {
    let hour = match meridiem {
        "pm" if hour != 12 => hour + 12,
        "am" if hour == 12 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, if minute > 59 { 0 } else { minute }, 0)
}

fn extract_time_range(text: &str) -> Option<(NaiveTime, NaiveTime)> {
    let caps = TIME_RANGE
        .captures(text)
        .or_else(|| BETWEEN_RANGE.captures(text))?;
    let end_meridiem = normalize_meridiem(caps.get(6).map_or("", |m| m.as_str()));
    let start_meridiem = match caps.get(3).map(|m| m.as_str()) {
        Some(m) => normalize_meridiem(m),
        // "5-6pm" shares the end's meridiem; "10-2pm" can only start in the morning.
        None if end_meridiem == "pm" && number(&caps, 1) % 12 > number(&caps, 4) % 12 => "am",
        None => end_meridiem,
    };
    let start = clock(number(&caps, 1), number(&caps, 2), start_meridiem)?;
    let end = clock(number(&caps, 4), number(&caps, 5), end_meridiem)?;
    Some((start, end))
}

/// Hour, minute and optional meridiem in groups 1..=3. Hours 1-7 without a
/// meridiem are read as afternoon.
fn loose_time(caps: &Captures<'_>) -> Option<NaiveTime> {
    let hour = number(caps, 1);
    let meridiem = caps.get(3).map_or("", |m| m.as_str());
    let hour = if meridiem.is_empty() && (1..=7).contains(&hour) {
        hour + 12
    } else {
        hour
    };
    clock(hour, number(caps, 2), meridiem)
}

fn extract_after_time(text: &str) -> Option<NaiveTime> {
    for re in AFTER_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            return loose_time(&caps);
        }
    }

    // A bare "3pm" means "3pm or later", unless it belongs to a "before" cue.
    let before_spans: Vec<(usize, usize)> = BEFORE_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| (m.start(), m.end()))
        .collect();
    for caps in BARE_TIME.captures_iter(text) {
        let Some(hour) = caps.get(1) else { continue };
        if before_spans
            .iter()
            .any(|&(start, end)| hour.start() >= start && hour.start() < end)
        {
            continue;
        }
        return loose_time(&caps);
    }

    if text.contains("afternoon") {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    if text.contains("evening") || text.contains("after work") || text.contains("after-work") {
        return NaiveTime::from_hms_opt(17, 0, 0);
    }
    if text.contains("late") {
        return NaiveTime::from_hms_opt(17, 0, 0);
    }
    None
}

fn extract_before_time(text: &str) -> Option<NaiveTime> {
    for re in BEFORE_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            return loose_time(&caps);
        }
    }
    if text.contains("morning")
        || text.contains("before noon")
        || text.contains("before lunch")
        || text.contains("early")
    {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    None
}

/// Whether a slot falls inside the window. Both bounds are exclusive.
pub fn matches_preferences(at: NaiveDateTime, prefs: &TimePreferences) -> bool {
    if !prefs.days_of_week.is_empty()
        && !prefs
            .days_of_week
            .contains(&at.weekday().num_days_from_sunday())
    {
        return false;
    }
    if !prefs.specific_dates.is_empty() && !prefs.specific_dates.contains(&at.date()) {
        return false;
    }
    let time = at.time();
    if prefs.after.is_some_and(|after| time <= after) {
        return false;
    }
    if prefs.before.is_some_and(|before| time >= before) {
        return false;
    }
    true
}

fn display_time(t: NaiveTime) -> String {
    t.format("%-I:%M%P").to_string()
}

/// Human-readable window, e.g. `Monday, Thursday after 4:00pm`.
pub fn format_preferences_for_llm(prefs: &TimePreferences) -> String {
    if prefs.raw_text.trim().is_empty()
        && prefs.days_of_week.is_empty()
        && prefs.after.is_none()
        && prefs.before.is_none()
    {
        return "any day/time".to_string();
    }

    let mut parts = Vec::new();
    let days: Vec<&str> = prefs.days_of_week.iter().filter_map(|d| day_name(*d)).collect();
    if !days.is_empty() {
        parts.push(days.join(", "));
    }
    if let Some(after) = prefs.after {
        parts.push(format!("after {}", display_time(after)));
    }
    if let Some(before) = prefs.before {
        parts.push(format!("before {}", display_time(before)));
    }
    if parts.is_empty() {
        return prefs.raw_text.trim().to_string();
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn days_and_after_time() {
        let prefs = extract_time_preferences("Mondays or Thursdays after 4pm");
        assert_eq!(prefs.days_of_week, vec![1, 4]);
        assert_eq!(prefs.after, t(16, 0));
        assert_eq!(prefs.before, None);
    }

    #[test]
    fn weekdays_before_noon() {
        let prefs = extract_time_preferences("weekdays before noon");
        assert_eq!(prefs.days_of_week, vec![1, 2, 3, 4, 5]);
        assert_eq!(prefs.before, t(12, 0));
        assert_eq!(prefs.after, None);
    }

    #[test]
    fn day_ranges_including_wrap() {
        assert_eq!(extract_time_preferences("tue-thu").days_of_week, vec![2, 3, 4]);
        assert_eq!(
            extract_time_preferences("monday through friday").days_of_week,
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(extract_time_preferences("fri - mon").days_of_week, vec![0, 1, 5, 6]);
    }

    #[test]
    fn day_names_need_word_boundaries() {
        assert!(extract_time_preferences("sometime this month").days_of_week.is_empty());
        assert_eq!(extract_time_preferences("weekends").days_of_week, vec![0, 6]);
        assert_eq!(extract_time_preferences("any day works").days_of_week.len(), 7);
    }

    #[test]
    fn ranges_share_end_meridiem() {
        let prefs = extract_time_preferences("5-6pm");
        assert_eq!(prefs.after, t(17, 0));
        assert_eq!(prefs.before, t(18, 0));

        let prefs = extract_time_preferences("between 10am and 2pm");
        assert_eq!(prefs.after, t(10, 0));
        assert_eq!(prefs.before, t(14, 0));

        let prefs = extract_time_preferences("3:30pm-4:30pm");
        assert_eq!(prefs.after, t(15, 30));
        assert_eq!(prefs.before, t(16, 30));

        let prefs = extract_time_preferences("10-2pm");
        assert_eq!(prefs.after, t(10, 0));
        assert_eq!(prefs.before, t(14, 0));
    }

    #[test]
    fn extracted_window_is_satisfiable() {
        let prefs = extract_time_preferences("after 10am, before 2pm");
        assert_eq!(prefs.after, t(10, 0));
        assert_eq!(prefs.before, t(14, 0));
    }

    #[test]
    fn bare_and_ambiguous_hours() {
        assert_eq!(extract_time_preferences("3pm").after, t(15, 0));
        assert_eq!(extract_time_preferences("after 4").after, t(16, 0));
        assert_eq!(extract_time_preferences("after 10").after, t(10, 0));
        assert_eq!(extract_time_preferences("2pm or later").after, t(14, 0));
    }

    #[test]
    fn before_cue_does_not_set_after() {
        let prefs = extract_time_preferences("before 5pm");
        assert_eq!(prefs.before, t(17, 0));
        assert_eq!(prefs.after, None);
    }

    #[test]
    fn buckets() {
        assert_eq!(extract_time_preferences("afternoons").after, t(12, 0));
        assert_eq!(extract_time_preferences("evening").after, t(17, 0));
        assert_eq!(extract_time_preferences("mornings").before, t(12, 0));
        let flexible = extract_time_preferences("any flexible");
        assert_eq!(flexible.after, None);
        assert_eq!(flexible.before, None);
    }

    #[test]
    fn window_bounds_are_exclusive() {
        let prefs = extract_time_preferences("monday after 3pm");
        // 2026-02-09 is a Monday.
        let day = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        assert!(!matches_preferences(day.and_hms_opt(15, 0, 0).unwrap(), &prefs));
        assert!(matches_preferences(day.and_hms_opt(15, 30, 0).unwrap(), &prefs));
        let tuesday = day.succ_opt().unwrap();
        assert!(!matches_preferences(tuesday.and_hms_opt(16, 0, 0).unwrap(), &prefs));
    }

    #[test]
    fn llm_formatting() {
        assert_eq!(format_preferences_for_llm(&TimePreferences::default()), "any day/time");
        let prefs = extract_time_preferences("mondays and thursdays after 4pm");
        assert_eq!(format_preferences_for_llm(&prefs), "Monday, Thursday after 4:00pm");
        let prefs = extract_time_preferences("flexible");
        assert_eq!(format_preferences_for_llm(&prefs), "flexible");
    }
}
