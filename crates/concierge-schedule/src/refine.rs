// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! "Show me other times" handling.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use concierge_core::{QualificationSnapshot, Slot, TimePreferences};
use regex::Regex;

use crate::preferences::extract_time_preferences;
use crate::selection::month_number;

const MORE_TIMES_PHRASES: &[&str] = &[
    "more times",
    "more options",
    "other times",
    "other options",
    "different times",
    "different options",
    "later times",
    "earlier times",
    "any times",
    "any other",
    "anything else",
    "what else",
    "more availability",
    "other availability",
    "check again",
    "look again",
    "search again",
    "any later",
    "any earlier",
    "anything later",
    "anything earlier",
];

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\s+(\d{1,2})")
        .unwrap()
});

static TRAILING_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:and|&|,)\s+(\d{1,2})(?:st|nd|rd|th)?(?:\s|$|\?)").unwrap());

/// Whether the patient is asking for different times rather than picking one.
/// Expects lowercased text.
pub fn is_more_times_request(message_lower: &str) -> bool {
    MORE_TIMES_PHRASES
        .iter()
        .any(|phrase| message_lower.contains(phrase))
}

/// Next occurrence of `month`/`day` on or after `today`.
fn upcoming(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(d) if d >= today => Some(d),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

/// Calendar dates named in a message, e.g. "Mar 2 and 4th". Bare day
/// numbers after "and" take the last named month.
pub fn extract_specific_dates(message_lower: &str, today: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut last_month = None;

    for caps in MONTH_DAY.captures_iter(message_lower) {
        let (Some(month), Ok(day)) = (month_number(&caps[1]), caps[2].parse::<u32>()) else {
            continue;
        };
        if let Some(date) = upcoming(today, month, day) {
            dates.push(date);
            last_month = Some(month);
        }
    }

    if let Some(month) = last_month {
        for caps in TRAILING_DAY.captures_iter(message_lower) {
            if let Ok(day) = caps[1].parse::<u32>()
                && let Some(date) = upcoming(today, month, day)
                && !dates.contains(&date)
            {
                dates.push(date);
            }
        }
    }
    dates
}

fn shown_times<'a>(
    slots: &'a [Slot],
    dates: &'a [NaiveDate],
) -> impl Iterator<Item = NaiveTime> + 'a {
    slots
        .iter()
        .filter(move |s| dates.is_empty() || dates.contains(&s.date_time.date()))
        .map(|s| s.date_time.time())
}

/// Time window for a re-fetch after a "more times" request.
///
/// Starts from the patient's stated schedule. Named dates replace the
/// preferred days. "later" moves the lower bound one minute past the latest
/// time already shown on those dates; "earlier" moves the upper bound to the
/// earliest one and drops the lower bound.
pub fn build_refined_preferences(
    message: &str,
    snapshot: &QualificationSnapshot,
    previous: &[Slot],
    today: NaiveDate,
) -> TimePreferences {
    let message = message.to_lowercase();
    let mut prefs = extract_time_preferences(&format!(
        "{} {}",
        snapshot.preferred_days, snapshot.preferred_times
    ));

    let dates = extract_specific_dates(&message, today);
    if !dates.is_empty() {
        let mut days: Vec<u32> = Vec::new();
        for d in &dates {
            let wd = d.weekday().num_days_from_sunday();
            if !days.contains(&wd) {
                days.push(wd);
            }
        }
        prefs.days_of_week = days;
        prefs.specific_dates = dates.clone();
    }

    if message.contains("later")
        && let Some(latest) = shown_times(previous, &dates).max()
        && latest > NaiveTime::default()
    {
        let minutes = latest.hour() * 60 + latest.minute() + 1;
        prefs.after = NaiveTime::from_hms_opt((minutes / 60) % 24, minutes % 60, 0);
    }

    if message.contains("earlier")
        && let Some(earliest) = shown_times(previous, &dates).min()
        && earliest > NaiveTime::default()
    {
        prefs.before = Some(earliest);
        prefs.after = None;
    }

    prefs
}

/// Drops times that were already presented.
pub fn filter_out_previous_slots(
    fresh: Vec<NaiveDateTime>,
    previous: &[Slot],
) -> Vec<NaiveDateTime> {
    fresh
        .into_iter()
        .filter(|at| !previous.iter().any(|p| p.date_time == *at))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::build_slots;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn at(m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn more_times_phrases() {
        assert!(is_more_times_request("any later times on mar 2?"));
        assert!(is_more_times_request("can you check again"));
        assert!(!is_more_times_request("2"));
    }

    #[test]
    fn dates_with_trailing_day() {
        let dates = extract_specific_dates("any later times on mar 2 and 4th?", date(2, 20));
        assert_eq!(dates, vec![date(3, 2), date(3, 4)]);
    }

    #[test]
    fn past_dates_roll_to_next_year() {
        let dates = extract_specific_dates("jan 5", date(2, 20));
        assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2027, 1, 5).unwrap()]);
    }

    #[test]
    fn later_shifts_past_latest_shown() {
        let previous = build_slots(&[at(3, 2, 15, 0), at(3, 2, 16, 30), at(3, 3, 18, 0)]);
        let snapshot = QualificationSnapshot {
            preferred_days: "weekdays".into(),
            preferred_times: "afternoon".into(),
            ..Default::default()
        };
        let prefs = build_refined_preferences("any later times on Mar 2?", &snapshot, &previous, date(2, 20));
        // 2026-03-02 is a Monday.
        assert_eq!(prefs.days_of_week, vec![1]);
        assert_eq!(prefs.specific_dates, vec![date(3, 2)]);
        assert_eq!(prefs.after, NaiveTime::from_hms_opt(16, 31, 0));
    }

    #[test]
    fn earlier_clears_lower_bound() {
        let previous = build_slots(&[at(3, 2, 15, 0), at(3, 3, 13, 0)]);
        let snapshot = QualificationSnapshot {
            preferred_times: "after 12pm".into(),
            ..Default::default()
        };
        let prefs = build_refined_preferences("anything earlier?", &snapshot, &previous, date(2, 20));
        assert_eq!(prefs.before, NaiveTime::from_hms_opt(13, 0, 0));
        assert_eq!(prefs.after, None);
    }

    #[test]
    fn previous_slots_are_filtered() {
        let previous = build_slots(&[at(3, 2, 15, 0)]);
        let fresh = vec![at(3, 2, 15, 0), at(3, 2, 17, 0)];
        assert_eq!(filter_out_previous_slots(fresh, &previous), vec![at(3, 2, 17, 0)]);
    }
}
