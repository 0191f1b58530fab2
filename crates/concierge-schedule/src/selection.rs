// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matches a free-text reply against the slots already presented.

use std::sync::LazyLock;

use chrono::{Datelike, Timelike};
use concierge_core::{Slot, TimePreferences};
use regex::Regex;

use crate::preferences::{day_number, matches_preferences};
use crate::refine::is_more_times_request;

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static OPTION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:option|number|#|choice)\s*(\d+)$").unwrap());

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(first|second|third|fourth|fifth|sixth|1st|2nd|3rd|4th|5th|6th)\b").unwrap()
});

static MONTH_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\w*\s+\d").unwrap());

static TIME_WITH_MERIDIEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?|am|pm|a|p)\b").unwrap()
});

static MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b{MONTH}\s+(\d{{1,2}})(?:st|nd|rd|th)?\b")).unwrap());

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})").unwrap());

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(sun(?:day)?|mon(?:day)?|tue(?:s(?:day)?)?|wed(?:nesday)?|thu(?:r(?:s(?:day)?)?)?|fri(?:day)?|sat(?:urday)?)\b")
        .unwrap()
});

static DAY_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

static BARE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2})\b").unwrap());

fn ordinal_value(word: &str) -> Option<usize> {
    match word {
        "first" | "1st" => Some(1),
        "second" | "2nd" => Some(2),
        "third" | "3rd" => Some(3),
        "fourth" | "4th" => Some(4),
        "fifth" | "5th" => Some(5),
        "sixth" | "6th" => Some(6),
        _ => None,
    }
}

/// Month number for a month name or its three-letter prefix.
pub fn month_number(word: &str) -> Option<u32> {
    let prefix = word.get(..3)?.to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn by_index(slots: &[Slot], n: usize) -> Option<&Slot> {
    if n >= 1 && n <= slots.len() {
        slots.get(n - 1)
    } else {
        None
    }
}

/// Narrows candidates with the time window. Without a window every
/// candidate survives.
fn disambiguate<'a>(candidates: Vec<&'a Slot>, prefs: &TimePreferences) -> Vec<&'a Slot> {
    if prefs.after.is_none() && prefs.before.is_none() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|slot| matches_preferences(slot.date_time, prefs))
        .collect()
}

/// Slots on the date the message names: month and day, `M/D`, a weekday,
/// or "the 28th".
fn slots_on_named_date<'a>(message: &str, slots: &'a [Slot]) -> Vec<&'a Slot> {
    let on = |month: Option<u32>, day: u32| -> Vec<&'a Slot> {
        slots
            .iter()
            .filter(|s| month.is_none_or(|m| s.date_time.month() == m) && s.date_time.day() == day)
            .collect()
    };

    if let Some(caps) = MONTH_DAY.captures(message)
        && let Some(month) = month_number(&caps[1])
        && let Ok(day) = caps[2].parse::<u32>()
    {
        let hits = on(Some(month), day);
        if !hits.is_empty() {
            return hits;
        }
    }

    if let Some(caps) = NUMERIC_DATE.captures(message)
        && let (Ok(month), Ok(day)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>())
        && (1..=12).contains(&month)
    {
        let hits = on(Some(month), day);
        if !hits.is_empty() {
            return hits;
        }
    }

    for caps in WEEKDAY.captures_iter(message) {
        let Some(day) = day_number(&caps[1]) else {
            continue;
        };
        let hits: Vec<&Slot> = slots
            .iter()
            .filter(|s| s.date_time.weekday().num_days_from_sunday() == day)
            .collect();
        if !hits.is_empty() {
            return hits;
        }
    }

    if let Some(caps) = DAY_ORDINAL.captures(message)
        && let Ok(day) = caps[1].parse::<u32>()
        && (1..=31).contains(&day)
    {
        return on(None, day);
    }

    Vec::new()
}

/// The presented slot a reply picks, if any.
///
/// Tried in order: a "more times" request (never a selection), "option N",
/// ordinal words, a clock time with am/pm, a named date, then a bare number
/// read as a slot index or, out of range, as an hour. `prefs` breaks ties
/// between slots sharing a date or an hour.
pub fn detect_time_selection<'a>(
    message: &str,
    slots: &'a [Slot],
    prefs: &TimePreferences,
) -> Option<&'a Slot> {
    let message = message.trim().to_lowercase();
    if message.is_empty() || slots.is_empty() || is_more_times_request(&message) {
        return None;
    }

    if let Some(caps) = OPTION_NUMBER.captures(&message)
        && let Ok(n) = caps[1].parse::<usize>()
        && let Some(slot) = by_index(slots, n)
    {
        return Some(slot);
    }

    if !MONTH_CONTEXT.is_match(&message)
        && let Some(slot) = ORDINAL
            .captures_iter(&message)
            .filter_map(|caps| ordinal_value(&caps[1]))
            .find_map(|n| by_index(slots, n))
    {
        return Some(slot);
    }

    if let Some(caps) = TIME_WITH_MERIDIEM.captures(&message) {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        let minute: u32 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        let meridiem = caps[3].replace('.', "");
        let hour = match meridiem.as_str() {
            "pm" | "p" if hour != 12 => hour + 12,
            "am" | "a" if hour == 12 => 0,
            _ => hour,
        };
        // An explicit time that matches nothing is not a selection.
        return slots
            .iter()
            .find(|s| s.date_time.hour() == hour && s.date_time.minute() == minute);
    }

    let on_date = slots_on_named_date(&message, slots);
    if let Some(first) = on_date.first().copied() {
        let narrowed = disambiguate(on_date, prefs);
        return Some(if narrowed.len() == 1 { narrowed[0] } else { first });
    }

    let caps = BARE_NUMBER.captures(&message)?;
    let n: u32 = caps[1].parse().ok()?;
    if let Some(slot) = by_index(slots, n as usize) {
        return Some(slot);
    }

    let by_hour: Vec<&Slot> = slots
        .iter()
        .filter(|s| {
            let h = s.date_time.hour();
            h == n || h == n + 12 || (n == 12 && h == 0)
        })
        .collect();
    match by_hour.len() {
        0 => None,
        1 => Some(by_hour[0]),
        _ => {
            let narrowed = disambiguate(by_hour, prefs);
            if narrowed.len() == 1 { Some(narrowed[0]) } else { None }
        }
    }
}
