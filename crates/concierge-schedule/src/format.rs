// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot labels and the numbered SMS list.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime};
use concierge_core::Slot;

/// `Mon Feb 10 at 10:00 AM`
pub fn slot_label(at: NaiveDateTime) -> String {
    at.format("%a %b %-d at %-I:%M %p").to_string()
}

/// Long form used in confirmations: `Monday, February 10 at 10:00 AM`.
pub fn long_label(at: NaiveDateTime) -> String {
    at.format("%A, %B %-d at %-I:%M %p").to_string()
}

/// Numbers times from 1 in the order given.
pub fn build_slots(times: &[NaiveDateTime]) -> Vec<Slot> {
    times
        .iter()
        .enumerate()
        .map(|(i, at)| Slot {
            index: i + 1,
            date_time: *at,
            label: slot_label(*at),
        })
        .collect()
}

/// Picks at most `total` times, round-robin across days with at most
/// `max_per_day` from any single day. The result is sorted.
pub fn spread_slots_across_days(
    mut times: Vec<NaiveDateTime>,
    total: usize,
    max_per_day: usize,
) -> Vec<NaiveDateTime> {
    times.sort();
    times.dedup();
    if times.len() <= total {
        return times;
    }

    let mut by_day: BTreeMap<NaiveDate, Vec<NaiveDateTime>> = BTreeMap::new();
    for at in times {
        by_day.entry(at.date()).or_default().push(at);
    }

    let mut picked = Vec::with_capacity(total);
    'rounds: for round in 0..max_per_day {
        for day in by_day.values() {
            if picked.len() >= total {
                break 'rounds;
            }
            if let Some(at) = day.get(round) {
                picked.push(*at);
            }
        }
    }
    picked.sort();
    picked
}

/// Numbered list the patient answers with a slot number.
pub fn format_slots_for_sms(slots: &[Slot], service: &str, exact_match: bool) -> String {
    if slots.is_empty() {
        return format!(
            "I couldn't find any available times for {service} in the next week. Would you like me to check different dates or times?"
        );
    }

    let mut out = if exact_match {
        format!("Great! I found these available times for {service}:\n\n")
    } else {
        format!(
            "I couldn't find exact matches for your preferences, but here are the closest available times for {service}:\n\n"
        )
    };
    for slot in slots {
        let _ = writeln!(out, "{}. {}", slot.index, slot.label);
    }
    out.push_str("\nReply with the number of your preferred time.");
    out
}

/// Context note that pins the LLM to the times actually offered.
pub fn presented_slots_context(slots: &[Slot], service: &str) -> String {
    let mut list = String::new();
    for slot in slots {
        let _ = writeln!(list, "  {}. {}", slot.index, slot.label);
    }
    format!(
        "[SYSTEM] The following REAL appointment times for {service} were already presented to the patient:\n{list}\
         ONLY reference these times. Do NOT invent, guess, or fabricate any other times. \
         If the patient wants different times, offer to check again with different preferences."
    )
}
