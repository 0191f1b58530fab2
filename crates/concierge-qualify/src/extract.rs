// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use concierge_core::{Message, PatientType, QualificationSnapshot, Role};

use crate::history::{collect_user_messages, normalize_apostrophes};
use crate::name::extract_name;
use crate::patient::extract_patient_type;
use crate::provider::extract_provider_preference;
use crate::schedule::{extract_days, extract_times, flexible_schedule_reply};
use crate::service::{extract_past_services, match_service, sorted_aliases};

/// Re-derives the qualification snapshot from the whole transcript.
///
/// The result depends only on `history` and `aliases`, so running it twice
/// on the same input yields the same snapshot. The flag reports whether any
/// field was found.
pub fn extract_preferences(
    history: &[Message],
    aliases: &BTreeMap<String, String>,
) -> (QualificationSnapshot, bool) {
    let (lower, original) = collect_user_messages(history);
    let lower = normalize_apostrophes(&lower);

    let mut snapshot = QualificationSnapshot {
        name: extract_name(history, &original),
        patient_type: extract_patient_type(history, &lower),
        ..Default::default()
    };

    let aliases = sorted_aliases(aliases);
    snapshot.service_interest = match_service(&lower, &aliases)
        .or_else(|| {
            let mut all = lower.clone();
            for msg in history.iter().filter(|m| m.role == Role::Assistant) {
                all.push_str(&msg.content.to_lowercase());
                all.push(' ');
            }
            match_service(&all, &aliases)
        })
        .unwrap_or_default();

    if snapshot.patient_type == Some(PatientType::Existing)
        || ["before", "previously", "last time"]
            .iter()
            .any(|cue| lower.contains(cue))
    {
        snapshot.past_services = extract_past_services(&lower);
    }

    snapshot.preferred_days = extract_days(&lower);
    snapshot.preferred_times = extract_times(&lower);
    if !snapshot.has_schedule() && flexible_schedule_reply(history) {
        snapshot.preferred_days = "any".to_string();
        snapshot.preferred_times = "flexible".to_string();
    }

    snapshot.provider_preference = extract_provider_preference(history, &lower);

    let found = !snapshot.is_empty();
    (snapshot, found)
}
