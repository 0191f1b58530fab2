// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whether enough is known to fetch live availability.

use std::str::FromStr;

use concierge_core::{ClinicConfig, Message, PatientType, QualificationSnapshot, Role};
use tracing::debug;

use crate::extract::extract_preferences;
use crate::history::collect_user_messages;

/// First line of the injected lead-preferences context message.
pub const LEAD_CONTEXT_HEADER: &str = "Known scheduling preferences from earlier messages:\n";

/// Renders saved lead preferences as a context block, `None` when empty.
pub fn format_lead_context(prefs: &QualificationSnapshot) -> Option<String> {
    let mut lines = Vec::with_capacity(6);
    let name = prefs.name.trim();
    if !name.is_empty() && name.chars().any(char::is_alphabetic) {
        let label = if name.split_whitespace().count() == 1 {
            "Name (first only)"
        } else {
            "Name"
        };
        lines.push(format!("- {label}: {name}"));
    }
    let fields = [
        ("Service", prefs.service_interest.trim().to_string()),
        (
            "Patient type",
            prefs.patient_type.map(|p| p.to_string()).unwrap_or_default(),
        ),
        ("Preferred days", prefs.preferred_days.trim().to_string()),
        ("Preferred times", prefs.preferred_times.trim().to_string()),
        ("Provider preference", prefs.provider_preference.trim().to_string()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            lines.push(format!("- {label}: {value}"));
        }
    }
    if lines.is_empty() {
        return None;
    }
    Some(format!("{LEAD_CONTEXT_HEADER}{}", lines.join("\n")))
}

/// Fills empty fields from injected lead-preference context messages.
///
/// Early user turns may have been trimmed away; the saved preferences are
/// re-injected as system context each turn.
pub fn merge_lead_context(prefs: &mut QualificationSnapshot, history: &[Message]) {
    for msg in history.iter().filter(|m| m.role == Role::System) {
        if !msg.content.contains("scheduling preferences")
            && !msg.content.contains("patient preferences")
        {
            continue;
        }
        for line in msg.content.lines() {
            let Some(rest) = line.trim().strip_prefix("- ") else {
                continue;
            };
            let Some((key, value)) = rest.split_once(": ") else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.trim().to_lowercase().as_str() {
                "name" | "name (first only)" => &mut prefs.name,
                "service" => &mut prefs.service_interest,
                "preferred days" => &mut prefs.preferred_days,
                "preferred times" => &mut prefs.preferred_times,
                "provider preference" => &mut prefs.provider_preference,
                "patient type" => {
                    if prefs.patient_type.is_none() {
                        prefs.patient_type = PatientType::from_str(&value.to_lowercase()).ok();
                    }
                    continue;
                }
                _ => continue,
            };
            if slot.is_empty() {
                *slot = value.to_string();
            }
        }
    }
}

/// Roster provider whose first name (three letters or more) the patient used.
fn match_roster_provider(history: &[Message], cfg: &ClinicConfig) -> Option<String> {
    let (lower, _) = collect_user_messages(history);
    cfg.provider_names().into_iter().find(|full| {
        full.split_whitespace()
            .next()
            .map(str::to_lowercase)
            .is_some_and(|first| first.chars().count() >= 3 && lower.contains(&first))
    })
}

/// Name, service, patient type, and a day or time are all known, plus a
/// provider when the service needs one and has no delivery variants.
pub fn should_fetch_availability(history: &[Message], cfg: &ClinicConfig) -> bool {
    let (mut prefs, _) = extract_preferences(history, &cfg.service_aliases);
    merge_lead_context(&mut prefs, history);

    debug!(
        has_name = !prefs.name.is_empty(),
        service = %prefs.service_interest,
        patient_type = ?prefs.patient_type,
        days = %prefs.preferred_days,
        times = %prefs.preferred_times,
        provider = %prefs.provider_preference,
        "availability readiness check"
    );

    if prefs.name.is_empty()
        || prefs.service_interest.is_empty()
        || prefs.patient_type.is_none()
        || !prefs.has_schedule()
    {
        return false;
    }

    if prefs.provider_preference.is_empty()
        && let Some(provider) = match_roster_provider(history, cfg)
    {
        prefs.provider_preference = provider;
    }

    if prefs.provider_preference.is_empty()
        && cfg.service_variants(&prefs.service_interest).is_empty()
        && cfg.service_needs_provider_preference(&prefs.service_interest)
    {
        debug!(service = %prefs.service_interest, "provider preference required");
        return false;
    }
    true
}
