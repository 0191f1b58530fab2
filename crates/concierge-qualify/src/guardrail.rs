// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directive messages that keep the qualification questions in order.
//!
//! Structured-booking clinics collect name, patient type, schedule, and (when
//! the service has several providers) provider preference before slots are
//! offered. Only the first missing field gets a directive, and none is added
//! when the previous assistant turn already asked that question.

use concierge_core::{ClinicConfig, Message, QualificationSnapshot};

use crate::extract::extract_preferences;
use crate::history::{last_assistant_message, normalize_apostrophes};
use crate::name::assistant_asked_for_name;
use crate::patient::assistant_asked_patient_type;
use crate::provider::assistant_asked_provider;

/// The qualification step a directive asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Name,
    PatientType,
    Schedule,
    Provider,
}

/// First unmet requirement for a patient who has named a service.
pub fn next_requirement(
    snapshot: &QualificationSnapshot,
    cfg: &ClinicConfig,
) -> Option<Requirement> {
    if snapshot.service_interest.is_empty() {
        return None;
    }
    if snapshot.name.is_empty() {
        return Some(Requirement::Name);
    }
    if snapshot.patient_type.is_none() {
        return Some(Requirement::PatientType);
    }
    if !snapshot.has_schedule() {
        return Some(Requirement::Schedule);
    }
    if snapshot.provider_preference.is_empty() {
        let resolved = cfg.resolve_service_name(&snapshot.service_interest);
        if cfg.service_needs_provider_preference(&resolved) {
            return Some(Requirement::Provider);
        }
    }
    None
}

fn already_asked(requirement: Requirement, last_assistant: &str) -> bool {
    match requirement {
        Requirement::Name => assistant_asked_for_name(last_assistant),
        Requirement::PatientType => assistant_asked_patient_type(last_assistant),
        Requirement::Schedule => {
            let m = normalize_apostrophes(last_assistant).to_lowercase();
            (m.contains("day") && m.contains("time")) || m.contains("when works")
        }
        Requirement::Provider => assistant_asked_provider(last_assistant),
    }
}

fn directive_text(requirement: Requirement, snapshot: &QualificationSnapshot, cfg: &ClinicConfig) -> String {
    match requirement {
        Requirement::Name => "[SYSTEM GUARDRAIL] The patient mentioned a service but you do NOT have their name yet. \
             NAME comes first in the booking checklist and MUST be collected before anything else. \
             You MUST ask for their full name NOW. Do NOT ask about patient type, schedule, provider, or email yet. \
             Ask something like: 'Great choice! May I have your full name?'"
            .to_string(),
        Requirement::PatientType => "[SYSTEM GUARDRAIL] You have the patient's name and service interest. \
             Next in the checklist is PATIENT TYPE. \
             You MUST ask if they are a new or returning patient NOW. Do NOT ask about schedule, email, or provider yet. \
             Ask something like: 'Have you visited us before, or would this be your first time?'"
            .to_string(),
        Requirement::Schedule => "[SYSTEM GUARDRAIL] You have the patient's name, service, and patient type. \
             Next in the booking checklist is SCHEDULE. \
             You MUST ask about their preferred days and times NOW. Do NOT ask for email or provider preference yet. \
             Ask something like: 'What days and times work best for you?'"
            .to_string(),
        Requirement::Provider => {
            let names = cfg.provider_names();
            let roster = if names.is_empty() {
                String::new()
            } else {
                format!(" Available providers: {}.", names.join(", "))
            };
            format!(
                "[SYSTEM GUARDRAIL] The patient wants {} which has multiple providers.{roster} \
                 You MUST ask about provider preference NOW. Do NOT ask for email yet. \
                 Ask something like: 'Do you have a provider preference, or would you like the first available appointment?'",
                snapshot.service_interest
            )
        }
    }
}

/// The directive to append before generation, if any.
pub fn guardrail_directive(
    snapshot: &QualificationSnapshot,
    history: &[Message],
    cfg: &ClinicConfig,
) -> Option<Message> {
    if !cfg.uses_structured_booking() {
        return None;
    }
    let requirement = next_requirement(snapshot, cfg)?;
    if last_assistant_message(history).is_some_and(|last| already_asked(requirement, last)) {
        return None;
    }
    Some(Message::system(directive_text(requirement, snapshot, cfg)))
}

/// Extracts preferences and appends the directive to `history` in place.
///
/// Returns the snapshot the directive was based on.
pub fn inject_guardrails(history: &mut Vec<Message>, cfg: &ClinicConfig) -> QualificationSnapshot {
    let (snapshot, _) = extract_preferences(history, &cfg.service_aliases);
    if let Some(directive) = guardrail_directive(&snapshot, history, cfg) {
        history.push(directive);
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use concierge_core::{BookingPlatform, PatientType, ProviderRoster};

    use super::*;

    fn structured() -> ClinicConfig {
        let mut cfg = ClinicConfig::new("org-1", "Glow Med Spa");
        cfg.booking_platform = BookingPlatform::Structured;
        cfg
    }

    fn snapshot(name: &str, patient: Option<PatientType>, days: &str) -> QualificationSnapshot {
        QualificationSnapshot {
            name: name.to_string(),
            service_interest: "Botox".to_string(),
            patient_type: patient,
            preferred_days: days.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn one_directive_in_fixed_order() {
        let cfg = structured();
        let d = guardrail_directive(&snapshot("", None, ""), &[], &cfg).unwrap();
        assert!(d.content.contains("full name"));
        assert!(!d.content.contains("new or returning patient NOW"));

        let d = guardrail_directive(&snapshot("Ann", None, ""), &[], &cfg).unwrap();
        assert!(d.content.contains("PATIENT TYPE"));

        let d = guardrail_directive(&snapshot("Ann", Some(PatientType::New), ""), &[], &cfg).unwrap();
        assert!(d.content.contains("SCHEDULE"));

        assert!(guardrail_directive(&snapshot("Ann", Some(PatientType::New), "monday"), &[], &cfg).is_none());
    }

    #[test]
    fn skips_when_question_was_just_asked() {
        let cfg = structured();
        let history = vec![
            Message::user("botox please"),
            Message::assistant("Great choice! May I have your full name?"),
        ];
        assert!(guardrail_directive(&snapshot("", None, ""), &history, &cfg).is_none());
    }

    #[test]
    fn payment_link_clinics_get_no_directives() {
        let cfg = ClinicConfig::new("org-1", "Glow Med Spa");
        assert!(guardrail_directive(&snapshot("", None, ""), &[], &cfg).is_none());
    }

    #[test]
    fn provider_directive_lists_roster() {
        let mut cfg = structured();
        let mut roster = ProviderRoster::default();
        roster.service_menu_items.insert("botox".to_string(), "item-1".to_string());
        roster.service_provider_count.insert("item-1".to_string(), 2);
        roster.provider_names = BTreeMap::from([
            ("p2".to_string(), "Zoe Hart".to_string()),
            ("p1".to_string(), "Amy Fox".to_string()),
        ]);
        cfg.providers = Some(roster);

        let d = guardrail_directive(&snapshot("Ann", Some(PatientType::New), "monday"), &[], &cfg)
            .unwrap();
        assert!(d.content.contains("Available providers: Amy Fox, Zoe Hart."));
    }

    #[test]
    fn inject_appends_to_history() {
        let cfg = structured();
        let mut history = vec![Message::user("I want botox")];
        let snap = inject_guardrails(&mut history, &cfg);
        assert_eq!(snap.service_interest, "Botox");
        assert_eq!(history.len(), 2);
        assert!(history[1].is_system());
    }
}
