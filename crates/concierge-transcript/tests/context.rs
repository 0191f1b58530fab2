// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context injection against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use concierge_core::{
    ClinicConfig, Deadline, DepositStatus, Lead, Message, QualificationSnapshot, TurnRequest,
};
use concierge_test_utils::{
    InMemoryLeads, StaticAvailability, StaticKnowledge, StaticPayment, TEST_LEAD, TEST_ORG,
    TEST_PHONE,
};
use concierge_transcript::{ContextInjector, ContextSettings, ContextSources};

fn request(message: &str) -> TurnRequest {
    TurnRequest {
        conversation_id: "conv_ctx".to_string(),
        org_id: TEST_ORG.to_string(),
        lead_id: TEST_LEAD.to_string(),
        from: TEST_PHONE.to_string(),
        message: message.to_string(),
        ..Default::default()
    }
}

fn lead(name: &str, service: &str) -> Lead {
    Lead {
        id: TEST_LEAD.to_string(),
        org_id: TEST_ORG.to_string(),
        name: name.to_string(),
        phone: TEST_PHONE.to_string(),
        preferences: QualificationSnapshot {
            service_interest: service.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn leads_with(lead: Lead) -> Arc<InMemoryLeads> {
    let leads = Arc::new(InMemoryLeads::new());
    leads.insert(lead);
    leads
}

fn system_contents(history: &[Message]) -> Vec<&str> {
    history
        .iter()
        .filter(|m| m.is_system())
        .map(|m| m.content.as_str())
        .collect()
}

// ---- Ordering ----

#[tokio::test]
async fn context_messages_follow_the_fixed_order() {
    let injector = ContextInjector::new(
        ContextSources {
            payment: Some(Arc::new(StaticPayment::new(Some(DepositStatus::Pending)))),
            leads: Some(leads_with(lead("Maya Chen", "Botox"))),
            knowledge: Some(Arc::new(StaticKnowledge::new(&[
                "Botox results last three to four months.",
            ]))),
            availability: None,
        },
        ContextSettings::default(),
    );
    let cfg = ClinicConfig::new(TEST_ORG, "Glow Med Spa");
    let mut history = vec![Message::system("prompt")];

    let injected = injector
        .inject(
            &mut history,
            &request("how long does botox last"),
            Some(&cfg),
            Utc::now(),
            &Deadline::unbounded(),
        )
        .await
        .unwrap();

    assert!(injected.payment_notice);
    assert_eq!(injected.lead.as_ref().map(|l| l.name.as_str()), Some("Maya Chen"));

    let system = system_contents(&history);
    assert_eq!(system.len(), 6, "prompt plus five context messages: {system:#?}");
    assert_eq!(system[0], "prompt");
    assert!(system[1].contains("still pending"));
    assert!(system[2].contains("- Name: Maya Chen"));
    assert!(system[2].contains("- Service: Botox"));
    assert!(system[4].contains("exactly $50"));
    assert!(system[5].starts_with("Relevant clinic context:"));
    assert!(system[5].contains("three to four months"));
}

#[tokio::test]
async fn agreement_notice_replaces_a_missing_payment_notice() {
    let injector = ContextInjector::new(ContextSources::default(), ContextSettings::default());
    let mut history = vec![
        Message::system("prompt"),
        Message::assistant("Would you like to secure your spot with a refundable deposit?"),
        Message::user("yes please"),
    ];

    let injected = injector
        .inject(&mut history, &request("what happens next"), None, Utc::now(), &Deadline::unbounded())
        .await
        .unwrap();

    assert!(!injected.payment_notice);
    let last = history.last().unwrap();
    assert!(last.is_system());
    assert!(last.content.contains("already agreed to the deposit"));
}

// ---- Lead record ----

#[tokio::test]
async fn phone_shaped_lead_names_are_not_used() {
    let injector = ContextInjector::new(
        ContextSources {
            leads: Some(leads_with(lead(TEST_PHONE, ""))),
            ..Default::default()
        },
        ContextSettings::default(),
    );
    let mut history = Vec::new();

    let injected = injector
        .inject(&mut history, &request("hi"), None, Utc::now(), &Deadline::unbounded())
        .await
        .unwrap();

    assert!(injected.lead.is_some());
    assert!(history.is_empty(), "no lead context expected: {history:#?}");
}

#[tokio::test]
async fn missing_lead_ids_skip_lead_lookups() {
    let injector = ContextInjector::new(
        ContextSources {
            payment: Some(Arc::new(StaticPayment::new(Some(DepositStatus::Succeeded)))),
            leads: Some(leads_with(lead("Maya Chen", "Botox"))),
            ..Default::default()
        },
        ContextSettings::default(),
    );
    let mut history = Vec::new();
    let anonymous = TurnRequest {
        lead_id: String::new(),
        ..request("hello")
    };

    let injected = injector
        .inject(&mut history, &anonymous, None, Utc::now(), &Deadline::unbounded())
        .await
        .unwrap();

    assert!(injected.lead.is_none());
    assert!(!injected.payment_notice);
    assert!(history.is_empty());
}

// ---- Availability ----

#[tokio::test]
async fn booking_intent_adds_live_availability() {
    let slot = NaiveDate::from_ymd_opt(2027, 3, 1)
        .and_then(|d| d.and_hms_opt(15, 0, 0))
        .unwrap();
    let availability = Arc::new(StaticAvailability::new().with_slots(vec![slot]));
    let injector = ContextInjector::new(
        ContextSources {
            availability: Some(availability.clone()),
            ..Default::default()
        },
        ContextSettings::default(),
    );
    let mut cfg = ClinicConfig::new(TEST_ORG, "Glow Med Spa");
    cfg.booking_url = "https://book.example.com/glow".to_string();
    let mut history = Vec::new();

    injector
        .inject(
            &mut history,
            &request("can I book an appointment next week?"),
            Some(&cfg),
            Utc.with_ymd_and_hms(2027, 2, 20, 18, 0, 0).unwrap(),
            &Deadline::unbounded(),
        )
        .await
        .unwrap();

    let last = history.last().unwrap();
    assert!(last.content.starts_with("Real-time appointment availability"));
    assert!(last.content.contains("1. Monday, Mar 1 at 3:00 PM"));
    assert_eq!(availability.queries().len(), 1);
}

#[tokio::test]
async fn failing_availability_is_skipped() {
    let injector = ContextInjector::new(
        ContextSources {
            availability: Some(Arc::new(StaticAvailability::new().failing("scraper down"))),
            ..Default::default()
        },
        ContextSettings::default(),
    );
    let mut cfg = ClinicConfig::new(TEST_ORG, "Glow Med Spa");
    cfg.booking_url = "https://book.example.com/glow".to_string();
    let mut history = Vec::new();

    injector
        .inject(
            &mut history,
            &request("I want to book"),
            Some(&cfg),
            Utc::now(),
            &Deadline::after(Some(Duration::from_secs(5))),
        )
        .await
        .unwrap();

    assert!(
        history
            .iter()
            .all(|m| !m.content.starts_with("Real-time appointment availability"))
    );
}
