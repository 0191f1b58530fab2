// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking hand-off for structured-booking clinics.

use chrono::NaiveDateTime;
use concierge_core::{BookingRequest, Lead, Message, TurnRequest};
use concierge_qualify::extract_email_from_history;
use concierge_schedule::long_label;

/// Splits a full name into first name and the rest.
pub fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Lowercase 12-hour clock, e.g. `3:30pm`.
pub fn booking_time(at: NaiveDateTime) -> String {
    at.format("%-I:%M%P").to_string()
}

pub fn callback_url(api_base_url: &str, org_id: &str, from: &str) -> String {
    if api_base_url.trim().is_empty() {
        return String::new();
    }
    format!(
        "{}/webhooks/booking/callback?orgId={org_id}&from={from}",
        api_base_url.trim_end_matches('/')
    )
}

/// Reply used when a slot was picked but no email is known yet.
pub fn email_request_reply(at: NaiveDateTime, service: &str) -> String {
    format!(
        "Great choice! I've got {} for {service}. To complete your booking, I just need your email address. What's the best email for you?",
        long_label(at)
    )
}

/// Outcome of the hand-off check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    Book(BookingRequest),
    /// Ask for an email before booking.
    NeedEmail,
}

/// The chosen appointment plus where it came from.
#[derive(Debug, Clone)]
pub struct ChosenSlot {
    pub at: NaiveDateTime,
    pub service: String,
}

/// Builds the booking request, or reports that the email is still missing.
///
/// Name and phone come from the lead, the phone falling back to the sender.
/// The email comes from the lead, then from any user turn.
pub fn prepare_handoff(
    chosen: &ChosenSlot,
    booking_url: &str,
    request: &TurnRequest,
    lead: Option<&Lead>,
    history: &[Message],
    api_base_url: &str,
) -> Handoff {
    let (first_name, last_name) = split_name(lead.map_or("", |l| l.name.as_str()));
    let phone = lead
        .map(|l| l.phone.clone())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| request.from.clone());
    let email = lead
        .map(|l| l.email.clone())
        .filter(|e| !e.is_empty())
        .or_else(|| extract_email_from_history(history));

    let Some(email) = email else {
        return Handoff::NeedEmail;
    };
    Handoff::Book(BookingRequest {
        booking_url: booking_url.to_string(),
        date: chosen.at.format("%Y-%m-%d").to_string(),
        time: booking_time(chosen.at),
        service: chosen.service.clone(),
        lead_id: request.lead_id.clone(),
        org_id: request.org_id.clone(),
        first_name,
        last_name,
        phone,
        email,
        callback_url: callback_url(api_base_url, &request.org_id, &request.from),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn request() -> TurnRequest {
        TurnRequest {
            org_id: "org_1".into(),
            lead_id: "lead_1".into(),
            from: "+15550001111".into(),
            ..Default::default()
        }
    }

    fn chosen() -> ChosenSlot {
        ChosenSlot {
            at: at(15, 30),
            service: "Botox".into(),
        }
    }

    #[test]
    fn names_split_on_first_space() {
        assert_eq!(split_name("Andy Wolf"), ("Andy".into(), "Wolf".into()));
        assert_eq!(split_name("Mary Jo  Smith"), ("Mary".into(), "Jo Smith".into()));
        assert_eq!(split_name("Madonna"), ("Madonna".into(), String::new()));
        assert_eq!(split_name("  "), (String::new(), String::new()));
    }

    #[test]
    fn times_are_lowercase_twelve_hour() {
        assert_eq!(booking_time(at(15, 30)), "3:30pm");
        assert_eq!(booking_time(at(9, 5)), "9:05am");
    }

    #[test]
    fn callback_trims_trailing_slash() {
        assert_eq!(
            callback_url("https://api.example.com/", "org_1", "+1555"),
            "https://api.example.com/webhooks/booking/callback?orgId=org_1&from=+1555"
        );
        assert_eq!(callback_url("", "org_1", "+1555"), "");
    }

    #[test]
    fn missing_email_blocks_booking() {
        let handoff = prepare_handoff(
            &chosen(),
            "https://book.example.com",
            &request(),
            None,
            &[Message::user("the 3:30 works")],
            "",
        );
        assert_eq!(handoff, Handoff::NeedEmail);
    }

    #[test]
    fn lead_fields_fill_the_request() {
        let lead = Lead {
            id: "lead_1".into(),
            org_id: "org_1".into(),
            name: "Jane Doe".into(),
            ..Default::default()
        };
        let history = vec![Message::user("it's jane@example.com")];
        let Handoff::Book(booking) = prepare_handoff(
            &chosen(),
            "https://book.example.com",
            &request(),
            Some(&lead),
            &history,
            "https://api.example.com",
        ) else {
            panic!("expected a booking request");
        };
        assert_eq!(booking.date, "2026-03-02");
        assert_eq!(booking.time, "3:30pm");
        assert_eq!(booking.first_name, "Jane");
        assert_eq!(booking.last_name, "Doe");
        assert_eq!(booking.phone, "+15550001111");
        assert_eq!(booking.email, "jane@example.com");
        assert_eq!(booking.service, "Botox");
    }

    #[test]
    fn email_request_names_the_slot() {
        assert_eq!(
            email_request_reply(at(15, 30), "Botox"),
            "Great choice! I've got Monday, March 2 at 3:30 PM for Botox. To complete your booking, I just need your email address. What's the best email for you?"
        );
    }
}
