// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn context messages appended ahead of generation.
//!
//! Blocks are appended in a fixed order: payment status, deposit agreement,
//! known lead preferences, business hours with the exact deposit, knowledge
//! snippets, then live availability. A failing collaborator skips its block
//! with a warning. Only an expired turn deadline aborts the stage.

use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use concierge_core::{
    AvailabilityFetcher, AvailabilityQuery, ClinicConfig, ConciergeError, Deadline,
    DepositStatus, KnowledgeRetriever, Lead, LeadsRepository, Message, PaymentStatusChecker,
    TurnRequest, with_budget, within_deadline,
};
use concierge_deposit::conversation_has_deposit_agreement;
use concierge_qualify::format_lead_context;
use tracing::warn;

const BOOKING_KEYWORDS: &[&str] = &[
    "book",
    "appointment",
    "schedule",
    "available",
    "availability",
    "when can",
    "open slot",
    "time slot",
];

const PAID_NOTICE: &str = "IMPORTANT: This patient has ALREADY PAID their deposit. The platform already sent a payment confirmation SMS automatically when the payment succeeded. Do NOT offer another deposit. Do NOT restart intake or offer to schedule a consultation again. Do NOT repeat the payment confirmation message. Answer their questions normally and defer personalized/medical advice to the practitioner during their consultation. If they ask about next steps: \"Our team will call you within 24 hours to confirm a specific date and time that works for you.\"";

const PENDING_NOTICE: &str = "IMPORTANT: This patient was already sent a deposit payment link and it is still pending. Do NOT offer another deposit or claim the deposit is already received. Do NOT restart intake or offer to schedule a consultation again. Answer their questions normally and defer personalized/medical advice to the practitioner during their consultation. If they ask about payment, tell them to use the deposit link they received.";

const OPEN_DEPOSIT_NOTICE: &str = "IMPORTANT: This patient has an existing deposit in progress. Do NOT offer another deposit. Do NOT restart intake or offer to schedule a consultation again. Answer their questions normally and defer personalized/medical advice to the practitioner during their consultation.";

const AGREED_NOTICE: &str = "IMPORTANT: This patient already agreed to the deposit and is in the booking flow. Do NOT restart intake or offer to schedule a consultation again. Answer their questions normally and defer personalized/medical advice to the practitioner during their consultation.";

/// Whether a message suggests the patient wants to book.
pub fn contains_booking_intent(message: &str) -> bool {
    let lower = message.to_lowercase();
    BOOKING_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// System note for the lead's open deposit.
pub fn payment_notice(status: &DepositStatus) -> &'static str {
    match status {
        DepositStatus::Succeeded => PAID_NOTICE,
        DepositStatus::Pending => PENDING_NOTICE,
        DepositStatus::Other(_) => OPEN_DEPOSIT_NOTICE,
    }
}

/// States the exact deposit so the model never quotes a range.
pub fn deposit_amount_notice(amount_cents: i64) -> String {
    let dollars = amount_cents / 100;
    format!(
        "DEPOSIT AMOUNT: This clinic's deposit is exactly ${dollars}. NEVER say a range like '$50-100'. Always state the exact amount: ${dollars}."
    )
}

/// Numbered upcoming times, e.g. `1. Monday, Jan 15 at 2:00 PM`.
pub fn format_availability_for_llm(slots: &[NaiveDateTime], max_slots: usize) -> String {
    if slots.is_empty() {
        return "No available appointments found for the requested timeframe.".to_string();
    }
    let max_slots = if max_slots == 0 { 5 } else { max_slots };
    let mut out = String::from("Available appointments:\n");
    for (i, at) in slots.iter().take(max_slots).enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, at.format("%A, %b %-d at %-I:%M %p"));
    }
    out
}

fn knowledge_block(snippets: &[String]) -> String {
    let mut out = String::from("Relevant clinic context:\n");
    for (i, snippet) in snippets.iter().enumerate() {
        let _ = writeln!(out, "{}. {snippet}", i + 1);
    }
    out
}

/// Optional collaborators consulted while building context.
#[derive(Clone, Default)]
pub struct ContextSources {
    pub payment: Option<Arc<dyn PaymentStatusChecker>>,
    pub leads: Option<Arc<dyn LeadsRepository>>,
    pub knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    pub availability: Option<Arc<dyn AvailabilityFetcher>>,
}

#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub knowledge_top_k: usize,
    pub availability_slots: usize,
    pub availability_timeout: Duration,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            knowledge_top_k: 3,
            availability_slots: 5,
            availability_timeout: Duration::from_secs(120),
        }
    }
}

/// What the context stage learned besides the messages it appended.
#[derive(Debug, Clone, Default)]
pub struct InjectedContext {
    /// The lead record, when one was found.
    pub lead: Option<Lead>,
    /// Whether a payment-status notice was appended.
    pub payment_notice: bool,
}

pub struct ContextInjector {
    sources: ContextSources,
    settings: ContextSettings,
}

impl ContextInjector {
    pub fn new(sources: ContextSources, settings: ContextSettings) -> Self {
        Self { sources, settings }
    }

    /// Appends this turn's context messages to `history`.
    pub async fn inject(
        &self,
        history: &mut Vec<Message>,
        request: &TurnRequest,
        clinic: Option<&ClinicConfig>,
        now: DateTime<Utc>,
        deadline: &Deadline,
    ) -> Result<InjectedContext, ConciergeError> {
        let mut injected = InjectedContext::default();
        let has_lead = !request.org_id.is_empty() && !request.lead_id.is_empty();

        if has_lead
            && let Some(payment) = &self.sources.payment
            && let Some(Some(status)) = soft(
                deadline,
                "failed to check payment status",
                payment.open_deposit_status(&request.org_id, &request.lead_id),
            )
            .await?
        {
            history.push(Message::system(payment_notice(&status)));
            injected.payment_notice = true;
        }

        if !injected.payment_notice && conversation_has_deposit_agreement(history) {
            history.push(Message::system(AGREED_NOTICE));
        }

        if has_lead
            && let Some(leads) = &self.sources.leads
            && let Some(Some(lead)) = soft(
                deadline,
                "failed to fetch lead preferences",
                leads.get(&request.org_id, &request.lead_id),
            )
            .await?
        {
            let mut prefs = lead.preferences.clone();
            if prefs.name.is_empty() && !looks_like_phone(&lead.name, &lead.phone) {
                prefs.name = lead.name.clone();
            }
            if let Some(content) = format_lead_context(&prefs) {
                history.push(Message::system(content));
            }
            injected.lead = Some(lead);
        }

        if let Some(cfg) = clinic {
            history.push(Message::system(cfg.business_hours_context(now)));
            history.push(Message::system(deposit_amount_notice(cfg.default_deposit_cents())));
        }

        if let Some(knowledge) = &self.sources.knowledge
            && !request.message.trim().is_empty()
            && let Some(snippets) = soft(
                deadline,
                "failed to retrieve knowledge context",
                knowledge.query(
                    request.knowledge_key(),
                    &request.message,
                    self.settings.knowledge_top_k,
                ),
            )
            .await?
            && !snippets.is_empty()
        {
            history.push(Message::system(knowledge_block(&snippets)));
        }

        if let Some(fetcher) = &self.sources.availability
            && let Some(cfg) = clinic
            && !cfg.booking_url.is_empty()
            && contains_booking_intent(&request.message)
        {
            let query = AvailabilityQuery {
                org_id: request.org_id.clone(),
                booking_url: cfg.booking_url.clone(),
                ..Default::default()
            };
            let budget = deadline.budget(self.settings.availability_timeout);
            if let Some(found) = soft(
                deadline,
                "failed to fetch availability context",
                with_budget(budget, fetcher.fetch(query)),
            )
            .await?
                && !found.slots.is_empty()
            {
                history.push(Message::system(format!(
                    "Real-time appointment availability from booking page:\n{}",
                    format_availability_for_llm(&found.slots, self.settings.availability_slots)
                )));
            }
        }

        Ok(injected)
    }
}

/// Digit-heavy lead names are phone numbers copied in by intake forms.
fn looks_like_phone(name: &str, phone: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    if !phone.trim().is_empty() && name == phone.trim() {
        return true;
    }
    name.chars().filter(char::is_ascii_digit).count() >= 7
}

/// Runs a context lookup. Failures warn and yield `None` unless the turn
/// deadline has passed.
async fn soft<T, F>(deadline: &Deadline, what: &str, fut: F) -> Result<Option<T>, ConciergeError>
where
    F: Future<Output = Result<T, ConciergeError>>,
{
    match within_deadline(deadline, fut).await {
        Ok(value) => Ok(Some(value)),
        Err(e @ ConciergeError::Timeout { .. }) if deadline.expired() => Err(e),
        Err(e) => {
            warn!(error = %e, "{what}");
            Ok(None)
        }
    }
}
