// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation engine and the pieces both entry points share: input
//! screening, reply generation, slot offers, and the staged end-of-turn writes.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use concierge_core::{
    AuditEvent, AuditKind, AuditLog, AvailabilityFetcher, ClinicConfig, ClinicConfigProvider,
    ConciergeError, ConversationArchive, Deadline, HistoryStore, KnowledgeRetriever, Lead,
    LeadsRepository, LlmClient, Message, MeteredLlm, MetricEvent, MetricsRecorder,
    PaymentStatusChecker, QualificationSnapshot, SelectedAppointment, TurnRequest, TurnResponse,
    within_deadline,
};
use concierge_deposit::DepositEngine;
use concierge_guard::{
    BLOCKED_REPLY, GuardAction, GuardScanResult, InboundGuard, MEDICAL_ADVICE_DEFLECTION_REPLY,
    PHI_DEFLECTION_REPLY, REDACTED, detect_medical_advice, redact_phi, sanitize_for_llm,
    scan_outbound,
};
use concierge_qualify::{extract_preferences, merge_lead_context};
use concierge_schedule::{Presentation, StateWrite, TimeSelectionCoordinator};
use concierge_transcript::{
    ArchiveWriter, ContextInjector, ContextSources, TranscriptManager, sanitize_sms,
};
use concierge_variant::{VariantResolution, VariantResolver, recent_user_messages};
use tracing::{debug, info, warn};

use crate::faq::FaqResponder;
use crate::settings::EngineSettings;
use crate::shortcuts::append_lead_note;

/// Counter of turns answered with a canned policy reply, labelled by `reason`.
pub const POLICY_BLOCK_TOTAL: &str = "concierge_policy_block_total";

/// Everything the engine talks to. Only the LLM, the transcript store and
/// the metrics sink are required.
#[derive(Clone)]
pub struct Collaborators {
    pub llm: Arc<dyn LlmClient>,
    pub history: Arc<dyn HistoryStore>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub clinics: Option<Arc<dyn ClinicConfigProvider>>,
    pub leads: Option<Arc<dyn LeadsRepository>>,
    pub payment: Option<Arc<dyn PaymentStatusChecker>>,
    pub knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    pub availability: Option<Arc<dyn AvailabilityFetcher>>,
    pub audit: Option<Arc<dyn AuditLog>>,
    pub archive: Option<Arc<dyn ConversationArchive>>,
}

impl Collaborators {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        history: Arc<dyn HistoryStore>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            llm,
            history,
            metrics,
            clinics: None,
            leads: None,
            payment: None,
            knowledge: None,
            availability: None,
            audit: None,
            archive: None,
        }
    }

    pub fn with_clinics(mut self, clinics: Arc<dyn ClinicConfigProvider>) -> Self {
        self.clinics = Some(clinics);
        self
    }

    pub fn with_leads(mut self, leads: Arc<dyn LeadsRepository>) -> Self {
        self.leads = Some(leads);
        self
    }

    pub fn with_payment(mut self, payment: Arc<dyn PaymentStatusChecker>) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeRetriever>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_availability(mut self, availability: Arc<dyn AvailabilityFetcher>) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn ConversationArchive>) -> Self {
        self.archive = Some(archive);
        self
    }
}

/// Runs conversation turns: guard, context, generation, deposit, slots,
/// hand-off, then one batch of writes.
///
/// Turns for the same conversation must not overlap; callers serialize on
/// the conversation id.
pub struct ConversationEngine {
    pub(crate) llm: MeteredLlm,
    pub(crate) transcripts: TranscriptManager,
    pub(crate) context: ContextInjector,
    pub(crate) guard: InboundGuard,
    pub(crate) deposit: DepositEngine,
    pub(crate) variants: VariantResolver,
    pub(crate) faq: FaqResponder,
    pub(crate) slots: TimeSelectionCoordinator,
    pub(crate) clinics: Option<Arc<dyn ClinicConfigProvider>>,
    pub(crate) leads: Option<Arc<dyn LeadsRepository>>,
    pub(crate) audit: Option<Arc<dyn AuditLog>>,
    pub(crate) archive: Option<ArchiveWriter>,
    pub(crate) settings: EngineSettings,
}

impl ConversationEngine {
    pub fn new(collaborators: Collaborators, settings: EngineSettings) -> Self {
        let llm = MeteredLlm::new(collaborators.llm, collaborators.metrics);
        let context = ContextInjector::new(
            ContextSources {
                payment: collaborators.payment,
                leads: collaborators.leads.clone(),
                knowledge: collaborators.knowledge,
                availability: collaborators.availability.clone(),
            },
            settings.context.clone(),
        );
        Self {
            transcripts: TranscriptManager::new(collaborators.history.clone(), settings.max_history),
            context,
            guard: InboundGuard::with_thresholds(settings.block_threshold, settings.warn_threshold),
            deposit: DepositEngine::new(llm.clone(), settings.deposit.clone()),
            variants: VariantResolver::new(Some(llm.clone()), settings.variant.clone()),
            faq: FaqResponder::new(llm.clone(), settings.faq.clone()),
            slots: TimeSelectionCoordinator::new(
                collaborators.history,
                collaborators.availability,
                settings.schedule.clone(),
            ),
            clinics: collaborators.clinics,
            leads: collaborators.leads,
            audit: collaborators.audit,
            archive: collaborators.archive.map(ArchiveWriter::new),
            llm,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The stored transcript, untrimmed.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Message>, ConciergeError> {
        self.transcripts.load(conversation_id, &Deadline::unbounded()).await
    }

    /// Screens inbound text. `Err` carries the scan of a blocked message.
    pub(crate) fn screen(&self, text: &str) -> Result<Screening, GuardScanResult> {
        let (redacted, phi) = redact_phi(text);
        let medical = if phi { Vec::new() } else { detect_medical_advice(text) };

        let scan = self.guard.scan(text);
        if scan.blocked {
            return Err(scan);
        }
        let forwarded = if scan.action == GuardAction::Sanitize {
            warn!(score = scan.score, reasons = ?scan.reasons, "suspicious inbound message sanitized");
            sanitize_for_llm(text)
        } else {
            text.to_string()
        };

        let policy = if phi {
            Some(Policy::Phi)
        } else if !medical.is_empty() {
            Some(Policy::MedicalAdvice(medical))
        } else {
            None
        };
        let redacted = match policy {
            Some(Policy::MedicalAdvice(_)) => REDACTED.to_string(),
            _ => redacted,
        };
        Ok(Screening {
            text: forwarded,
            redacted,
            policy,
        })
    }

    /// Short-circuits a turn whose inbound text scored over the block threshold.
    pub(crate) async fn refuse_injection(
        &self,
        request: &TurnRequest,
        conversation_id: &str,
        scan: &GuardScanResult,
    ) -> TurnResponse {
        warn!(
            conversation_id,
            score = scan.score,
            reasons = ?scan.reasons,
            "prompt injection blocked"
        );
        let event = AuditEvent::new(AuditKind::PromptInjection, request, conversation_id)
            .with_detail("score", format!("{:.2}", scan.score))
            .with_detail("reasons", join_reasons(scan));
        self.record_audit(event).await;
        self.count_policy_block("injection").await;
        TurnResponse {
            conversation_id: conversation_id.to_string(),
            message: BLOCKED_REPLY.to_string(),
            ..Default::default()
        }
    }

    pub(crate) async fn count_policy_block(&self, reason: &str) {
        self.llm
            .emit(MetricEvent::counter(POLICY_BLOCK_TOTAL, 1, &[("reason", reason)]))
            .await;
    }

    /// Clinic config for the org. Lookup failures read as "not configured".
    pub(crate) async fn load_clinic(
        &self,
        org_id: &str,
        deadline: &Deadline,
    ) -> Result<Option<ClinicConfig>, ConciergeError> {
        let Some(clinics) = &self.clinics else {
            return Ok(None);
        };
        if org_id.is_empty() {
            return Ok(None);
        }
        match within_deadline(deadline, clinics.get(org_id)).await {
            Ok(cfg) => Ok(cfg),
            Err(e @ ConciergeError::Timeout { .. }) if deadline.expired() => Err(e),
            Err(e) => {
                warn!(org_id, error = %e, "failed to load clinic config");
                Ok(None)
            }
        }
    }

    /// Calls the reply model and runs the draft through the outbound guard.
    pub(crate) async fn generate(
        &self,
        history: &[Message],
        request: &TurnRequest,
        conversation_id: &str,
        writes: &mut TurnWrites,
        deadline: &Deadline,
    ) -> Result<String, ConciergeError> {
        let llm_request = self.transcripts.reply_request(
            history,
            &self.settings.model,
            self.settings.reply_max_tokens,
            self.settings.reply_temperature,
        );
        let response = self
            .llm
            .complete(llm_request, deadline.budget(self.settings.reply_timeout))
            .await?;
        let draft = sanitize_sms(&response.text);
        if draft.is_empty() {
            return Err(ConciergeError::upstream("reply model returned an empty message"));
        }

        let verdict = scan_outbound(&draft);
        let emptied = verdict.sanitized.trim().is_empty();
        if verdict.blocked() || emptied {
            warn!(
                conversation_id,
                score = verdict.scan.score,
                reasons = ?verdict.scan.reasons,
                emptied,
                "outbound reply blocked"
            );
            writes.audit.push(
                AuditEvent::new(AuditKind::ResponseModified, request, conversation_id)
                    .with_detail("action", "blocked")
                    .with_detail("reasons", join_reasons(&verdict.scan)),
            );
            self.count_policy_block("outbound").await;
            return Ok(BLOCKED_REPLY.to_string());
        }
        if verdict.modified() {
            info!(conversation_id, reasons = ?verdict.scan.reasons, "outbound reply sanitized");
            writes.audit.push(
                AuditEvent::new(AuditKind::ResponseModified, request, conversation_id)
                    .with_detail("action", "sanitized")
                    .with_detail("reasons", join_reasons(&verdict.scan)),
            );
        }
        Ok(verdict.sanitized)
    }

    /// Resolves the service variant and provider, then fetches slots.
    pub(crate) async fn offer_slots(
        &self,
        cfg: &ClinicConfig,
        history: &[Message],
        current_message: &str,
        org_id: &str,
        deadline: &Deadline,
    ) -> Result<SlotOffer, ConciergeError> {
        let (mut snapshot, _) = extract_preferences(history, &cfg.service_aliases);
        merge_lead_context(&mut snapshot, history);

        let recent = recent_user_messages(history, current_message, self.settings.variant_lookback);
        let service = match self
            .variants
            .resolve(cfg, &snapshot.service_interest, &recent, deadline)
            .await?
        {
            VariantResolution::Resolved(service) => service,
            VariantResolution::Clarify(question) => {
                info!(service = %snapshot.service_interest, "asking patient to pick a service variant");
                return Ok(SlotOffer::Ask(question));
            }
        };

        if snapshot.provider_preference.trim().is_empty()
            && cfg.service_needs_provider_preference(&service)
        {
            info!(service = %service, "asking for provider preference");
            return Ok(SlotOffer::Ask(provider_question(&service, &cfg.provider_names())));
        }

        match self.slots.present(&service, &snapshot, cfg, org_id, deadline).await? {
            Some(presentation) => Ok(SlotOffer::Present(presentation)),
            None => Ok(SlotOffer::Unavailable),
        }
    }

    /// Stages extracted preferences for the lead. `notes` replaces the
    /// lead's notes when set.
    pub(crate) fn stage_preferences(
        &self,
        writes: &mut TurnWrites,
        history: &[Message],
        cfg: Option<&ClinicConfig>,
        notes: Option<String>,
    ) {
        let empty = BTreeMap::new();
        let aliases = cfg.map_or(&empty, |c| &c.service_aliases);
        let (snapshot, found) = extract_preferences(history, aliases);
        if found || notes.is_some() {
            writes.preferences = Some((snapshot, notes));
        } else {
            debug!("no preferences to persist");
        }
    }

    /// Applies the staged writes. A failed transcript save fails the turn;
    /// every later write only warns.
    pub(crate) async fn commit(
        &self,
        conversation_id: &str,
        request: &TurnRequest,
        writes: TurnWrites,
        deadline: &Deadline,
    ) -> Result<(), ConciergeError> {
        if let Some(transcript) = &writes.transcript {
            self.transcripts
                .save(conversation_id, transcript, deadline)
                .await?;
        }

        if let Some(write) = &writes.time_selection {
            best_effort(
                deadline,
                "failed to persist time selection state",
                self.slots.apply(conversation_id, write, deadline),
            )
            .await;
        }

        let has_lead = !request.org_id.is_empty() && !request.lead_id.is_empty();
        if has_lead && let Some(leads) = &self.leads {
            let (org, lead) = (request.org_id.as_str(), request.lead_id.as_str());
            if let Some((snapshot, notes)) = &writes.preferences {
                best_effort(
                    deadline,
                    "failed to save lead preferences",
                    leads.update_preferences(org, lead, snapshot, notes.as_deref()),
                )
                .await;
            }
            if let Some(email) = &writes.email {
                best_effort(
                    deadline,
                    "failed to save lead email",
                    leads.update_email(org, lead, email),
                )
                .await;
            }
            if let Some(appointment) = &writes.appointment {
                best_effort(
                    deadline,
                    "failed to save selected appointment",
                    leads.set_selected_appointment(org, lead, appointment.clone()),
                )
                .await;
            }
        }

        for event in writes.audit {
            self.record_audit(event).await;
        }

        if let Some(archive) = &self.archive
            && !writes.archive.is_empty()
        {
            best_effort(
                deadline,
                "failed to archive conversation messages",
                archive.append(conversation_id, &request.org_id, &writes.archive),
            )
            .await;
        }
        Ok(())
    }

    pub(crate) async fn record_audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        let kind = event.kind;
        if let Err(e) = audit.append(event).await {
            warn!(kind = %kind, error = %e, "failed to write audit event");
        }
    }
}

/// Why a turn got a canned compliance reply instead of a generated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Policy {
    Phi,
    MedicalAdvice(Vec<String>),
}

impl Policy {
    pub(crate) fn reply(&self) -> &'static str {
        match self {
            Self::Phi => PHI_DEFLECTION_REPLY,
            Self::MedicalAdvice(_) => MEDICAL_ADVICE_DEFLECTION_REPLY,
        }
    }

    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::Phi => "phi",
            Self::MedicalAdvice(_) => "medical_advice",
        }
    }

    pub(crate) fn audit_event(&self, request: &TurnRequest, conversation_id: &str) -> AuditEvent {
        match self {
            Self::Phi => AuditEvent::new(AuditKind::PhiDetected, request, conversation_id)
                .with_detail("action", "redacted"),
            Self::MedicalAdvice(keywords) => {
                AuditEvent::new(AuditKind::MedicalAdviceRefused, request, conversation_id)
                    .with_detail("keywords", keywords.join(","))
            }
        }
    }
}

/// Inbound text after the guard passed it.
#[derive(Debug, Clone)]
pub(crate) struct Screening {
    /// What may be forwarded to the model, sanitized when it looked suspicious.
    pub text: String,
    /// What may be stored when a policy applies.
    pub redacted: String,
    pub policy: Option<Policy>,
}

/// Result of trying to put appointment times in front of the patient.
#[derive(Debug)]
pub(crate) enum SlotOffer {
    /// A question that must be answered first: variant or provider.
    Ask(String),
    Present(Presentation),
    /// No fetcher or no booking URL.
    Unavailable,
}

/// Writes collected during a turn, applied by [`ConversationEngine::commit`].
#[derive(Debug, Default)]
pub(crate) struct TurnWrites {
    pub transcript: Option<Vec<Message>>,
    pub time_selection: Option<StateWrite>,
    /// Snapshot plus replacement notes.
    pub preferences: Option<(QualificationSnapshot, Option<String>)>,
    pub email: Option<String>,
    /// `Some(None)` clears the lead's appointment.
    pub appointment: Option<Option<SelectedAppointment>>,
    pub audit: Vec<AuditEvent>,
    pub archive: Vec<Message>,
}

/// Question sent before fetching slots for a provider-specific service.
pub fn provider_question(service: &str, providers: &[String]) -> String {
    let roster = if providers.is_empty() {
        String::new()
    } else {
        format!(" We have {}.", providers.join(" and "))
    };
    format!(
        "Great choice - {service}!{roster} Do you have a provider preference, or would you like the first available appointment?"
    )
}

/// Replaces the newest assistant message, or appends one.
pub(crate) fn replace_last_assistant(history: &mut Vec<Message>, content: &str) {
    match history.iter_mut().rev().find(|m| m.is_assistant()) {
        Some(last) => last.content = content.to_string(),
        None => history.push(Message::assistant(content)),
    }
}

/// The lead's notes with `note` appended. `None` when the lead is unknown.
pub(crate) fn tagged_notes(lead: Option<&Lead>, note: &str) -> Option<String> {
    lead.map(|lead| append_lead_note(&lead.notes, note))
}

/// Copy of `request` with no message text, for context lookups that must
/// not see the patient's words.
pub(crate) fn without_text(request: &TurnRequest) -> TurnRequest {
    TurnRequest {
        message: String::new(),
        ..request.clone()
    }
}

fn join_reasons(scan: &GuardScanResult) -> String {
    scan.reasons.iter().cloned().collect::<Vec<_>>().join(",")
}

async fn best_effort<F>(deadline: &Deadline, what: &str, fut: F)
where
    F: Future<Output = Result<(), ConciergeError>>,
{
    if let Err(e) = within_deadline(deadline, fut).await {
        warn!(error = %e, "{what}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_question_lists_roster() {
        assert_eq!(
            provider_question("Botox", &["Dr. Lee".into(), "Sam".into()]),
            "Great choice - Botox! We have Dr. Lee and Sam. Do you have a provider preference, or would you like the first available appointment?"
        );
        assert_eq!(
            provider_question("Botox", &[]),
            "Great choice - Botox! Do you have a provider preference, or would you like the first available appointment?"
        );
    }

    #[test]
    fn replaces_newest_assistant_turn() {
        let mut history = vec![
            Message::assistant("first"),
            Message::user("hi"),
            Message::assistant("second"),
            Message::system("note"),
        ];
        replace_last_assistant(&mut history, "swapped");
        assert_eq!(history[0].content, "first");
        assert_eq!(history[2].content, "swapped");

        let mut empty = vec![Message::user("hi")];
        replace_last_assistant(&mut empty, "added");
        assert_eq!(empty.last().map(|m| m.content.as_str()), Some("added"));
    }

    #[test]
    fn policies_map_to_replies_and_reasons() {
        let request = TurnRequest::default();
        let medical = Policy::MedicalAdvice(vec!["dosage".into(), "pregnant".into()]);
        assert_eq!(medical.reply(), MEDICAL_ADVICE_DEFLECTION_REPLY);
        assert_eq!(medical.reason(), "medical_advice");
        let event = medical.audit_event(&request, "conv_1");
        assert_eq!(event.kind, AuditKind::MedicalAdviceRefused);
        assert_eq!(event.details["keywords"], "dosage,pregnant");
        assert_eq!(Policy::Phi.reply(), PHI_DEFLECTION_REPLY);
        assert_eq!(Policy::Phi.audit_event(&request, "c").kind, AuditKind::PhiDetected);
    }
}
