// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up turns of an existing conversation.

use chrono::Utc;
use concierge_core::{
    ClinicConfig, ConciergeError, Deadline, Message, SelectedAppointment, TimeSelectionResponse,
    TurnRequest, TurnResponse,
};
use concierge_deposit::reconcile;
use concierge_guard::REDACTED;
use concierge_qualify::{
    extract_email_from_history, extract_preferences, inject_guardrails, should_fetch_availability,
};
use concierge_schedule::{SlotsTurn, StateWrite, detect_service_switch};
use tracing::{debug, info};

use crate::booking::{ChosenSlot, Handoff, email_request_reply, prepare_handoff};
use crate::engine::{
    ConversationEngine, SlotOffer, TurnWrites, replace_last_assistant, tagged_notes, without_text,
};
use crate::shortcuts::match_shortcut;

impl ConversationEngine {
    /// Handles one inbound message.
    ///
    /// Unknown conversations are opened with the message as the intro.
    /// Writes happen once, after the reply is final; a failure before that
    /// leaves the stored transcript untouched.
    pub async fn process_message(
        &self,
        request: TurnRequest,
    ) -> Result<TurnResponse, ConciergeError> {
        let conversation_id = request.conversation_id.trim().to_string();
        if conversation_id.is_empty() {
            return Err(ConciergeError::Validation(
                "conversation_id is required".to_string(),
            ));
        }
        let deadline = Deadline::after(request.timeout);

        let screening = match self.screen(&request.message) {
            Ok(screening) => screening,
            Err(scan) => return Ok(self.refuse_injection(&request, &conversation_id, &scan).await),
        };

        let mut history = match self.transcripts.load(&conversation_id, &deadline).await {
            Ok(history) => history,
            Err(ConciergeError::UnknownConversation(_)) => {
                info!(conversation_id = %conversation_id, "unknown conversation, starting it");
                return self
                    .start_conversation(TurnRequest {
                        conversation_id,
                        intro: request.message.clone(),
                        ..request
                    })
                    .await;
            }
            Err(e) => return Err(e),
        };

        let cfg = self.load_clinic(&request.org_id, &deadline).await?;
        let now = Utc::now();
        let mut writes = TurnWrites::default();

        if let Some(policy) = &screening.policy {
            self.context
                .inject(&mut history, &without_text(&request), cfg.as_ref(), now, &deadline)
                .await?;
            history.push(Message::user(REDACTED));
            history.push(Message::assistant(policy.reply()));

            info!(conversation_id = %conversation_id, reason = policy.reason(), "message deflected");
            writes.audit.push(policy.audit_event(&request, &conversation_id));
            writes.archive = vec![Message::user(REDACTED), Message::assistant(policy.reply())];
            writes.transcript = Some(history);
            self.count_policy_block(policy.reason()).await;
            self.commit(&conversation_id, &request, writes, &deadline).await?;
            return Ok(TurnResponse {
                conversation_id,
                message: policy.reply().to_string(),
                ..Default::default()
            });
        }

        let text = screening.text;
        let turn = TurnRequest {
            message: text.clone(),
            ..request.clone()
        };
        let injected = self
            .context
            .inject(&mut history, &turn, cfg.as_ref(), now, &deadline)
            .await?;
        history.push(Message::user(text.as_str()));

        let shortcut = match match_shortcut(&text, cfg.as_ref()) {
            Some(shortcut) => Some(shortcut),
            None => self.faq.answer(&text, &deadline).await?,
        };
        if let Some(shortcut) = shortcut {
            info!(conversation_id = %conversation_id, note = ?shortcut.note, "answered with shortcut");
            history.push(Message::assistant(shortcut.reply.as_str()));
            let notes = shortcut
                .note
                .and_then(|note| tagged_notes(injected.lead.as_ref(), note));
            self.stage_preferences(&mut writes, &history, cfg.as_ref(), notes);
            writes.archive = vec![
                Message::user(text.as_str()),
                Message::assistant(shortcut.reply.as_str()),
            ];
            writes.transcript = Some(history);
            self.commit(&conversation_id, &request, writes, &deadline).await?;
            return Ok(TurnResponse {
                conversation_id,
                message: shortcut.reply,
                ..Default::default()
            });
        }

        // Slot handling needs clinic rules; an unknown clinic still gets the
        // default ones so stored selections keep working.
        let clinic = cfg
            .clone()
            .unwrap_or_else(|| ClinicConfig::new(request.org_id.as_str(), ""));
        let mut state = self.slots.load(&conversation_id, &deadline).await?;
        let mut selected: Option<ChosenSlot> = None;
        let mut time_selection: Option<TimeSelectionResponse> = None;

        if let Some(current) = &state
            && detect_service_switch(current, &text, &clinic)
        {
            info!(
                conversation_id = %conversation_id,
                previous_service = %current.service,
                "service switch after selection, clearing time selection"
            );
            writes.time_selection = Some(StateWrite::Clear);
            writes.appointment = Some(None);
            state = None;
        }

        if let Some(current) = state.clone().filter(|s| !s.presented_slots.is_empty()) {
            let (snapshot, _) = extract_preferences(&history, &clinic.service_aliases);
            match self
                .slots
                .on_message(&current, &text, &snapshot, &clinic, &request.org_id, &deadline)
                .await?
            {
                SlotsTurn::Selected {
                    slot,
                    service,
                    context,
                    write,
                } => {
                    history.push(context);
                    if let StateWrite::Save(next) = &write {
                        state = Some(next.clone());
                    }
                    writes.time_selection = Some(write);
                    writes.appointment = Some(Some(SelectedAppointment {
                        date_time: slot.date_time,
                        service: service.clone(),
                    }));
                    selected = Some(ChosenSlot {
                        at: slot.date_time,
                        service,
                    });
                }
                SlotsTurn::Refreshed { response, write } => {
                    if write.is_some() {
                        writes.time_selection = write;
                    }
                    time_selection = Some(response);
                }
                SlotsTurn::Reset { write } => {
                    writes.time_selection = Some(write);
                    state = None;
                }
                SlotsTurn::Pending { context } => history.push(context),
            }
        }

        if let Some(cfg) = cfg.as_ref().filter(|c| c.uses_structured_booking()) {
            inject_guardrails(&mut history, cfg);
        }
        let reply = self
            .generate(&history, &request, &conversation_id, &mut writes, &deadline)
            .await?;
        history.push(Message::assistant(reply.as_str()));
        let mut message = reply;

        let (snapshot, _) = extract_preferences(&history, &clinic.service_aliases);
        let slot_selected = state.as_ref().is_some_and(|s| s.slot_selected);
        let decided = self.deposit.decide(&history, &deadline).await?;
        let mut deposit_intent = reconcile(
            decided,
            cfg.as_ref(),
            &snapshot.service_interest,
            slot_selected,
        );

        self.stage_preferences(&mut writes, &history, cfg.as_ref(), None);
        writes.email = extract_email_from_history(&history);

        if let Some(cfg) = &cfg
            && self.slots.can_fetch()
            && state.is_none()
            && time_selection.is_none()
            && (cfg.uses_structured_booking() || deposit_intent.is_some())
            && should_fetch_availability(&history, cfg)
        {
            match self
                .offer_slots(cfg, &history, &text, &request.org_id, &deadline)
                .await?
            {
                SlotOffer::Ask(question) => {
                    replace_last_assistant(&mut history, &question);
                    writes.archive = vec![
                        Message::user(text.as_str()),
                        Message::assistant(question.as_str()),
                    ];
                    writes.transcript = Some(history);
                    self.commit(&conversation_id, &request, writes, &deadline).await?;
                    return Ok(TurnResponse {
                        conversation_id,
                        message: question,
                        ..Default::default()
                    });
                }
                SlotOffer::Present(presentation) => {
                    if presentation.write.is_some() {
                        writes.time_selection = presentation.write;
                    }
                    if !presentation.response.slots.is_empty() {
                        debug!("slots presented, deposit deferred");
                        deposit_intent = None;
                    }
                    time_selection = Some(presentation.response);
                }
                SlotOffer::Unavailable => {}
            }
        }

        if let Some(response) = &time_selection
            && !response.sms_message.is_empty()
        {
            replace_last_assistant(&mut history, &response.sms_message);
            message = response.sms_message.clone();
        }

        let mut booking_request = None;
        if let Some(cfg) = cfg.as_ref().filter(|c| c.uses_structured_booking()) {
            deposit_intent = None;

            let earlier = || {
                let state = state.as_ref().filter(|s| s.slot_selected)?;
                injected
                    .lead
                    .as_ref()
                    .and_then(|lead| lead.selected_appointment.as_ref())
                    .map(|a| ChosenSlot {
                        at: a.date_time,
                        service: a.service.clone(),
                    })
                    .or_else(|| {
                        state.selected_slot.as_ref().map(|slot| ChosenSlot {
                            at: slot.date_time,
                            service: state.service.clone(),
                        })
                    })
            };
            let selected_now = selected.is_some();
            if !cfg.booking_url.is_empty()
                && let Some(chosen) = selected.or_else(earlier)
            {
                match prepare_handoff(
                    &chosen,
                    &cfg.booking_url,
                    &request,
                    injected.lead.as_ref(),
                    &history,
                    &self.settings.booking_api_base_url,
                ) {
                    Handoff::Book(booking) => {
                        info!(
                            conversation_id = %conversation_id,
                            service = %booking.service,
                            date = %booking.date,
                            time = %booking.time,
                            "booking hand-off ready"
                        );
                        booking_request = Some(booking);
                    }
                    Handoff::NeedEmail if selected_now => {
                        message = email_request_reply(chosen.at, &chosen.service);
                        replace_last_assistant(&mut history, &message);
                    }
                    Handoff::NeedEmail => {
                        debug!("slot selected earlier, still waiting for an email");
                    }
                }
            }
        }

        writes.archive = vec![
            Message::user(text.as_str()),
            Message::assistant(message.as_str()),
        ];
        writes.transcript = Some(history);
        self.commit(&conversation_id, &request, writes, &deadline).await?;

        info!(
            conversation_id = %conversation_id,
            deposit = deposit_intent.is_some(),
            slots_offered = time_selection.as_ref().map_or(0, |t| t.slots.len()),
            booking = booking_request.is_some(),
            "turn complete"
        );
        Ok(TurnResponse {
            conversation_id,
            message,
            deposit_intent,
            time_selection,
            booking_request,
        })
    }
}
