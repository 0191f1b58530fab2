// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First turn of a conversation.

use chrono::Utc;
use concierge_core::{
    ConciergeError, Deadline, Message, TimeSelectionResponse, TurnRequest, TurnResponse,
};
use concierge_qualify::{extract_email_from_history, inject_guardrails, should_fetch_availability};
use concierge_transcript::format_intro_message;
use tracing::info;
use uuid::Uuid;

use crate::engine::{
    ConversationEngine, SlotOffer, TurnWrites, replace_last_assistant, without_text,
};
use crate::prompt::{SILENT_START_NOTE, build_system_prompt};

/// `conv_{lead or uuid}_{unix nanos}`.
pub fn new_conversation_id(lead_id: &str) -> String {
    let owner = if lead_id.trim().is_empty() {
        Uuid::new_v4().to_string()
    } else {
        lead_id.trim().to_string()
    };
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("conv_{owner}_{nanos}")
}

impl ConversationEngine {
    /// Opens a conversation from the lead's first message.
    ///
    /// Seeds the transcript with the system prompt, context and a framed
    /// introduction, then replies. Silent starts only seed the transcript
    /// and return an empty message.
    pub async fn start_conversation(
        &self,
        request: TurnRequest,
    ) -> Result<TurnResponse, ConciergeError> {
        let deadline = Deadline::after(request.timeout);
        let conversation_id = match request.conversation_id.trim() {
            "" => new_conversation_id(&request.lead_id),
            id => id.to_string(),
        };

        let screening = match self.screen(&request.intro) {
            Ok(screening) => screening,
            Err(scan) => return Ok(self.refuse_injection(&request, &conversation_id, &scan).await),
        };

        let cfg = self.load_clinic(&request.org_id, &deadline).await?;
        let deposit_cents = cfg
            .as_ref()
            .map(|c| c.deposit_amount_cents)
            .filter(|cents| *cents > 0)
            .unwrap_or(self.settings.deposit.default_amount_cents);
        let structured = cfg.as_ref().is_some_and(|c| c.uses_structured_booking());
        let system_prompt = build_system_prompt(
            request.channel,
            deposit_cents,
            structured,
            self.settings.sms_system_prompt.as_deref(),
            self.settings.voice_system_prompt.as_deref(),
        );

        let mut history = vec![Message::system(system_prompt)];
        let mut writes = TurnWrites::default();
        let now = Utc::now();

        if request.silent {
            self.context
                .inject(&mut history, &without_text(&request), cfg.as_ref(), now, &deadline)
                .await?;
            let ack = request.ack_message.trim();
            if !ack.is_empty() {
                history.push(Message::assistant(ack));
                writes.archive.push(Message::assistant(ack));
            }
            history.push(Message::system(SILENT_START_NOTE));
            if let Some(policy) = &screening.policy {
                writes.audit.push(policy.audit_event(&request, &conversation_id));
            }
            info!(conversation_id = %conversation_id, "silent conversation start");
            writes.transcript = Some(history);
            self.commit(&conversation_id, &request, writes, &deadline).await?;
            return Ok(TurnResponse {
                conversation_id,
                ..Default::default()
            });
        }

        if let Some(policy) = &screening.policy {
            self.context
                .inject(&mut history, &without_text(&request), cfg.as_ref(), now, &deadline)
                .await?;
            let safe = TurnRequest {
                intro: screening.redacted.clone(),
                ..request.clone()
            };
            history.push(Message::user(format_intro_message(&safe, &conversation_id)));
            history.push(Message::assistant(policy.reply()));

            info!(conversation_id = %conversation_id, reason = policy.reason(), "conversation start deflected");
            writes.audit.push(policy.audit_event(&request, &conversation_id));
            writes.archive = vec![
                Message::user(screening.redacted.as_str()),
                Message::assistant(policy.reply()),
            ];
            writes.transcript = Some(history);
            self.count_policy_block(policy.reason()).await;
            self.commit(&conversation_id, &request, writes, &deadline).await?;
            return Ok(TurnResponse {
                conversation_id,
                message: policy.reply().to_string(),
                ..Default::default()
            });
        }

        let framed = TurnRequest {
            intro: screening.text.clone(),
            message: screening.text.clone(),
            ..request.clone()
        };
        self.context
            .inject(&mut history, &framed, cfg.as_ref(), now, &deadline)
            .await?;
        history.push(Message::user(format_intro_message(&framed, &conversation_id)));
        if let Some(cfg) = cfg.as_ref().filter(|c| c.uses_structured_booking()) {
            inject_guardrails(&mut history, cfg);
        }

        let reply = self
            .generate(&history, &request, &conversation_id, &mut writes, &deadline)
            .await?;
        history.push(Message::assistant(&reply));
        let mut message = reply;

        let note = format!("Auto-extracted from conversation at {}", now.to_rfc3339());
        self.stage_preferences(&mut writes, &history, cfg.as_ref(), Some(note));
        writes.email = extract_email_from_history(&history);

        let mut time_selection: Option<TimeSelectionResponse> = None;
        if let Some(cfg) = cfg.as_ref().filter(|c| c.uses_structured_booking())
            && self.slots.can_fetch()
            && should_fetch_availability(&history, cfg)
        {
            match self
                .offer_slots(cfg, &history, "", &request.org_id, &deadline)
                .await?
            {
                SlotOffer::Ask(question) => {
                    replace_last_assistant(&mut history, &question);
                    message = question;
                }
                SlotOffer::Present(presentation) => {
                    writes.time_selection = presentation.write;
                    let response = presentation.response;
                    if !response.sms_message.is_empty() {
                        replace_last_assistant(&mut history, &response.sms_message);
                        message = response.sms_message.clone();
                        time_selection = Some(response);
                    }
                }
                SlotOffer::Unavailable => {}
            }
        }

        info!(
            conversation_id = %conversation_id,
            org_id = %request.org_id,
            slots_offered = time_selection.as_ref().map_or(0, |t| t.slots.len()),
            "conversation started"
        );
        writes.archive = vec![
            Message::user(screening.text.as_str()),
            Message::assistant(message.as_str()),
        ];
        writes.transcript = Some(history);
        self.commit(&conversation_id, &request, writes, &deadline).await?;

        Ok(TurnResponse {
            conversation_id,
            message,
            time_selection,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_the_lead() {
        let id = new_conversation_id("lead_42");
        assert!(id.starts_with("conv_lead_42_"));
        let nanos = id.rsplit('_').next().unwrap();
        assert!(nanos.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn anonymous_ids_use_a_uuid() {
        let id = new_conversation_id("  ");
        let owner = id
            .strip_prefix("conv_")
            .and_then(|rest| rest.rsplit_once('_'))
            .map(|(owner, _)| owner)
            .unwrap();
        assert!(Uuid::parse_str(owner).is_ok());
    }
}
