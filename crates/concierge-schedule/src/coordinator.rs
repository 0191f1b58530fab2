// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persisted time-selection state machine.
//!
//! `NoState -> SlotsPresented -> SlotSelected`, with `SlotsPresented`
//! re-entered when the patient asks for other times. The coordinator never
//! writes during a turn: every transition returns a [`StateWrite`] that the
//! caller applies with [`TimeSelectionCoordinator::apply`] once the reply is
//! final.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use concierge_core::{
    AvailabilityFetcher, AvailabilityQuery, ClinicConfig, ConciergeError, Deadline, HistoryStore,
    Message, QualificationSnapshot, Slot, TimeSelectionResponse, TimeSelectionState, with_budget,
    within_deadline,
};
use concierge_qualify::detect_service_key;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::format::{build_slots, format_slots_for_sms, presented_slots_context, spread_slots_across_days};
use crate::preferences::extract_time_preferences;
use crate::refine::{build_refined_preferences, filter_out_previous_slots, is_more_times_request};
use crate::selection::detect_time_selection;

static BOOKING_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:i\s+(?:also\s+)?want|(?:also|can\s+i)\s+(?:book|get|schedule)|book\s+(?:me\s+)?(?:for\s+)?|i.+?too$)")
        .unwrap()
});

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    /// Per-fetch budget. Scraping fallbacks can take most of it.
    pub fetch_timeout: Duration,
    pub max_presented_slots: usize,
    pub max_slots_per_day: usize,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(120),
            max_presented_slots: 6,
            max_slots_per_day: 2,
        }
    }
}

/// Pending change to the persisted time-selection record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateWrite {
    Save(TimeSelectionState),
    Clear,
}

/// What a message did while slots were on the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotsTurn {
    /// The patient picked a slot.
    Selected {
        slot: Slot,
        service: String,
        /// Tells the LLM to confirm the pick.
        context: Message,
        write: StateWrite,
    },
    /// Fresh times after a "show me more" request.
    Refreshed {
        response: TimeSelectionResponse,
        write: Option<StateWrite>,
    },
    /// A re-fetch was asked for but nothing can fetch; the state is dropped
    /// so the regular availability path runs again.
    Reset { write: StateWrite },
    /// No selection. Pins the presented times into context.
    Pending { context: Message },
}

/// Slots fetched for a qualified patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub response: TimeSelectionResponse,
    /// `None` when nothing was found, so the next turn fetches again.
    pub write: Option<StateWrite>,
}

/// Whether the patient moved on to a different service after already
/// picking a slot.
///
/// Either the message names a configured service that resolves differently
/// from the booked one, or it states booking intent ("I also want",
/// "book me for") without mentioning the booked service.
pub fn detect_service_switch(state: &TimeSelectionState, message: &str, cfg: &ClinicConfig) -> bool {
    if !state.slot_selected {
        return false;
    }
    let booked = state.service.trim().to_lowercase();
    let lower = message.to_lowercase();

    if let Some(named) = detect_service_key(message, cfg) {
        let named = cfg.resolve_service_name(&named).to_lowercase();
        let booked_resolved = cfg.resolve_service_name(&booked).to_lowercase();
        if named != booked_resolved {
            return true;
        }
    }
    BOOKING_INTENT.is_match(&lower) && !lower.contains(&booked)
}

pub struct TimeSelectionCoordinator {
    history: Arc<dyn HistoryStore>,
    fetcher: Option<Arc<dyn AvailabilityFetcher>>,
    settings: ScheduleSettings,
}

impl TimeSelectionCoordinator {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        fetcher: Option<Arc<dyn AvailabilityFetcher>>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            history,
            fetcher,
            settings,
        }
    }

    pub fn can_fetch(&self) -> bool {
        self.fetcher.is_some()
    }

    /// Loads the record. Store failures are logged and read as "no state";
    /// only an expired deadline propagates.
    pub async fn load(
        &self,
        conversation_id: &str,
        deadline: &Deadline,
    ) -> Result<Option<TimeSelectionState>, ConciergeError> {
        match within_deadline(deadline, self.history.load_time_selection(conversation_id)).await {
            Ok(state) => {
                debug!(
                    conversation_id,
                    exists = state.is_some(),
                    slots = state.as_ref().map_or(0, |s| s.presented_slots.len()),
                    slot_selected = state.as_ref().is_some_and(|s| s.slot_selected),
                    "time selection state loaded"
                );
                Ok(state)
            }
            Err(e @ ConciergeError::Timeout { .. }) if deadline.expired() => Err(e),
            Err(e) => {
                warn!(conversation_id, error = %e, "failed to load time selection state");
                Ok(None)
            }
        }
    }

    /// Applies a staged write.
    pub async fn apply(
        &self,
        conversation_id: &str,
        write: &StateWrite,
        deadline: &Deadline,
    ) -> Result<(), ConciergeError> {
        match write {
            StateWrite::Save(state) => {
                within_deadline(deadline, self.history.save_time_selection(conversation_id, state))
                    .await
            }
            StateWrite::Clear => {
                within_deadline(deadline, self.history.clear_time_selection(conversation_id)).await
            }
        }
    }

    /// Handles a message while `state` has presented slots.
    pub async fn on_message(
        &self,
        state: &TimeSelectionState,
        message: &str,
        snapshot: &QualificationSnapshot,
        cfg: &ClinicConfig,
        org_id: &str,
        deadline: &Deadline,
    ) -> Result<SlotsTurn, ConciergeError> {
        let prefs = extract_time_preferences(&format!(
            "{} {}",
            snapshot.preferred_days, snapshot.preferred_times
        ));

        if let Some(slot) = detect_time_selection(message, &state.presented_slots, &prefs) {
            info!(
                slot_index = slot.index,
                time = %slot.date_time,
                service = %state.service,
                "time slot selected"
            );
            let context = Message::system(format!(
                "[SYSTEM] The patient selected time slot #{}: {} for {}. Confirm their selection and proceed with booking.",
                slot.index, slot.label, state.service
            ));
            let selected = TimeSelectionState {
                presented_slots: Vec::new(),
                slot_selected: true,
                selected_slot: Some(slot.clone()),
                ..state.clone()
            };
            return Ok(SlotsTurn::Selected {
                slot: slot.clone(),
                service: state.service.clone(),
                context,
                write: StateWrite::Save(selected),
            });
        }

        if is_more_times_request(&message.to_lowercase()) {
            info!(service = %state.service, "patient requesting more times");
            let today = cfg.local_time(Utc::now()).date();
            return self
                .refetch(state, message, snapshot, cfg, org_id, today, deadline)
                .await;
        }

        Ok(SlotsTurn::Pending {
            context: Message::system(presented_slots_context(&state.presented_slots, &state.service)),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn refetch(
        &self,
        state: &TimeSelectionState,
        message: &str,
        snapshot: &QualificationSnapshot,
        cfg: &ClinicConfig,
        org_id: &str,
        today: NaiveDate,
        deadline: &Deadline,
    ) -> Result<SlotsTurn, ConciergeError> {
        let Some(fetcher) = &self.fetcher else {
            return Ok(SlotsTurn::Reset {
                write: StateWrite::Clear,
            });
        };

        let refined = build_refined_preferences(message, snapshot, &state.presented_slots, today);
        debug!(
            refined_after = ?refined.after,
            refined_before = ?refined.before,
            refined_days = ?refined.days_of_week,
            excluded = state.presented_slots.len(),
            "re-fetching availability with refined preferences"
        );
        let query = AvailabilityQuery {
            org_id: org_id.to_string(),
            booking_url: state.booking_url.clone(),
            service: cfg.resolve_service_name(&state.service),
            provider_preference: snapshot.provider_preference.clone(),
            patient_type: snapshot.patient_type,
            preferences: refined.clone(),
        };
        let budget = deadline.budget(self.settings.fetch_timeout);
        let result = with_budget(budget, fetcher.fetch(query)).await?;

        let fresh = filter_out_previous_slots(result.slots, &state.presented_slots);
        let fresh = spread_slots_across_days(
            fresh,
            self.settings.max_presented_slots,
            self.settings.max_slots_per_day,
        );
        if fresh.is_empty() {
            return Ok(SlotsTurn::Refreshed {
                response: TimeSelectionResponse {
                    slots: Vec::new(),
                    service: state.service.clone(),
                    exact_match: false,
                    sms_message: format!(
                        "Those are the latest available times on those days for {}. Would you like to try different days, or would one of the times I showed work for you?",
                        state.service
                    ),
                },
                write: None,
            });
        }

        let slots = build_slots(&fresh);
        let next = TimeSelectionState {
            presented_slots: slots.clone(),
            service: state.service.clone(),
            booking_url: state.booking_url.clone(),
            presented_at: Utc::now(),
            slot_selected: false,
            selected_slot: None,
            exact_match: true,
            preferences: refined,
        };
        Ok(SlotsTurn::Refreshed {
            response: TimeSelectionResponse {
                sms_message: format_slots_for_sms(&slots, &state.service, true),
                slots,
                service: state.service.clone(),
                exact_match: true,
            },
            write: Some(StateWrite::Save(next)),
        })
    }

    /// Fetches and formats availability for `service`. Returns `None` when
    /// no fetcher is configured or the clinic has no booking URL.
    ///
    /// Fetch failures propagate as upstream errors.
    pub async fn present(
        &self,
        service: &str,
        snapshot: &QualificationSnapshot,
        cfg: &ClinicConfig,
        org_id: &str,
        deadline: &Deadline,
    ) -> Result<Option<Presentation>, ConciergeError> {
        let Some(fetcher) = &self.fetcher else {
            return Ok(None);
        };
        if cfg.booking_url.is_empty() {
            return Ok(None);
        }

        let preferences = extract_time_preferences(&format!(
            "{} {}",
            snapshot.preferred_days, snapshot.preferred_times
        ));
        let platform_service = cfg.resolve_service_name(service);
        info!(
            original_service = service,
            resolved_service = %platform_service,
            preferred_days = %snapshot.preferred_days,
            preferred_times = %snapshot.preferred_times,
            "fetching available times"
        );
        let query = AvailabilityQuery {
            org_id: org_id.to_string(),
            booking_url: cfg.booking_url.clone(),
            service: platform_service,
            provider_preference: snapshot.provider_preference.clone(),
            patient_type: snapshot.patient_type,
            preferences: preferences.clone(),
        };
        let budget = deadline.budget(self.settings.fetch_timeout);
        let result = with_budget(budget, fetcher.fetch(query)).await?;

        let times = spread_slots_across_days(
            result.slots,
            self.settings.max_presented_slots,
            self.settings.max_slots_per_day,
        );
        if times.is_empty() {
            let sms_message = if result.message.trim().is_empty() {
                format_slots_for_sms(&[], service, false)
            } else {
                result.message
            };
            return Ok(Some(Presentation {
                response: TimeSelectionResponse {
                    slots: Vec::new(),
                    service: service.to_string(),
                    exact_match: false,
                    sms_message,
                },
                write: None,
            }));
        }

        let slots = build_slots(&times);
        let state = TimeSelectionState {
            presented_slots: slots.clone(),
            service: service.to_string(),
            booking_url: cfg.booking_url.clone(),
            presented_at: Utc::now(),
            slot_selected: false,
            selected_slot: None,
            exact_match: result.exact_match,
            preferences,
        };
        Ok(Some(Presentation {
            response: TimeSelectionResponse {
                sms_message: format_slots_for_sms(&slots, service, result.exact_match),
                slots,
                service: service.to_string(),
                exact_match: result.exact_match,
            },
            write: Some(StateWrite::Save(state)),
        }))
    }
}
