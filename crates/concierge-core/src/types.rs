// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the turn pipeline and its collaborators.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Speaker of a transcript message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single transcript entry. Order within a transcript is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Ordered conversation history.
pub type Transcript = Vec<Message>;

/// Whether the patient has visited the clinic before.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    New,
    Existing,
}

/// Booking facts re-derived from the whole transcript on every turn.
///
/// Empty strings mean "not yet known". The same shape is persisted on the
/// lead record as its scheduling preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service_interest: String,
    #[serde(default)]
    pub patient_type: Option<PatientType>,
    #[serde(default)]
    pub preferred_days: String,
    #[serde(default)]
    pub preferred_times: String,
    #[serde(default)]
    pub provider_preference: String,
    #[serde(default)]
    pub past_services: String,
}

impl QualificationSnapshot {
    pub fn has_schedule(&self) -> bool {
        !self.preferred_days.is_empty() || !self.preferred_times.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// --- LLM ---

/// A completion request to the injected LLM client.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompts: Vec<String>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Token accounting for a single completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A completed LLM response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub stop_reason: Option<String>,
}

// --- Time selection ---

/// A single presented appointment time. `index` is 1-based as shown to the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub index: usize,
    pub date_time: NaiveDateTime,
    pub label: String,
}

/// Parsed day/time window used to query and filter availability.
///
/// Days are numbered from Sunday (0) to Saturday (6). Bounds are exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePreferences {
    #[serde(default)]
    pub days_of_week: Vec<u32>,
    #[serde(default)]
    pub after: Option<NaiveTime>,
    #[serde(default)]
    pub before: Option<NaiveTime>,
    #[serde(default)]
    pub specific_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub raw_text: String,
}

/// Persisted time-selection sub-state for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSelectionState {
    pub presented_slots: Vec<Slot>,
    pub service: String,
    pub booking_url: String,
    pub presented_at: DateTime<Utc>,
    #[serde(default)]
    pub slot_selected: bool,
    #[serde(default)]
    pub selected_slot: Option<Slot>,
    #[serde(default)]
    pub exact_match: bool,
    #[serde(default)]
    pub preferences: TimePreferences,
}

/// Slots presented to the patient on this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSelectionResponse {
    pub slots: Vec<Slot>,
    pub service: String,
    pub exact_match: bool,
    pub sms_message: String,
}

/// Input to the availability fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub org_id: String,
    pub booking_url: String,
    /// Booking-platform canonical service name.
    pub service: String,
    pub provider_preference: String,
    pub patient_type: Option<PatientType>,
    pub preferences: TimePreferences,
}

/// Availability fetcher result. `exact_match` is false when the fetcher fell
/// back to the closest times outside the requested window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    pub slots: Vec<NaiveDateTime>,
    pub exact_match: bool,
    pub message: String,
}

// --- Leads ---

/// The appointment a patient picked, persisted on the lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAppointment {
    pub date_time: NaiveDateTime,
    pub service: String,
}

/// Lead record as seen by the turn pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub org_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub preferences: QualificationSnapshot,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub selected_appointment: Option<SelectedAppointment>,
}

/// Open deposit state reported by the payment checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositStatus {
    Succeeded,
    Pending,
    Other(String),
}

impl DepositStatus {
    pub fn from_status(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "deposit_pending" => Self::Pending,
            other => Self::Other(other.to_string()),
        }
    }
}

// --- Turn outputs ---

/// Instruction to collect a refundable deposit. Never persisted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositIntent {
    pub amount_cents: i64,
    pub description: String,
    #[serde(default)]
    pub success_url: String,
    #[serde(default)]
    pub cancel_url: String,
}

/// Hand-off to the booking platform once a slot and email are both known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub booking_url: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Lowercase 12-hour clock, e.g. `3:30pm`.
    pub time: String,
    pub service: String,
    pub lead_id: String,
    pub org_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub callback_url: String,
}

/// Delivery channel of the conversation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Sms,
    Voice,
}

/// Inbound request for `start_conversation` and `process_message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub lead_id: String,
    #[serde(default)]
    pub clinic_id: String,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    /// First inbound text for `start_conversation`.
    #[serde(default)]
    pub intro: String,
    /// Inbound text for `process_message`.
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Auto-reply already delivered before the pipeline ran.
    #[serde(default)]
    pub ack_message: String,
    /// Seed the transcript without generating a reply.
    #[serde(default)]
    pub silent: bool,
    /// Caller deadline for the whole turn.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl TurnRequest {
    /// Knowledge-base key: the clinic id when present, else the org id.
    pub fn knowledge_key(&self) -> &str {
        if self.clinic_id.is_empty() {
            &self.org_id
        } else {
            &self.clinic_id
        }
    }
}

/// Result of one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub conversation_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_intent: Option<DepositIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_selection: Option<TimeSelectionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_request: Option<BookingRequest>,
}

// --- Observability ---

/// A metric emitted through the injected [`MetricsRecorder`](crate::MetricsRecorder).
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    Counter {
        name: String,
        value: u64,
        labels: Vec<(String, String)>,
    },
    Gauge {
        name: String,
        value: f64,
        labels: Vec<(String, String)>,
    },
    Histogram {
        name: String,
        value: f64,
        labels: Vec<(String, String)>,
    },
}

fn owned_labels(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl MetricEvent {
    pub fn counter(name: &str, value: u64, labels: &[(&str, &str)]) -> Self {
        Self::Counter {
            name: name.to_string(),
            value,
            labels: owned_labels(labels),
        }
    }

    pub fn histogram(name: &str, value: f64, labels: &[(&str, &str)]) -> Self {
        Self::Histogram {
            name: name.to_string(),
            value,
            labels: owned_labels(labels),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Counter { name, .. } | Self::Gauge { name, .. } | Self::Histogram { name, .. } => {
                name
            }
        }
    }

    /// Value of a label, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        let labels = match self {
            Self::Counter { labels, .. }
            | Self::Gauge { labels, .. }
            | Self::Histogram { labels, .. } => labels,
        };
        labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Audit trail categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AuditKind {
    #[strum(serialize = "security.prompt_injection")]
    #[serde(rename = "security.prompt_injection")]
    PromptInjection,
    #[strum(serialize = "compliance.phi_detected")]
    #[serde(rename = "compliance.phi_detected")]
    PhiDetected,
    #[strum(serialize = "compliance.medical_advice_refused")]
    #[serde(rename = "compliance.medical_advice_refused")]
    MedicalAdviceRefused,
    #[strum(serialize = "compliance.response_modified")]
    #[serde(rename = "compliance.response_modified")]
    ResponseModified,
}

/// A single audit log entry. Never carries raw patient text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub conversation_id: String,
    pub org_id: String,
    pub lead_id: String,
    pub details: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, request: &TurnRequest, conversation_id: &str) -> Self {
        Self {
            kind,
            conversation_id: conversation_id.to_string(),
            org_id: request.org_id.clone(),
            lead_id: request.lead_id.clone(),
            details: BTreeMap::new(),
            at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}
