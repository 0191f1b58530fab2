// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Concierge conversation-turn pipeline.
//!
//! This crate provides the shared data model, error type, clinic
//! configuration, and the capability traits every collaborator of the
//! pipeline implements (LLM, history store, leads, availability, ...).

pub mod call;
pub mod clinic;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use call::{Deadline, MeteredLlm, with_budget, within_deadline};
pub use clinic::{BookingPlatform, BusinessHours, ClinicConfig, DayHours, ProviderRoster};
pub use error::ConciergeError;
pub use types::{
    AuditEvent, AuditKind, Availability, AvailabilityQuery, BookingRequest, Channel,
    DepositIntent, DepositStatus, Lead, LlmRequest, LlmResponse, Message, MetricEvent,
    PatientType, QualificationSnapshot, Role, SelectedAppointment, Slot, TimePreferences,
    TimeSelectionResponse, TimeSelectionState, TokenUsage, Transcript, TurnRequest,
    TurnResponse,
};

pub use traits::{
    AuditLog, AvailabilityFetcher, ClinicConfigProvider, ConversationArchive, HistoryStore,
    KnowledgeRetriever, KnowledgeSource, LeadsRepository, LlmClient, MetricsRecorder,
    PaymentStatusChecker,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concierge_error_has_all_variants() {
        let _validation = ConciergeError::Validation("conversation id required".into());
        let _upstream = ConciergeError::Upstream {
            message: "test".into(),
            source: Some(Box::new(std::io::Error::other("reset"))),
        };
        let _timeout = ConciergeError::Timeout {
            duration: std::time::Duration::from_secs(60),
        };
        let _unknown = ConciergeError::UnknownConversation("conv_1".into());
        let _storage = ConciergeError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _config = ConciergeError::Config("test".into());
        let _parse = ConciergeError::Parse {
            message: "test".into(),
        };
        let _conflict = ConciergeError::Conflict("test".into());
        let _internal = ConciergeError::Internal("test".into());
    }

    #[test]
    fn upstream_classification() {
        assert!(ConciergeError::upstream("llm returned empty response").is_upstream());
        assert!(
            ConciergeError::Timeout {
                duration: std::time::Duration::from_secs(1)
            }
            .is_upstream()
        );
        assert!(!ConciergeError::Validation("x".into()).is_upstream());
        assert!(!ConciergeError::storage(std::io::Error::other("x")).is_upstream());
    }

    #[test]
    fn role_display_and_parse_round_trip() {
        use std::str::FromStr;

        for role in [Role::System, Role::User, Role::Assistant] {
            let s = role.to_string();
            assert_eq!(Role::from_str(&s).unwrap(), role);
        }
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn audit_kind_uses_dotted_names() {
        assert_eq!(
            AuditKind::MedicalAdviceRefused.to_string(),
            "compliance.medical_advice_refused"
        );
        let json = serde_json::to_string(&AuditKind::PromptInjection).unwrap();
        assert_eq!(json, "\"security.prompt_injection\"");
    }

    #[test]
    fn message_serializes_lowercase_role() {
        let msg = Message::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn deposit_status_from_string() {
        assert_eq!(DepositStatus::from_status("succeeded"), DepositStatus::Succeeded);
        assert_eq!(DepositStatus::from_status("deposit_pending"), DepositStatus::Pending);
        assert_eq!(
            DepositStatus::from_status("requires_action"),
            DepositStatus::Other("requires_action".into())
        );
    }

    #[test]
    fn knowledge_key_prefers_clinic_id() {
        let mut req = TurnRequest {
            org_id: "org".into(),
            ..Default::default()
        };
        assert_eq!(req.knowledge_key(), "org");
        req.clinic_id = "clinic".into();
        assert_eq!(req.knowledge_key(), "clinic");
    }
}
