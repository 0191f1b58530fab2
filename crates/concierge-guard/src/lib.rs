// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety guard layer for the Concierge turn pipeline.
//!
//! - [`inbound`]: weighted prompt-injection scoring over four pattern families
//! - [`phi`]: PHI and medical-advice detection on patient text
//! - [`outbound`]: leak scanning of drafted replies
//!
//! Guards never touch the transcript. Callers decide what to persist.

pub mod inbound;
pub mod outbound;
pub mod patterns;
pub mod phi;

pub use inbound::{
    DEFAULT_BLOCK_THRESHOLD, DEFAULT_WARN_THRESHOLD, GuardAction, GuardScanResult, InboundGuard,
    sanitize_for_llm,
};
pub use outbound::{OutboundVerdict, scan_outbound};
pub use phi::{REDACTED, detect_medical_advice, detect_phi, redact_phi};

/// Reply sent when an inbound message is blocked.
pub const BLOCKED_REPLY: &str = "I'm here to help you with appointment scheduling and questions about our services. How can I assist you today?";

/// Reply sent when a message discloses PHI.
pub const PHI_DEFLECTION_REPLY: &str = "Thanks for sharing. I can help with booking and general questions, but I can't provide medical advice over text. Please call the clinic for medical guidance or discuss this with your provider during your consultation.";

/// Reply sent for a medical-advice request.
pub const MEDICAL_ADVICE_DEFLECTION_REPLY: &str = "I can help with booking and general questions, but I can't provide medical advice over text. Please call the clinic for medical guidance or discuss this with your provider during your consultation.";
