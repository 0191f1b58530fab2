// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline guard and extractor reports.

use std::collections::BTreeMap;

use concierge_core::{Message, QualificationSnapshot};
use concierge_guard::{GuardScanResult, InboundGuard, detect_medical_advice, detect_phi};
use concierge_qualify::extract_preferences;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct InboundReport {
    #[serde(flatten)]
    pub scan: GuardScanResult,
    pub phi: bool,
    pub medical_advice: Vec<String>,
}

pub fn inbound_report(text: &str, block_threshold: f64, warn_threshold: f64) -> InboundReport {
    InboundReport {
        scan: InboundGuard::with_thresholds(block_threshold, warn_threshold).scan(text),
        phi: detect_phi(text),
        medical_advice: detect_medical_advice(text),
    }
}

/// Either a bare message array or `{"messages": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Messages(Vec<Message>),
    Wrapped {
        messages: Vec<Message>,
        #[serde(default)]
        service_aliases: BTreeMap<String, String>,
    },
}

#[derive(Debug, Serialize)]
pub struct ExtractReport {
    /// Whether anything beyond defaults was found.
    pub found: bool,
    pub snapshot: QualificationSnapshot,
}

pub fn extract_report(json: &str) -> serde_json::Result<ExtractReport> {
    let (messages, aliases) = match serde_json::from_str(json)? {
        TranscriptFile::Messages(messages) => (messages, BTreeMap::new()),
        TranscriptFile::Wrapped {
            messages,
            service_aliases,
        } => (messages, service_aliases),
    };
    let (snapshot, found) = extract_preferences(&messages, &aliases);
    Ok(ExtractReport { found, snapshot })
}
