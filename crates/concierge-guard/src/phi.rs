// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PHI and medical-advice detection.
//!
//! Both detectors need a cue *and* a context match, so a booking request that
//! merely names a service ("can I book botox") is never flagged.

use std::sync::LazyLock;

use regex::Regex;

/// Replacement for redacted patient text.
pub const REDACTED: &str = "[REDACTED]";

static PHI_PREFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:diagnosed|diagnosis|my condition|my symptoms|i have|i've had|i am|i'm)\b")
        .unwrap()
});

static PHI_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:diabetes|hiv|aids|cancer|hepatitis|pregnant|pregnancy|depression|anxiety|bipolar|schizophrenia|asthma|hypertension|blood pressure|infection|herpes|std|sti)\b").unwrap()
});

static STRONG_MEDICAL_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:is it safe|safe to|ok to|okay to|contraindications?|side effects?|dosage|dose|mg|milligram|interactions?|mix with|stop taking)\b").unwrap()
});

static WEAK_MEDICAL_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:should i|can i)\b").unwrap());

static MEDICAL_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:botox|filler|laser|microneedling|facial|peel|dermaplaning|prp|injectable|medication|medicine|meds|prescription|ibuprofen|tylenol|acetaminophen|antibiotics?|painkillers?|blood pressure|pregnan(?:t|cy)|breastfeed(?:ing)?|allerg(?:y|ic))\b").unwrap()
});

static MEDICAL_SPECIFIC_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:medication|medicine|meds|prescription|ibuprofen|tylenol|acetaminophen|antibiotics?|painkillers?|blood pressure|pregnan(?:t|cy)|breastfeed(?:ing)?|allerg(?:y|ic))\b").unwrap()
});

/// Substrings reported as audit keywords for a refused medical-advice request.
const MEDICAL_KEYWORDS: &[&str] = &[
    "botox",
    "filler",
    "laser",
    "microneedling",
    "facial",
    "peel",
    "dermaplaning",
    "prp",
    "injectable",
    "medication",
    "medicine",
    "meds",
    "prescription",
    "ibuprofen",
    "tylenol",
    "acetaminophen",
    "antibiotic",
    "antibiotics",
    "painkiller",
    "painkillers",
    "blood pressure",
    "pregnant",
    "pregnancy",
    "breastfeeding",
    "allergy",
    "allergic",
    "contraindication",
    "contraindications",
    "side effects",
    "dosage",
    "dose",
    "interaction",
    "interactions",
    "mix with",
];

const GENERIC_MEDICAL_KEYWORD: &str = "medical_advice_request";

/// A self-disclosure cue plus a condition keyword.
pub fn detect_phi(message: &str) -> bool {
    let message = message.trim().to_lowercase();
    if message.is_empty() {
        return false;
    }
    PHI_PREFACE.is_match(&message) && PHI_KEYWORDS.is_match(&message)
}

/// Returns `(REDACTED, true)` when the message discloses PHI.
pub fn redact_phi(message: &str) -> (String, bool) {
    if detect_phi(message) {
        (REDACTED.to_string(), true)
    } else {
        (message.to_string(), false)
    }
}

/// Keywords of a medical-advice request, or an empty list when the message is not one.
///
/// Strong cues pair with any medical context; weak cues ("can I") need a
/// medication or condition, not just a service name.
pub fn detect_medical_advice(message: &str) -> Vec<String> {
    let message = message.trim().to_lowercase();
    if message.is_empty() {
        return Vec::new();
    }
    let strong = STRONG_MEDICAL_CUE.is_match(&message);
    let weak = WEAK_MEDICAL_CUE.is_match(&message);
    let in_context = if strong {
        MEDICAL_CONTEXT.is_match(&message)
    } else if weak {
        MEDICAL_SPECIFIC_CONTEXT.is_match(&message)
    } else {
        false
    };
    if !in_context {
        return Vec::new();
    }

    let mut keywords: Vec<String> = MEDICAL_KEYWORDS
        .iter()
        .filter(|kw| message.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();
    if keywords.is_empty() {
        keywords.push(GENERIC_MEDICAL_KEYWORD.to_string());
    }
    keywords
}
