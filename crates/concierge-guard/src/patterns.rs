// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tagged pattern tables for the inbound and outbound guards.
//!
//! Tables are plain data (`source`, label, weight or action) compiled once on
//! first use. The matching code in [`crate::inbound`] and [`crate::outbound`]
//! never names an individual pattern.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Self-descriptions shared by the leak table and [`AI_IDENTITY_CLAUSE`].
macro_rules! ai_identity {
    () => {
        r"\bi('m| am) (a|an) (AI|artificial intelligence|language model|LLM|GPT|Claude|chatbot|chat bot)\b"
    };
}
use strum::{Display, EnumString};

/// Inbound pattern family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    DirectInjection,
    Exfiltration,
    Obfuscation,
    ContextManipulation,
}

/// What the outbound guard does when a leak pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeakAction {
    /// Replace the whole reply.
    Block,
    /// Strip the offending clause and keep the rest.
    Sanitize,
}

struct InboundSpec {
    family: PatternFamily,
    label: &'static str,
    weight: f64,
    source: &'static str,
}

/// A compiled inbound pattern.
#[derive(Debug)]
pub struct WeightedPattern {
    pub family: PatternFamily,
    pub label: &'static str,
    pub weight: f64,
    pub regex: Regex,
}

impl WeightedPattern {
    /// `family:label`, the reason string reported by scans.
    pub fn reason(&self) -> String {
        format!("{}:{}", self.family, self.label)
    }
}

use PatternFamily::{ContextManipulation, DirectInjection, Exfiltration, Obfuscation};

const INBOUND_SPECS: &[InboundSpec] = &[
    InboundSpec {
        family: DirectInjection,
        label: "ignore_instructions",
        weight: 0.9,
        source: r"(?i)ignore\s+(all\s+)?(previous|prior|above|earlier|your)\s+(instructions?|rules?|prompts?|guidelines?|directives?|programming)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "disregard_instructions",
        weight: 0.9,
        source: r"(?i)disregard\s+(all\s+)?(previous|prior|above|earlier|your)\s+(instructions?|rules?|prompts?|guidelines?|directives?)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "forget_instructions",
        weight: 0.9,
        source: r"(?i)forget\s+(all\s+)?(previous|prior|above|earlier|your)\s+(instructions?|rules?|prompts?|guidelines?|directives?)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "role_reassignment",
        weight: 0.7,
        source: r"(?i)you\s+are\s+now\s+(a|an|my)\s+",
    },
    InboundSpec {
        family: DirectInjection,
        label: "new_role",
        weight: 0.9,
        source: r"(?i)new\s+role\s*:|new\s+instructions?\s*:|system\s*prompt\s*:|<<\s*sys(tem)?\s*>>",
    },
    InboundSpec {
        family: DirectInjection,
        label: "override",
        weight: 0.8,
        source: r"(?i)override\s+(your\s+)?(system|instructions?|rules?|safety|guidelines?)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "act_as",
        weight: 0.8,
        source: r"(?i)act\s+as\s+(if\s+)?(you\s+are\s+|you're\s+)?(a\s+|an\s+)?(?:different|new|unrestricted|unfiltered|jailbroken)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "pretend_no_rules",
        weight: 0.9,
        source: r"(?i)(pretend|imagine|suppose|assume)\s+(that\s+)?(you\s+)?(are|have|were|don'?t\s+have)\s+(no\s+)?(rules?|restrictions?|limits?|boundaries|guidelines?|filters?|safety)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "do_not_follow",
        weight: 0.9,
        source: r"(?i)do\s+not\s+follow\s+(your|the|any)\s+(rules?|instructions?|guidelines?|safety)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "bypass",
        weight: 0.8,
        source: r"(?i)bypass\s+(your\s+)?(safety|filters?|restrictions?|guidelines?|rules?|content\s+policy)",
    },
    InboundSpec {
        family: DirectInjection,
        label: "jailbreak_keyword",
        weight: 0.9,
        source: r"(?i)jailbreak|DAN\s*mode|developer\s*mode|unrestricted\s*mode|god\s*mode",
    },
    InboundSpec {
        family: Exfiltration,
        label: "system_prompt",
        weight: 0.8,
        source: r"(?i)(reveal|show|display|print|output|repeat|tell\s+me|what\s+(is|are))\s+(your\s+)?(system\s+prompt|instructions?|rules?|initial\s+prompt|hidden\s+prompt|system\s+message|original\s+prompt)",
    },
    InboundSpec {
        family: Exfiltration,
        label: "patient_data",
        weight: 0.7,
        source: r"(?i)(what|list|show|give|tell)\s+(me\s+)?(all\s+)?(the\s+)?(other\s+)?patient('?s)?\s+(data|info|names?|numbers?|records?|details?|appointments?)",
    },
    InboundSpec {
        family: Exfiltration,
        label: "credentials",
        weight: 0.8,
        source: r"(?i)(what|list|show|give|tell)\s+(me\s+)?(the\s+)?(all\s+)?(api|secret|key|token|password|credential|database|env|config)\b",
    },
    InboundSpec {
        family: Exfiltration,
        label: "credentials_keyword",
        weight: 0.8,
        source: r"(?i)\b(api|secret|stripe|telnyx|aws|database|db)\s*(key|token|secret|password|credential)s?\b",
    },
    InboundSpec {
        family: Exfiltration,
        label: "repeat_above",
        weight: 0.7,
        source: r"(?i)repeat\s+(everything|all|the\s+text)\s+(above|before|from\s+the\s+start|from\s+the\s+beginning)",
    },
    InboundSpec {
        family: Exfiltration,
        label: "what_told",
        weight: 0.6,
        source: r"(?i)what\s+(?:were\s+)?you\s+(?:were\s+)?told\s+(before|initially|at\s+the\s+(start|beginning))",
    },
    InboundSpec {
        family: Obfuscation,
        label: "encoding",
        weight: 0.5,
        source: r"(?i)base64\s*(encode|decode|:)|\\x[0-9a-fA-F]{2}",
    },
    InboundSpec {
        family: Obfuscation,
        label: "encoding_request",
        weight: 0.4,
        source: r"(?i)(translate|convert|encode)\s+(this|the\s+following)\s+(to|into|as)\s+(base64|hex|rot13|binary|morse)",
    },
    InboundSpec {
        family: Obfuscation,
        label: "markdown_image",
        weight: 0.4,
        source: r"!\[.*\]\(https?://",
    },
    InboundSpec {
        family: Obfuscation,
        label: "html_injection",
        weight: 0.6,
        source: r"<\s*(script|img|iframe|object|embed|link|style|svg|form)\b",
    },
    InboundSpec {
        family: ContextManipulation,
        label: "fake_boundary",
        weight: 0.8,
        source: r"(?i)(end\s+of\s+)?(system|assistant)\s*(message|prompt|instructions?)\s*[\-=]{2,}",
    },
    InboundSpec {
        family: ContextManipulation,
        label: "special_tokens",
        weight: 0.9,
        source: r"(?i)\[/?INST\]|\[/?SYS\]|<\|im_start\|>|<\|im_end\|>|<\|system\|>|<\|user\|>|<\|assistant\|>",
    },
    InboundSpec {
        family: ContextManipulation,
        label: "role_markers",
        weight: 0.7,
        source: r"(?i)###\s*(system|instruction|human|assistant|user)\s*:",
    },
    InboundSpec {
        family: ContextManipulation,
        label: "dismiss_context",
        weight: 0.7,
        source: r"(?i)(previous|above)\s+conversation\s+(is|was)\s+(just\s+)?(a\s+)?(test|example|fake|simulation)",
    },
    InboundSpec {
        family: ContextManipulation,
        label: "real_instructions",
        weight: 0.8,
        source: r"(?i)the\s+real\s+(instructions?|task|prompt|conversation)\s+(is|starts?|begins?)",
    },
];

/// Every inbound pattern, compiled.
pub static INBOUND_PATTERNS: LazyLock<Vec<WeightedPattern>> = LazyLock::new(|| {
    INBOUND_SPECS
        .iter()
        .map(|spec| WeightedPattern {
            family: spec.family,
            label: spec.label,
            weight: spec.weight,
            regex: Regex::new(spec.source).unwrap(),
        })
        .collect()
});

/// Stripped from warn-level inbound text before it reaches the LLM, in order.
pub static SANITIZE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\[/?INST\]|\[/?SYS\]|<\|im_start\|>|<\|im_end\|>|<\|system\|>|<\|user\|>|<\|assistant\|>").unwrap(),
        Regex::new(r"(?i)###\s*(system|instruction|human|assistant|user)\s*:").unwrap(),
        Regex::new(r"(?i)<\s*(script|img|iframe|object|embed|link|style|svg|form)\b[^>]*>").unwrap(),
        Regex::new(r"!\[.*?\]\(https?://[^)]+\)").unwrap(),
    ]
});

struct LeakSpec {
    label: &'static str,
    action: LeakAction,
    source: &'static str,
}

/// A compiled outbound leak pattern.
#[derive(Debug)]
pub struct LeakPattern {
    pub label: &'static str,
    pub action: LeakAction,
    pub regex: Regex,
}

const LEAK_SPECS: &[LeakSpec] = &[
    LeakSpec {
        label: "system_prompt_disclosure",
        action: LeakAction::Block,
        source: r"(?i)my (system\s+)?prompt\s+(is|says|tells|instructs)",
    },
    LeakSpec {
        label: "instructions_disclosure",
        action: LeakAction::Block,
        source: r"(?i)my instructions?\s+(are|say|tell|include|require)",
    },
    LeakSpec {
        label: "programming_disclosure",
        action: LeakAction::Block,
        source: r"(?i)i('m| am) (programmed|instructed|told|designed|configured) to",
    },
    LeakSpec {
        label: "rules_listing",
        action: LeakAction::Block,
        source: r"(?i)(here are|these are|the following are)\s+(my )?(system )?(instructions|rules|guidelines|prompts)",
    },
    LeakSpec {
        label: "ai_identity",
        action: LeakAction::Sanitize,
        source: concat!(r"(?i)", ai_identity!()),
    },
    LeakSpec {
        label: "tech_stack",
        action: LeakAction::Block,
        source: r"(?i)(powered by|built on|running on|using)\s+(Claude|GPT|OpenAI|Anthropic|Bedrock|AWS)",
    },
    LeakSpec {
        label: "credential",
        action: LeakAction::Block,
        source: r"(?i)(api[_\s]?key|secret[_\s]?key|access[_\s]?token|bearer\s+token)\s*[:=]\s*\S+",
    },
    LeakSpec {
        label: "stripe_key",
        action: LeakAction::Block,
        source: r"(?i)(sk|pk)[-_](live|test)[-_][a-zA-Z0-9]{20,}",
    },
    LeakSpec {
        label: "aws_key",
        action: LeakAction::Block,
        source: r"(?i)AKIA[A-Z0-9]{16}",
    },
    LeakSpec {
        label: "database_url",
        action: LeakAction::Block,
        source: r"(?i)(postgres|mysql|redis|mongodb)://\S+",
    },
    LeakSpec {
        label: "ip_port",
        action: LeakAction::Block,
        source: r"(?i)\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}:\d{2,5}",
    },
    LeakSpec {
        label: "internal_url",
        action: LeakAction::Block,
        source: r"(?i)(api-dev|portal-dev|staging|internal)\.[a-z]+\.(com|io|net)",
    },
    LeakSpec {
        label: "internal_path",
        action: LeakAction::Block,
        source: r"(?i)/admin/|/webhooks/|/internal/|/debug/",
    },
    LeakSpec {
        label: "other_patient_ref",
        action: LeakAction::Block,
        source: r"(?i)other patient'?s?\s+(name|phone|email|appointment|record)",
    },
];

/// Every outbound leak pattern, compiled.
pub static LEAK_PATTERNS: LazyLock<Vec<LeakPattern>> = LazyLock::new(|| {
    LEAK_SPECS
        .iter()
        .map(|spec| LeakPattern {
            label: spec.label,
            action: spec.action,
            regex: Regex::new(spec.source).unwrap(),
        })
        .collect()
});

/// Removes a whole "I'm an AI ..." sentence from a drafted reply.
pub static AI_IDENTITY_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(r"(?i)[^.!?]*", ai_identity!(), r"[^.!?]*[.!?]?\s*")).unwrap()
});
