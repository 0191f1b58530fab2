// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration. Every section has working defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub transcript: TranscriptConfig,

    #[serde(default)]
    pub deposit: DepositConfig,

    #[serde(default)]
    pub scheduling: SchedulingConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub booking: BookingConfig,

    #[serde(default)]
    pub prompts: PromptConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            transcript: TranscriptConfig::default(),
            deposit: DepositConfig::default(),
            scheduling: SchedulingConfig::default(),
            guard: GuardConfig::default(),
            booking: BookingConfig::default(),
            prompts: PromptConfig::default(),
            metrics: MetricsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Model selection and per-call limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Model id passed through to the LLM client.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_reply_max_tokens")]
    pub reply_max_tokens: u32,

    #[serde(default = "default_reply_temperature")]
    pub reply_temperature: f32,

    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,

    /// Token cap for the deposit classifier.
    #[serde(default = "default_classifier_max_tokens")]
    pub classifier_max_tokens: u32,

    #[serde(default = "default_classifier_timeout_secs")]
    pub classifier_timeout_secs: u64,

    /// Token cap for the variant classifier.
    #[serde(default = "default_variant_max_tokens")]
    pub variant_max_tokens: u32,

    #[serde(default = "default_variant_timeout_secs")]
    pub variant_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            reply_max_tokens: default_reply_max_tokens(),
            reply_temperature: default_reply_temperature(),
            reply_timeout_secs: default_reply_timeout_secs(),
            classifier_max_tokens: default_classifier_max_tokens(),
            classifier_timeout_secs: default_classifier_timeout_secs(),
            variant_max_tokens: default_variant_max_tokens(),
            variant_timeout_secs: default_variant_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    pub fn variant_timeout(&self) -> Duration {
        Duration::from_secs(self.variant_timeout_secs)
    }
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_reply_max_tokens() -> u32 {
    450
}

fn default_reply_temperature() -> f32 {
    0.2
}

fn default_reply_timeout_secs() -> u64 {
    60
}

fn default_classifier_max_tokens() -> u32 {
    256
}

fn default_classifier_timeout_secs() -> u64 {
    25
}

fn default_variant_max_tokens() -> u32 {
    50
}

fn default_variant_timeout_secs() -> u64 {
    5
}

/// History and context sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptConfig {
    /// Messages sent to the model, including the pinned system prompt.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,

    /// Upcoming times listed when a message shows booking intent.
    #[serde(default = "default_availability_context_slots")]
    pub availability_context_slots: usize,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history_messages(),
            knowledge_top_k: default_knowledge_top_k(),
            availability_context_slots: default_availability_context_slots(),
        }
    }
}

fn default_max_history_messages() -> usize {
    40
}

fn default_knowledge_top_k() -> usize {
    3
}

fn default_availability_context_slots() -> usize {
    5
}

/// Deposit defaults and classifier tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DepositConfig {
    #[serde(default = "default_amount_cents")]
    pub default_amount_cents: i64,

    #[serde(default = "default_description")]
    pub default_description: String,

    #[serde(default)]
    pub success_url: String,

    #[serde(default)]
    pub cancel_url: String,

    /// Non-system turns scanned for deposit context.
    #[serde(default = "default_classifier_lookback")]
    pub classifier_lookback: usize,

    /// Fraction of classifier parse failures that are logged.
    #[serde(default = "default_parse_error_log_sample_rate")]
    pub parse_error_log_sample_rate: f64,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            default_amount_cents: default_amount_cents(),
            default_description: default_description(),
            success_url: String::new(),
            cancel_url: String::new(),
            classifier_lookback: default_classifier_lookback(),
            parse_error_log_sample_rate: default_parse_error_log_sample_rate(),
        }
    }
}

fn default_amount_cents() -> i64 {
    5000
}

fn default_description() -> String {
    "Appointment deposit".to_string()
}

fn default_classifier_lookback() -> usize {
    8
}

fn default_parse_error_log_sample_rate() -> f64 {
    0.1
}

/// Availability fetch and time-selection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulingConfig {
    /// Availability lookups can scrape a booking page, so this is generous.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_max_presented_slots")]
    pub max_presented_slots: usize,

    #[serde(default = "default_max_slots_per_day")]
    pub max_slots_per_day: usize,

    /// User turns consulted when resolving a service variant.
    #[serde(default = "default_variant_lookback")]
    pub variant_lookback: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_presented_slots: default_max_presented_slots(),
            max_slots_per_day: default_max_slots_per_day(),
            variant_lookback: default_variant_lookback(),
        }
    }
}

impl SchedulingConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn default_fetch_timeout_secs() -> u64 {
    120
}

fn default_max_presented_slots() -> usize {
    6
}

fn default_max_slots_per_day() -> usize {
    2
}

fn default_variant_lookback() -> usize {
    6
}

/// Inbound injection scoring thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    #[serde(default = "default_block_threshold")]
    pub block_threshold: f64,

    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            block_threshold: default_block_threshold(),
            warn_threshold: default_warn_threshold(),
        }
    }
}

fn default_block_threshold() -> f64 {
    0.7
}

fn default_warn_threshold() -> f64 {
    0.3
}

/// Structured-booking hand-off.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BookingConfig {
    /// Base URL the booking platform calls back on completion.
    #[serde(default)]
    pub api_base_url: String,
}

/// System prompt overrides. `{deposit}` is replaced with the clinic deposit,
/// e.g. `$50`. Unset prompts use the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    #[serde(default)]
    pub sms_system_prompt: Option<String>,

    #[serde(default)]
    pub voice_system_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}
