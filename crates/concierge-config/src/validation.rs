// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks serde cannot express. All problems are collected.

use crate::diagnostic::ConfigError;
use crate::model::EngineConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    for (key, secs) in [
        ("llm.reply_timeout_secs", config.llm.reply_timeout_secs),
        ("llm.classifier_timeout_secs", config.llm.classifier_timeout_secs),
        ("llm.variant_timeout_secs", config.llm.variant_timeout_secs),
        ("scheduling.fetch_timeout_secs", config.scheduling.fetch_timeout_secs),
    ] {
        if secs == 0 {
            fail(format!("{key} must be greater than zero"));
        }
    }

    if config.llm.reply_max_tokens == 0 {
        fail("llm.reply_max_tokens must be greater than zero".to_string());
    }
    if !(0.0..=2.0).contains(&config.llm.reply_temperature) {
        fail(format!(
            "llm.reply_temperature must be between 0 and 2, got {}",
            config.llm.reply_temperature
        ));
    }
    if config.transcript.max_history_messages == 0 {
        fail("transcript.max_history_messages must be at least 1".to_string());
    }
    if config.deposit.default_amount_cents <= 0 {
        fail(format!(
            "deposit.default_amount_cents must be positive, got {}",
            config.deposit.default_amount_cents
        ));
    }
    if !(0.0..=1.0).contains(&config.deposit.parse_error_log_sample_rate) {
        fail(format!(
            "deposit.parse_error_log_sample_rate must be between 0 and 1, got {}",
            config.deposit.parse_error_log_sample_rate
        ));
    }
    if config.scheduling.max_presented_slots == 0 {
        fail("scheduling.max_presented_slots must be at least 1".to_string());
    }
    if config.scheduling.max_slots_per_day == 0 {
        fail("scheduling.max_slots_per_day must be at least 1".to_string());
    }

    let guard = &config.guard;
    for (key, value) in [
        ("guard.block_threshold", guard.block_threshold),
        ("guard.warn_threshold", guard.warn_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            fail(format!("{key} must be between 0 and 1, got {value}"));
        }
    }
    if guard.warn_threshold >= guard.block_threshold {
        fail(format!(
            "guard.warn_threshold ({}) must be below guard.block_threshold ({})",
            guard.warn_threshold, guard.block_threshold
        ));
    }

    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        fail(format!(
            "log_level `{}` is not one of {}",
            config.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
