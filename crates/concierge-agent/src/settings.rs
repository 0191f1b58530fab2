// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine tunables, derived from [`EngineConfig`].

use std::time::Duration;

use concierge_config::EngineConfig;
use concierge_deposit::DepositSettings;
use concierge_guard::{DEFAULT_BLOCK_THRESHOLD, DEFAULT_WARN_THRESHOLD};
use concierge_schedule::ScheduleSettings;
use concierge_transcript::ContextSettings;
use concierge_variant::VariantSettings;

use crate::faq::FaqSettings;

/// Everything the engine reads from configuration, already split per stage.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model: String,
    pub reply_max_tokens: u32,
    pub reply_temperature: f32,
    pub reply_timeout: Duration,
    pub max_history: usize,
    pub context: ContextSettings,
    pub deposit: DepositSettings,
    pub variant: VariantSettings,
    pub variant_lookback: usize,
    pub faq: FaqSettings,
    pub schedule: ScheduleSettings,
    pub block_threshold: f64,
    pub warn_threshold: f64,
    /// Base of the booking callback URL. Empty disables the callback.
    pub booking_api_base_url: String,
    pub sms_system_prompt: Option<String>,
    pub voice_system_prompt: Option<String>,
}

impl EngineSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        let llm = &config.llm;
        Self {
            model: llm.model.clone(),
            reply_max_tokens: llm.reply_max_tokens,
            reply_temperature: llm.reply_temperature,
            reply_timeout: llm.reply_timeout(),
            max_history: config.transcript.max_history_messages,
            context: ContextSettings {
                knowledge_top_k: config.transcript.knowledge_top_k,
                availability_slots: config.transcript.availability_context_slots,
                availability_timeout: config.scheduling.fetch_timeout(),
            },
            deposit: DepositSettings {
                model: llm.model.clone(),
                default_amount_cents: config.deposit.default_amount_cents,
                description: config.deposit.default_description.clone(),
                success_url: config.deposit.success_url.clone(),
                cancel_url: config.deposit.cancel_url.clone(),
                max_tokens: llm.classifier_max_tokens,
                timeout: llm.classifier_timeout(),
                lookback: config.deposit.classifier_lookback,
                log_sample_rate: config.deposit.parse_error_log_sample_rate,
            },
            variant: VariantSettings {
                model: llm.model.clone(),
                max_tokens: llm.variant_max_tokens,
                timeout: llm.variant_timeout(),
            },
            variant_lookback: config.scheduling.variant_lookback,
            faq: FaqSettings {
                model: llm.model.clone(),
                max_tokens: llm.variant_max_tokens,
                timeout: llm.variant_timeout(),
            },
            schedule: ScheduleSettings {
                fetch_timeout: config.scheduling.fetch_timeout(),
                max_presented_slots: config.scheduling.max_presented_slots,
                max_slots_per_day: config.scheduling.max_slots_per_day,
            },
            block_threshold: config.guard.block_threshold,
            warn_threshold: config.guard.warn_threshold,
            booking_api_base_url: config.booking.api_base_url.clone(),
            sms_system_prompt: config.prompts.sms_system_prompt.clone(),
            voice_system_prompt: config.prompts.voice_system_prompt.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            reply_max_tokens: 450,
            reply_temperature: 0.2,
            reply_timeout: Duration::from_secs(60),
            max_history: 40,
            context: ContextSettings::default(),
            deposit: DepositSettings::default(),
            variant: VariantSettings::default(),
            variant_lookback: 6,
            faq: FaqSettings::default(),
            schedule: ScheduleSettings::default(),
            block_threshold: DEFAULT_BLOCK_THRESHOLD,
            warn_threshold: DEFAULT_WARN_THRESHOLD,
            booking_api_base_url: String::new(),
            sms_system_prompt: None,
            voice_system_prompt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_values_flow_into_each_stage() {
        let mut config = EngineConfig::default();
        config.llm.model = "claude-test".into();
        config.deposit.default_amount_cents = 7500;
        config.scheduling.max_presented_slots = 4;
        config.booking.api_base_url = "https://api.example.com/".into();

        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.model, "claude-test");
        assert_eq!(settings.deposit.model, "claude-test");
        assert_eq!(settings.variant.model, "claude-test");
        assert_eq!(settings.faq.model, "claude-test");
        assert_eq!(settings.deposit.default_amount_cents, 7500);
        assert_eq!(settings.deposit.timeout, Duration::from_secs(25));
        assert_eq!(settings.schedule.max_presented_slots, 4);
        assert_eq!(settings.context.availability_timeout, Duration::from_secs(120));
        assert_eq!(settings.booking_api_base_url, "https://api.example.com/");
    }

    #[test]
    fn defaults_agree_with_config_defaults() {
        let from_config = EngineSettings::from_config(&EngineConfig::default());
        let default = EngineSettings::default();
        assert_eq!(from_config.reply_max_tokens, default.reply_max_tokens);
        assert_eq!(from_config.reply_timeout, default.reply_timeout);
        assert_eq!(from_config.max_history, default.max_history);
        assert_eq!(from_config.variant_lookback, default.variant_lookback);
        assert_eq!(from_config.block_threshold, default.block_threshold);
    }
}
