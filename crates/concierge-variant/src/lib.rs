// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service variant resolution.
//!
//! Some services are offered in more than one delivery mode ("in person" and
//! "virtual"). Before availability is fetched the resolver picks the variant
//! the patient asked for, or produces a question to send them.

pub mod keywords;

use std::time::Duration;

use concierge_core::{ClinicConfig, ConciergeError, Deadline, LlmRequest, Message, MeteredLlm, Role};
use tracing::{debug, warn};

pub use keywords::{clarification_question, keyword_match};

/// Outcome of [`VariantResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantResolution {
    /// The service to book: a specific variant, or the input unchanged.
    Resolved(String),
    /// The patient must choose; send this question.
    Clarify(String),
}

#[derive(Debug, Clone)]
pub struct VariantSettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for VariantSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 50,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Current message plus the user turns among the last `lookback` messages,
/// newest first and lowercased.
pub fn recent_user_messages(history: &[Message], current: &str, lookback: usize) -> Vec<String> {
    let start = history.len().saturating_sub(lookback);
    std::iter::once(current.to_lowercase())
        .chain(
            history[start..]
                .iter()
                .rev()
                .filter(|m| m.role == Role::User)
                .map(|m| m.content.to_lowercase()),
        )
        .collect()
}

fn classifier_prompt(service: &str, variants: &[String], messages: &[String]) -> String {
    let options: Vec<String> = variants
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{}. {v}", i + 1))
        .collect();
    format!(
        "A patient is booking a \"{service}\" appointment. This service has delivery options:\n\n{}\n\n\
         The patient said:\n\"\"\"{}\"\"\"\n\n\
         Which option did the patient choose? Reply with ONLY the exact option text (e.g. \"{}\") \
         or the word \"unclear\" if they haven't indicated a preference.\n\
         Do not explain. Do not add punctuation.",
        options.join("\n"),
        messages.join("\n"),
        variants.first().map(String::as_str).unwrap_or_default(),
    )
}

/// Maps a free-form classifier answer back onto a configured variant.
pub fn match_answer<'a>(answer: &str, variants: &'a [String]) -> Option<&'a str> {
    let answer = answer.trim().trim_matches(|c: char| c == '"' || c == '.');
    if let Some(exact) = variants.iter().find(|v| v.eq_ignore_ascii_case(answer)) {
        return Some(exact.as_str());
    }
    let lower = answer.to_lowercase();
    if lower.is_empty() {
        return None;
    }
    variants
        .iter()
        .find(|v| {
            let v_lower = v.to_lowercase();
            let tail_hit = v_lower
                .split_once(" - ")
                .is_some_and(|(_, tail)| lower.contains(tail));
            tail_hit || lower.contains(&v_lower)
        })
        .map(String::as_str)
}

pub struct VariantResolver {
    llm: Option<MeteredLlm>,
    settings: VariantSettings,
}

impl VariantResolver {
    pub fn new(llm: Option<MeteredLlm>, settings: VariantSettings) -> Self {
        Self { llm, settings }
    }

    /// Keywords first, then the LLM, then keywords again, then a question.
    ///
    /// Services with fewer than two variants come back unchanged and the LLM
    /// is never called. Errors only when the turn deadline has expired.
    pub async fn resolve(
        &self,
        cfg: &ClinicConfig,
        service: &str,
        messages: &[String],
        deadline: &Deadline,
    ) -> Result<VariantResolution, ConciergeError> {
        let variants = cfg.service_variants(service);
        if variants.is_empty() {
            return Ok(VariantResolution::Resolved(service.to_string()));
        }
        if let Some(hit) = keyword_match(variants, messages) {
            debug!(service, variant = hit, "variant resolved by keyword");
            return Ok(VariantResolution::Resolved(hit.to_string()));
        }

        if let Some(llm) = &self.llm {
            match self.classify(llm, service, variants, messages, deadline).await {
                Ok(Some(variant)) => {
                    debug!(service, variant = %variant, "variant resolved by classifier");
                    return Ok(VariantResolution::Resolved(variant));
                }
                Ok(None) => {}
                Err(e @ ConciergeError::Timeout { .. }) if deadline.expired() => return Err(e),
                Err(e) => {
                    warn!(service, error = %e, "variant classification failed, retrying keywords");
                    if let Some(hit) = keyword_match(variants, messages) {
                        return Ok(VariantResolution::Resolved(hit.to_string()));
                    }
                }
            }
        }
        Ok(VariantResolution::Clarify(clarification_question(variants)))
    }

    async fn classify(
        &self,
        llm: &MeteredLlm,
        service: &str,
        variants: &[String],
        messages: &[String],
        deadline: &Deadline,
    ) -> Result<Option<String>, ConciergeError> {
        let request = LlmRequest {
            model: self.settings.model.clone(),
            system_prompts: Vec::new(),
            messages: vec![Message::user(classifier_prompt(service, variants, messages))],
            max_tokens: self.settings.max_tokens,
            temperature: 0.0,
        };
        let response = llm
            .complete(request, deadline.budget(self.settings.timeout))
            .await?;
        let matched = match_answer(&response.text, variants).map(str::to_string);
        if matched.is_none() && !response.text.to_lowercase().contains("unclear") {
            warn!(answer = %response.text.trim(), "unexpected variant classifier answer");
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use concierge_test_utils::{MockLlm, RecordingMetrics};

    use super::*;

    fn cfg() -> ClinicConfig {
        let mut cfg = ClinicConfig::new("org-1", "Glow");
        cfg.service_variants.insert(
            "weight loss".to_string(),
            vec![
                "Weight Loss Consultation - In Person".to_string(),
                "Weight Loss Consultation - Virtual".to_string(),
            ],
        );
        cfg.service_variants
            .insert("botox".to_string(), vec!["Botox".to_string()]);
        cfg
    }

    fn resolver(llm: &Arc<MockLlm>) -> VariantResolver {
        VariantResolver::new(
            Some(MeteredLlm::new(llm.clone(), Arc::new(RecordingMetrics::default()))),
            VariantSettings::default(),
        )
    }

    #[tokio::test]
    async fn single_or_no_variant_never_calls_llm() {
        let llm = Arc::new(MockLlm::new());
        let r = resolver(&llm);
        for service in ["Botox", "HydraFacial"] {
            let out = r
                .resolve(&cfg(), service, &["anything".to_string()], &Deadline::unbounded())
                .await
                .unwrap();
            assert_eq!(out, VariantResolution::Resolved(service.to_string()));
        }
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn keywords_resolve_before_llm() {
        let llm = Arc::new(MockLlm::new());
        let msgs = recent_user_messages(&[], "Can I do it from home on video?", 6);
        let out = resolver(&llm)
            .resolve(&cfg(), "weight loss", &msgs, &Deadline::unbounded())
            .await
            .unwrap();
        assert_eq!(
            out,
            VariantResolution::Resolved("Weight Loss Consultation - Virtual".into())
        );
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn llm_answer_is_fuzzily_matched() {
        let llm = Arc::new(MockLlm::new().with_reply("in person"));
        let out = resolver(&llm)
            .resolve(&cfg(), "weight loss", &["i prefer to see someone".into()], &Deadline::unbounded())
            .await
            .unwrap();
        assert_eq!(
            out,
            VariantResolution::Resolved("Weight Loss Consultation - In Person".into())
        );
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn unclear_answer_asks_the_patient() {
        let llm = Arc::new(MockLlm::new().with_reply("unclear"));
        let out = resolver(&llm)
            .resolve(&cfg(), "weight loss", &["sounds good".into()], &Deadline::unbounded())
            .await
            .unwrap();
        assert_eq!(
            out,
            VariantResolution::Clarify("We offer In Person and Virtual. Which are you interested in?".into())
        );
    }

    #[tokio::test]
    async fn llm_error_falls_back_to_question() {
        let llm = Arc::new(MockLlm::new().with_error(ConciergeError::upstream("boom")));
        let out = resolver(&llm)
            .resolve(&cfg(), "weight loss", &["sounds good".into()], &Deadline::unbounded())
            .await
            .unwrap();
        assert!(matches!(out, VariantResolution::Clarify(_)));
    }

    #[test]
    fn recent_messages_newest_first() {
        let history = vec![
            Message::user("old"),
            Message::assistant("hi"),
            Message::user("Newer"),
        ];
        assert_eq!(
            recent_user_messages(&history, "NOW", 2),
            vec!["now".to_string(), "newer".to_string()]
        );
    }

    #[test]
    fn answer_matching() {
        let variants = cfg().service_variants["weight loss"].clone();
        assert_eq!(match_answer("weight loss consultation - virtual", &variants), Some(variants[1].as_str()));
        assert_eq!(match_answer("\"Virtual\".", &variants), Some(variants[1].as_str()));
        assert_eq!(match_answer("unclear", &variants), None);
    }
}
