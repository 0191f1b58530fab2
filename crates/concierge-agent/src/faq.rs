// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned answers to common service-comparison questions.
//!
//! A question that looks like a comparison is first labelled by the LLM;
//! when that fails or finds nothing, a pattern table gets a second look.
//! Anything still unmatched goes to the reply model as usual.

use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use concierge_core::{ConciergeError, Deadline, LlmRequest, Message, MeteredLlm};
use concierge_deposit::classifier::strip_fences;
use regex::Regex;
use serde::Deserialize;
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use crate::shortcuts::Shortcut;

/// A question with a canned answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FaqTopic {
    HydrafacialVsDiamondglow,
    HylenexVsFillers,
    BotoxVsFillers,
    PeelVsMicroneedling,
    LaserHairSessions,
    BotoxDuration,
    FillerDuration,
}

impl FaqTopic {
    pub fn reply(self) -> &'static str {
        match self {
            Self::HydrafacialVsDiamondglow => {
                "Great question! Both are excellent exfoliating facials, but they work a bit differently:\n\n\
                 HydraFacial uses vortex technology with water and serums to deeply cleanse and hydrate. It's very gentle and great for all skin types, especially sensitive skin.\n\n\
                 DiamondGlow uses a diamond-tip wand for exfoliation while infusing serums. It's slightly more intense and may be better for those wanting deeper exfoliation.\n\n\
                 For sensitive skin, I'd typically recommend starting with HydraFacial since it's the gentler option. Would you like to schedule a consultation to discuss which would be best for your skin goals?"
            }
            Self::HylenexVsFillers => {
                "Great question! These are very different:\n\n\
                 Dermal fillers (like Juvederm and Restylane) ADD volume to areas like lips, cheeks, and smile lines. They contain hyaluronic acid and results last 6-18 months.\n\n\
                 Hylenex (hyaluronidase) is an enzyme that DISSOLVES hyaluronic acid fillers. It's used to reverse unwanted filler results, correct asymmetry, or treat complications. It's not a filler itself.\n\n\
                 Would you like to schedule a consultation to discuss which service is right for you?"
            }
            Self::BotoxVsFillers => {
                "Great question! They work differently:\n\n\
                 Botox relaxes muscles to smooth dynamic wrinkles (like forehead lines and crow's feet). Results last 3-4 months.\n\n\
                 Fillers add volume and plump areas like lips, cheeks, and smile lines. Results typically last 6-18 months depending on the type.\n\n\
                 Many patients actually use both for a complete rejuvenation! Would you like to schedule a consultation to see which would best address your concerns?"
            }
            Self::PeelVsMicroneedling => {
                "Both are great for skin rejuvenation but work differently:\n\n\
                 Chemical peels use acids to exfoliate and improve texture, tone, and fine lines. Downtime varies from none to a week depending on depth.\n\n\
                 Microneedling creates tiny punctures to stimulate collagen production. It's excellent for scars, pores, and overall skin texture with 1-3 days of redness.\n\n\
                 Your practitioner can recommend the best option based on your skin type and goals. Would you like to schedule a consultation?"
            }
            Self::LaserHairSessions => {
                "Most people need 6-8 laser hair removal sessions spaced 4-6 weeks apart for optimal results. The exact number depends on the treatment area, hair color, and skin type. After completing the initial series, occasional maintenance sessions may be needed. Would you like to schedule a consultation to get a personalized treatment plan?"
            }
            Self::BotoxDuration => {
                "Botox typically lasts 3-4 months. You'll start seeing results within 3-7 days, with full effects visible at 2 weeks. Many patients schedule maintenance appointments every 3-4 months to maintain their results. Would you like to book an appointment?"
            }
            Self::FillerDuration => {
                "Dermal fillers typically last 6-18 months depending on the type and treatment area. Lip fillers usually last 6-12 months, while cheek fillers can last 12-18 months. Results vary by individual metabolism. Would you like to schedule a consultation?"
            }
        }
    }
}

static COMPARISON_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:difference between|what'?s the difference|vs\.?|versus|compared? to|or|which (?:is better|one)|how long|how many)\b",
    )
    .unwrap()
});

/// One row of the fallback table.
struct CachedAnswer {
    topic: FaqTopic,
    pattern: Regex,
    keywords: &'static [&'static str],
}

// Dissolving must be checked before the generic botox/filler comparison.
static CACHED_ANSWERS: LazyLock<Vec<CachedAnswer>> = LazyLock::new(|| {
    let row = |topic: FaqTopic, source: &str, keywords: &'static [&'static str]| CachedAnswer {
        topic,
        pattern: Regex::new(source).unwrap(),
        keywords,
    };
    vec![
        row(
            FaqTopic::HydrafacialVsDiamondglow,
            r"(?i)hydra[\s-]?facial.*diamond\s*glow|diamond\s*glow.*hydra[\s-]?facial",
            &["hydrafacial", "diamondglow", "difference", "vs", "versus", "compare", "better"],
        ),
        row(
            FaqTopic::HylenexVsFillers,
            r"(?i)(dissolv|hylenex|hyaluronidase).*filler|filler.*(dissolv|hylenex|hyaluronidase)",
            &[],
        ),
        row(
            FaqTopic::BotoxVsFillers,
            r"(?i)(botox|dysport|xeomin).*(filler|juvederm|restylane)|(filler|juvederm|restylane).*(botox|dysport|xeomin)",
            &[],
        ),
        row(
            FaqTopic::PeelVsMicroneedling,
            r"(?i)peel.*micro[\s-]?needling|micro[\s-]?needling.*peel",
            &["peel", "microneedling", "difference", "vs", "versus", "compare"],
        ),
        row(
            FaqTopic::LaserHairSessions,
            r"(?i)how many.*(session|treatment|appointment).*(laser|hair|removal)",
            &["laser", "hair", "sessions", "how many", "treatments"],
        ),
        row(
            FaqTopic::BotoxDuration,
            r"(?i)how long.*(botox|dysport|xeomin).*(last|work|effect)",
            &["botox", "long", "last", "duration"],
        ),
        row(
            FaqTopic::FillerDuration,
            r"(?i)how long.*(filler|juvederm|restylane).*(last|work|effect)",
            &["filler", "long", "last", "duration"],
        ),
    ]
});

/// Whether `message` reads like a comparison or a common "how long / how
/// many" question. Only these messages are worth a classifier call.
pub fn is_comparison_question(message: &str) -> bool {
    COMPARISON_CUE.is_match(message.trim())
}

/// Pattern-table lookup: every pattern first, then two keyword hits.
pub fn cached_topic(message: &str) -> Option<FaqTopic> {
    let lower = message.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    CACHED_ANSWERS
        .iter()
        .find(|row| row.pattern.is_match(&lower))
        .or_else(|| {
            CACHED_ANSWERS
                .iter()
                .find(|row| row.keywords.iter().filter(|kw| lower.contains(**kw)).count() >= 2)
        })
        .map(|row| row.topic)
}

fn classifier_prompt(question: &str) -> String {
    format!(
        "Classify this medspa question into ONE category. Respond with JSON only.\n\n\
         Categories:\n\
         - hydrafacial_vs_diamondglow: Comparing HydraFacial and DiamondGlow facials\n\
         - hylenex_vs_fillers: Comparing Hylenex/filler dissolving with dermal fillers (NOT about Botox)\n\
         - botox_vs_fillers: Comparing Botox/neurotoxins with dermal fillers (NOT about dissolving)\n\
         - peel_vs_microneedling: Comparing chemical peels with microneedling\n\
         - laser_hair_sessions: How many laser hair removal sessions are needed\n\
         - botox_duration: How long Botox lasts\n\
         - filler_duration: How long fillers last\n\
         - other: Anything else (booking, pricing, specific treatments, general questions)\n\n\
         \"Hylenex\", \"filler dissolve\" or \"dissolving fillers\" is hylenex_vs_fillers. \
         Use botox_vs_fillers only when the question names Botox, Dysport or Xeomin.\n\n\
         Question: {question}\n\n\
         Respond with: {{\"category\": \"<category_name>\"}}"
    )
}

#[derive(Deserialize)]
struct Classification {
    category: String,
}

/// Reads the classifier answer. Anything unparseable or unknown is "other".
pub fn parse_topic(raw: &str) -> Option<FaqTopic> {
    let text = strip_fences(raw);
    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    };
    let parsed: Classification = serde_json::from_str(json).ok()?;
    FaqTopic::from_str(parsed.category.trim()).ok()
}

#[derive(Debug, Clone)]
pub struct FaqSettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for FaqSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 50,
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct FaqResponder {
    llm: MeteredLlm,
    settings: FaqSettings,
}

impl FaqResponder {
    pub fn new(llm: MeteredLlm, settings: FaqSettings) -> Self {
        Self { llm, settings }
    }

    /// A canned answer for a comparison question, or `None` to let the reply
    /// model handle it. Errors only when the turn deadline has expired.
    pub async fn answer(
        &self,
        message: &str,
        deadline: &Deadline,
    ) -> Result<Option<Shortcut>, ConciergeError> {
        if !is_comparison_question(message) {
            return Ok(None);
        }
        let classified = match self.classify(message, deadline).await {
            Ok(topic) => topic,
            Err(e @ ConciergeError::Timeout { .. }) if deadline.expired() => return Err(e),
            Err(e) => {
                warn!(error = %e, "faq classification failed, trying patterns");
                None
            }
        };
        let (topic, source) = match classified {
            Some(topic) => (topic, "classifier"),
            None => match cached_topic(message) {
                Some(topic) => (topic, "patterns"),
                None => {
                    debug!("no canned answer for comparison question");
                    return Ok(None);
                }
            },
        };
        info!(%topic, source, "answered with canned faq reply");
        Ok(Some(Shortcut {
            reply: topic.reply().to_string(),
            note: None,
        }))
    }

    async fn classify(
        &self,
        message: &str,
        deadline: &Deadline,
    ) -> Result<Option<FaqTopic>, ConciergeError> {
        let request = LlmRequest {
            model: self.settings.model.clone(),
            system_prompts: Vec::new(),
            messages: vec![Message::user(classifier_prompt(message.trim()))],
            max_tokens: self.settings.max_tokens,
            temperature: 0.0,
        };
        let response = self
            .llm
            .complete(request, deadline.budget(self.settings.timeout))
            .await?;
        Ok(parse_topic(&response.text))
    }
}
