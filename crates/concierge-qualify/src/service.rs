// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service interest matching.
//!
//! Clinic aliases are consulted first. The universal table is ordered so that
//! specific treatments appear before the generic words they contain (for
//! example "filler dissolve" before "lip filler" before "filler").

use std::collections::BTreeMap;
use std::sync::LazyLock;

use concierge_core::ClinicConfig;
use regex::Regex;

/// `(substring, canonical service)` pairs, checked in order.
const UNIVERSAL_SERVICES: &[(&str, &str)] = &[
    ("filler dissolve", "filler dissolve"),
    ("dissolve filler", "filler dissolve"),
    ("dissolve", "filler dissolve"),
    ("hylenex", "filler dissolve"),
    ("mini lip filler", "mini lip filler"),
    ("mini lip", "mini lip filler"),
    ("half syringe lip", "mini lip filler"),
    ("dermal filler", "dermal filler"),
    ("lip filler", "lip filler"),
    ("lip injection", "lip filler"),
    ("lip augmentation", "lip filler"),
    ("cheek filler", "cheek filler"),
    ("jawline filler", "jawline filler"),
    ("chin filler", "chin filler"),
    ("under eye filler", "under eye filler"),
    ("tear trough", "tear trough filler"),
    ("radiesse", "radiesse"),
    ("skinvive", "skinvive"),
    ("perfect derma peel", "Perfect Derma Peel"),
    ("chemical peel", "chemical peel"),
    ("vi peel", "VI Peel"),
    ("weight loss consultation", "weight loss consultation"),
    ("semaglutide", "semaglutide"),
    ("weight loss", "weight loss"),
    ("lose weight", "weight loss"),
    ("losing weight", "weight loss"),
    ("tirzepatide", "tirzepatide"),
    ("ozempic", "weight loss"),
    ("wegovy", "weight loss"),
    ("mounjaro", "weight loss"),
    ("glp-1", "weight loss"),
    ("tixel full face and neck", "tixel - full face & neck"),
    ("tixel face and neck", "tixel - full face & neck"),
    ("tixel full face", "tixel - full face"),
    ("tixel face", "tixel - full face"),
    ("tixel decollete", "tixel - decollete"),
    ("tixel chest", "tixel - decollete"),
    ("tixel neck", "tixel - neck"),
    ("tixel eye", "tixel - around the eyes"),
    ("tixel mouth", "tixel - around the mouth"),
    ("tixel arm", "tixel - upper arms"),
    ("tixel hand", "tixel - hands"),
    ("tixel", "tixel"),
    ("laser hair removal", "laser hair removal"),
    ("hair removal", "laser hair removal"),
    ("ipl face", "ipl - full face"),
    ("ipl neck", "ipl - neck"),
    ("ipl chest", "ipl - chest"),
    ("photofacial", "ipl"),
    ("ipl", "ipl"),
    ("tattoo removal", "tattoo removal"),
    ("tattoo", "tattoo removal"),
    ("vascular lesion", "vascular lesion removal"),
    ("spider vein", "vascular lesion removal"),
    ("ablative erbium", "ablative erbium laser resurfacing"),
    ("fractional erbium", "fractional erbium laser resurfacing"),
    ("erbium", "erbium laser resurfacing"),
    ("laser resurfacing", "laser resurfacing"),
    ("under eye treatment", "pbf under eye treatment"),
    ("pbf under eye", "pbf under eye treatment"),
    ("pdo thread", "PDO threads"),
    ("thread lift", "thread lift"),
    ("microneedling with prp", "microneedling with prp"),
    ("microneedling", "microneedling"),
    ("prp", "PRP"),
    ("vampire facial", "PRP facial"),
    ("hydrafacial", "HydraFacial"),
    ("salmon dna facial", "salmon dna facial"),
    ("salmon facial", "salmon dna facial"),
    ("laser treatment", "laser treatment"),
    ("laser hair", "laser hair removal"),
    ("jeuveau", "Jeuveau"),
    ("dysport", "Dysport"),
    ("xeomin", "Xeomin"),
    ("lip flip", "Botox"),
    ("fix my 11s", "Botox"),
    ("fix my elevens", "Botox"),
    ("my 11s", "Botox"),
    ("eleven lines", "Botox"),
    ("11 lines", "Botox"),
    ("frown lines", "Botox"),
    ("forehead lines", "Botox"),
    ("brow lift", "Botox"),
    ("bunny lines", "Botox"),
    ("crow's feet", "Botox"),
    ("crows feet", "Botox"),
    ("botox", "Botox"),
    ("kybella", "kybella"),
    ("double chin", "kybella"),
    ("b12 shot", "b12 shot"),
    ("b12", "b12 shot"),
    ("vitamin injection", "b12 shot"),
    ("nad+", "nad+"),
    ("nad", "nad+"),
    ("filler", "filler"),
    ("consultation", "consultation"),
    ("facial", "facial"),
    ("peel", "peel"),
    ("laser", "laser"),
    ("injectable", "injectables"),
    ("wrinkle", "wrinkle treatment"),
    ("anti-aging", "anti-aging treatment"),
];

struct PastService {
    pattern: Regex,
    name: &'static str,
}

/// Treatments a returning patient mentions having had.
static PAST_SERVICES: LazyLock<Vec<PastService>> = LazyLock::new(|| {
    [
        (r"(?:had|got|did)\s+(?:some\s+)?botox", "Botox"),
        (r"(?:had|got|did)\s+(?:some\s+)?filler", "filler"),
        (r"(?:had|got)\s+(?:my\s+)?lips?", "lip filler"),
        (r"(?:had|got)\s+(?:a\s+)?hydrafacial", "HydraFacial"),
        (r"(?:had|got|did)\s+(?:a\s+)?facial", "facial"),
        (r"(?:had|did)\s+(?:the\s+)?weight loss", "weight loss"),
        (r"(?:had|did)\s+semaglutide", "semaglutide"),
        (r"(?:had|got)\s+(?:a\s+)?laser", "laser"),
        (r"(?:had|got)\s+microneedling", "microneedling"),
        (r"(?:had|got)\s+(?:a\s+)?peel", "peel"),
        (r"(?:had|got)\s+prp", "PRP"),
        (r"(?:had|got)\s+dysport", "Dysport"),
        (r"(?:had|got)\s+jeuveau", "Jeuveau"),
        (r"(?:had|got)\s+xeomin", "Xeomin"),
    ]
    .into_iter()
    .map(|(p, name)| PastService {
        pattern: Regex::new(&format!(r"(?i)\b{p}\b")).unwrap(),
        name,
    })
    .collect()
});

/// Clinic alias pairs lowercased and ordered longest first, ties alphabetical.
pub fn sorted_aliases(aliases: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = aliases
        .iter()
        .filter(|(k, _)| !k.trim().is_empty())
        .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
        .collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    pairs
}

/// First service named in `text_lower`, clinic aliases first.
pub fn match_service(text_lower: &str, aliases: &[(String, String)]) -> Option<String> {
    aliases
        .iter()
        .find(|(alias, _)| text_lower.contains(alias.as_str()))
        .map(|(_, service)| service.clone())
        .or_else(|| {
            UNIVERSAL_SERVICES
                .iter()
                .find(|(pattern, _)| text_lower.contains(pattern))
                .map(|(_, service)| (*service).to_string())
        })
}

/// Services a returning patient reports having had, deduplicated.
pub fn extract_past_services(user_text_lower: &str) -> String {
    let mut found: Vec<&str> = Vec::new();
    for past in PAST_SERVICES.iter() {
        if past.pattern.is_match(user_text_lower)
            && !found.iter().any(|f| f.eq_ignore_ascii_case(past.name))
        {
            found.push(past.name);
        }
    }
    found.join(", ")
}

/// Generic treatment words every clinic is assumed to offer.
const GENERIC_SERVICE_KEYS: &[&str] = &[
    "botox",
    "filler",
    "dermal filler",
    "consultation",
    "laser",
    "facial",
    "peel",
    "microneedling",
];

/// Configured service named in a single message, resolved through the
/// clinic's aliases and lowercased.
///
/// Candidates are the priced services, services with a deposit override,
/// the service list, then the generic keys. Longer candidates are tried first.
pub fn detect_service_key(message: &str, cfg: &ClinicConfig) -> Option<String> {
    let message = message.to_lowercase();
    if message.trim().is_empty() {
        return None;
    }
    let mut candidates: Vec<String> = cfg
        .service_price_text
        .keys()
        .chain(cfg.service_deposit_amount_cents.keys())
        .chain(cfg.services.iter())
        .map(|k| k.trim().to_lowercase())
        .chain(GENERIC_SERVICE_KEYS.iter().map(|k| (*k).to_string()))
        .filter(|k| !k.is_empty())
        .collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    candidates.dedup();

    let key = candidates.into_iter().find(|k| message.contains(k.as_str()))?;
    Some(
        cfg.service_aliases
            .get(&key)
            .map(|resolved| resolved.to_lowercase())
            .unwrap_or(key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universal(text: &str) -> Option<String> {
        match_service(text, &[])
    }

    #[test]
    fn specific_before_generic() {
        assert_eq!(universal("can you dissolve my filler").as_deref(), Some("filler dissolve"));
        assert_eq!(universal("i want lip filler").as_deref(), Some("lip filler"));
        assert_eq!(universal("need some filler").as_deref(), Some("filler"));
        assert_eq!(universal("dysport for my forehead").as_deref(), Some("Dysport"));
        assert_eq!(universal("help with crow's feet").as_deref(), Some("Botox"));
        assert_eq!(universal("tixel face and neck please").as_deref(), Some("tixel - full face & neck"));
        assert_eq!(universal("just saying hello"), None);
    }

    #[test]
    fn aliases_win_and_longest_first() {
        let mut map = BTreeMap::new();
        map.insert("tox".to_string(), "Neurotoxin".to_string());
        map.insert("lip tox".to_string(), "Lip Flip".to_string());
        map.insert("Filler".to_string(), "Juvederm".to_string());
        let aliases = sorted_aliases(&map);
        assert_eq!(aliases[0].0, "lip tox");
        assert_eq!(match_service("want lip tox", &aliases).as_deref(), Some("Lip Flip"));
        assert_eq!(match_service("some botox", &aliases).as_deref(), Some("Neurotoxin"));
        assert_eq!(match_service("lip filler please", &aliases).as_deref(), Some("Juvederm"));
    }

    #[test]
    fn service_key_from_clinic_lists() {
        let mut cfg = ClinicConfig::new("org", "Glow");
        cfg.services = vec!["Lip Filler".to_string(), "HydraFacial".to_string()];
        cfg.service_aliases
            .insert("lip filler".to_string(), "Juvederm Lips".to_string());
        assert_eq!(
            detect_service_key("how much is lip filler?", &cfg).as_deref(),
            Some("juvederm lips")
        );
        assert_eq!(detect_service_key("hydrafacial price", &cfg).as_deref(), Some("hydrafacial"));
        assert_eq!(detect_service_key("botox cost", &cfg).as_deref(), Some("botox"));
        assert_eq!(detect_service_key("hello", &cfg), None);
    }

    #[test]
    fn past_services_dedup() {
        assert_eq!(
            extract_past_services("i had botox last year and got some filler. had botox again"),
            "Botox, filler"
        );
        assert_eq!(extract_past_services("first visit"), "");
    }
}
