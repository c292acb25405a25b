// Language detector (component C). Synchronous, no I/O — pure dictionary and
// char-class lookups over static tables, in the teacher's const-slice idiom
// (cf. `workers/cot.rs`'s `ARCHETYPES`). Decision cascade per original
// source's `language_detection_service.py`: dictionary probe first, then
// Cyrillic-priority char counting, then pattern heuristics, then an optional
// external-detector mapping, then a fallback. First step to produce a result
// wins.

use crate::dictionaries::{is_given_name, RU_ROMANIZED_CUES, UK_ROMANIZED_CUES};
use crate::types::{DetectionMethod, Language, LanguageDetection};

const UK_ONLY_CHARS: &[char] = &['і', 'ї', 'є', 'ґ', 'І', 'Ї', 'Є', 'Ґ'];
const RU_ONLY_CHARS: &[char] = &['ё', 'ъ', 'ы', 'э', 'Ё', 'Ъ', 'Ы', 'Э'];

/// Function words/digraphs used as a secondary tiebreak when Cyrillic text
/// carries no script-exclusive characters (step 2's "general Cyrillic"
/// branch) and as the step-3 pattern-heuristic scoreboard.
const UK_FUNCTION_WORDS: &[&str] = &["від", "та", "або", "це", "й", "із"];
const RU_FUNCTION_WORDS: &[&str] = &["от", "и", "или", "это", "из"];

/// Maps an external detector's ISO label onto our closed language set
/// (step 4). Unknown labels fall through to the step-5 fallback.
pub fn map_external_label(label: &str) -> Option<Language> {
    match label {
        "uk" => Some(Language::Uk),
        "ru" | "be" | "bg" | "mk" | "sr" => Some(Language::Ru),
        "en" => Some(Language::En),
        _ => None,
    }
}

fn tokenize_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn dictionary_probe(words: &[String]) -> Option<LanguageDetection> {
    use crate::dictionaries::{RU_GIVEN_NAMES, UK_GIVEN_NAMES};

    let uk_hits = words.iter().filter(|w| UK_GIVEN_NAMES.iter().any(|(n, _)| n == w.as_str())).count();
    let ru_hits = words.iter().filter(|w| RU_GIVEN_NAMES.iter().any(|(n, _)| n == w.as_str())).count();
    let any_hit = words.iter().any(|w| is_given_name(w).is_some());

    if !any_hit {
        return None;
    }
    if uk_hits > 0 {
        return Some(LanguageDetection { language: Language::Uk, confidence: 0.95, method: DetectionMethod::Dictionary });
    }
    if ru_hits > 0 {
        return Some(LanguageDetection { language: Language::Ru, confidence: 0.90, method: DetectionMethod::Dictionary });
    }
    Some(LanguageDetection { language: Language::En, confidence: 0.85, method: DetectionMethod::Dictionary })
}

fn cyrillic_priority(text: &str) -> Option<LanguageDetection> {
    let uk_count = text.chars().filter(|c| UK_ONLY_CHARS.contains(c)).count();
    let ru_count = text.chars().filter(|c| RU_ONLY_CHARS.contains(c)).count();

    if uk_count > 0 {
        let confidence = (0.80 + 0.10 * uk_count as f32).min(0.98);
        return Some(LanguageDetection { language: Language::Uk, confidence, method: DetectionMethod::CyrillicPriority });
    }
    if ru_count > 0 {
        return Some(LanguageDetection { language: Language::Ru, confidence: 0.90, method: DetectionMethod::CyrillicPriority });
    }

    // general Cyrillic, no script-exclusive char: tiebreak by stop-word count
    let has_general_cyrillic = text.chars().any(|c| ('а'..='я').contains(&c) || ('А'..='Я').contains(&c));
    if has_general_cyrillic {
        let lower = text.to_lowercase();
        let uk_words = UK_FUNCTION_WORDS.iter().filter(|w| lower.contains(*w)).count();
        let ru_words = RU_FUNCTION_WORDS.iter().filter(|w| lower.contains(*w)).count();
        if uk_words > ru_words {
            return Some(LanguageDetection { language: Language::Uk, confidence: 0.70, method: DetectionMethod::CyrillicPriority });
        }
        if ru_words > uk_words {
            return Some(LanguageDetection { language: Language::Ru, confidence: 0.70, method: DetectionMethod::CyrillicPriority });
        }
        // truly ambiguous general-Cyrillic text with no stop-word signal at
        // all: default Russian, the broader of the two Cyrillic branches.
        return Some(LanguageDetection { language: Language::Ru, confidence: 0.55, method: DetectionMethod::CyrillicPriority });
    }
    None
}

fn pattern_heuristics(text: &str) -> Option<LanguageDetection> {
    let lower = text.to_lowercase();
    let uk_score = UK_ROMANIZED_CUES.iter().filter(|c| lower.contains(*c)).count()
        + UK_FUNCTION_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let ru_score = RU_ROMANIZED_CUES.iter().filter(|c| lower.contains(*c)).count()
        + RU_FUNCTION_WORDS.iter().filter(|w| lower.contains(*w)).count();

    if uk_score == 0 && ru_score == 0 {
        return None;
    }
    if uk_score >= ru_score {
        Some(LanguageDetection { language: Language::Uk, confidence: 0.65, method: DetectionMethod::PatternHeuristic })
    } else {
        Some(LanguageDetection { language: Language::Ru, confidence: 0.65, method: DetectionMethod::PatternHeuristic })
    }
}

fn fallback(text: &str) -> LanguageDetection {
    let has_cyrillic = text.chars().any(|c| ('а'..='я').contains(&c) || ('А'..='Я').contains(&c));
    let has_latin = text.chars().any(|c| c.is_ascii_alphabetic());
    let language = if has_cyrillic {
        Language::Ru
    } else if has_latin {
        Language::En
    } else {
        Language::En
    };
    LanguageDetection { language, confidence: 0.5, method: DetectionMethod::Fallback }
}

/// Run the full cascade. `external_label` is an optional ISO label from an
/// external detector (step 4); pass `None` when none is wired up.
pub fn detect(text: &str, external_label: Option<&str>) -> LanguageDetection {
    let words = tokenize_words(text);

    let result = if let Some(d) = dictionary_probe(&words) {
        d
    } else if let Some(d) = cyrillic_priority(text) {
        d
    } else if let Some(d) = pattern_heuristics(text) {
        d
    } else if let Some(language) = external_label.and_then(map_external_label) {
        LanguageDetection { language, confidence: 0.80, method: DetectionMethod::External }
    } else {
        fallback(text)
    };

    // The dictionary probe (step 1) scores per-word and can be outvoted by a
    // Russian given name elsewhere in the phrase even when a different word
    // carries a Ukrainian-exclusive character (e.g. "Петрів Сергей" — "Сергей"
    // is a dictionary hit for `ru`, but "Петрів" contains "і"). The spec's
    // invariant that a Ukrainian-only character is never classified as
    // Russian is absolute, so it overrides any earlier step's answer here
    // rather than only being checked within step 2.
    if result.language != Language::Uk && text.chars().any(|c| UK_ONLY_CHARS.contains(&c)) {
        let uk_count = text.chars().filter(|c| UK_ONLY_CHARS.contains(c)).count();
        return LanguageDetection {
            language: Language::Uk,
            confidence: (0.80 + 0.10 * uk_count as f32).min(0.98),
            method: DetectionMethod::CyrillicPriority,
        };
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ukrainian_specific_char_is_never_russian() {
        for text in ["Ґрунт", "Їжак", "Із Києва", "Єдність"] {
            let d = detect(text, None);
            assert_eq!(d.language, Language::Uk, "failed for {text}");
        }
    }

    #[test]
    fn ukrainian_char_outvotes_a_russian_dictionary_hit_elsewhere_in_the_phrase() {
        // "Сергей" is a dictionary hit for `ru`; "Петрів" carries "і" and is
        // not itself a recognized given name, so the per-word dictionary
        // probe alone would side with `ru`. The invariant must still win.
        let d = detect("Петрів Сергей", None);
        assert_eq!(d.language, Language::Uk);
    }

    #[test]
    fn dictionary_hit_wins_over_char_counting() {
        let d = detect("Петро", None);
        assert_eq!(d.language, Language::Uk);
        assert_eq!(d.method, DetectionMethod::Dictionary);
    }

    #[test]
    fn russian_only_char_without_ukrainian_is_russian() {
        let d = detect("Сергёв", None);
        assert_eq!(d.language, Language::Ru);
    }

    #[test]
    fn latin_only_falls_back_to_english() {
        let d = detect("Smith Corp", None);
        assert_eq!(d.language, Language::En);
        assert_eq!(d.method, DetectionMethod::Fallback);
    }

    #[test]
    fn romanized_payment_cue_detected_as_pattern_heuristic() {
        let d = detect("oplata vid petro poroshenko", None);
        assert_eq!(d.language, Language::Uk);
    }

    #[test]
    fn external_label_maps_through_mapping_table() {
        assert_eq!(map_external_label("be"), Some(Language::Ru));
        assert_eq!(map_external_label("uk"), Some(Language::Uk));
        assert_eq!(map_external_label("fr"), None);
    }

    proptest::proptest! {
        /// Spec-testable property: any text containing at least one
        /// Ukrainian-only character is detected as `uk`, regardless of what
        /// else surrounds it.
        #[test]
        fn any_text_carrying_a_ukrainian_only_char_detects_as_uk(
            prefix in "[a-zA-Zа-яА-Я ]{0,12}",
            suffix in "[a-zA-Zа-яА-Я ]{0,12}",
            uk_char in proptest::prelude::any::<bool>().prop_map(|pick_first| {
                if pick_first { 'і' } else { 'ґ' }
            }),
        ) {
            let text = format!("{prefix}{uk_char}{suffix}");
            let d = detect(&text, None);
            proptest::prop_assert_eq!(d.language, Language::Uk);
        }
    }
}
