// Variant generator (component F) — bounded, time-boxed, categorized and
// capped. Grounded on original source's `_basic_transliterate` /
// `_apply_regional_transliteration` char-map idiom, re-expressed through the
// static tables in `dictionaries::translit`/`dictionaries::phonetic`, and on
// the teacher's deadline-check loop style (`Instant`-based cutoffs appear
// throughout the workers, e.g. `timing_cluster.rs`'s bucket-window scans).

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::dictionaries::{
    adjacent_keys, diminutive_to_lemma, transliterate, TranslitStandard, DIMINUTIVES,
    PHONETIC_ALTERNATIONS, VISUAL_CONFUSABLES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantCategory {
    Transliteration,
    Morphological,
    Phonetic,
    Visual,
    Typo,
    WordOrder,
}

impl VariantCategory {
    /// Relative weight used to allocate slots when the raw generated set
    /// exceeds `max_variants` (spec §4.F prioritization).
    fn weight(self) -> f32 {
        match self {
            VariantCategory::Transliteration => 0.30,
            VariantCategory::Morphological   => 0.25,
            VariantCategory::Phonetic        => 0.15,
            VariantCategory::Typo            => 0.15,
            VariantCategory::WordOrder       => 0.10,
            VariantCategory::Visual          => 0.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedVariant {
    pub text:     String,
    pub category: VariantCategory,
}

pub struct VariantLimits {
    pub max_variants: usize,
    pub max_time_ms:  u64,
    pub max_typos:    usize,
}

impl Default for VariantLimits {
    fn default() -> Self {
        Self { max_variants: 50, max_time_ms: 100, max_typos: 2 }
    }
}

fn is_name_shaped(token: &str) -> bool {
    token.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

fn transliteration_variants(token: &str) -> Vec<GeneratedVariant> {
    TranslitStandard::ALL.iter()
        .map(|std| GeneratedVariant {
            text: transliterate(token, *std),
            category: VariantCategory::Transliteration,
        })
        .collect()
}

fn morphological_variants(token: &str) -> Vec<GeneratedVariant> {
    let lower = token.to_lowercase();
    let mut out = Vec::new();
    if let Some(lemma) = diminutive_to_lemma(&lower) {
        out.push(GeneratedVariant { text: lemma.to_string(), category: VariantCategory::Morphological });
    }
    for (dim, lemma) in DIMINUTIVES {
        if *lemma == lower {
            out.push(GeneratedVariant { text: dim.to_string(), category: VariantCategory::Morphological });
        }
    }
    out
}

fn phonetic_variants(token: &str) -> Vec<GeneratedVariant> {
    let lower = token.to_lowercase();
    let mut out = Vec::new();
    for (canonical, alternate) in PHONETIC_ALTERNATIONS {
        if lower.contains(canonical) {
            out.push(GeneratedVariant {
                text: lower.replacen(canonical, alternate, 1),
                category: VariantCategory::Phonetic,
            });
        }
        if lower.contains(alternate) {
            out.push(GeneratedVariant {
                text: lower.replacen(alternate, canonical, 1),
                category: VariantCategory::Phonetic,
            });
        }
    }
    out
}

fn visual_variants(token: &str) -> Vec<GeneratedVariant> {
    let mut out = Vec::new();
    let chars: Vec<char> = token.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let lower = c.to_ascii_lowercase();
        if let Some(&(_, cy)) = VISUAL_CONFUSABLES.iter().find(|(latin, _)| *latin == lower) {
            let mut spoofed: Vec<char> = chars.clone();
            spoofed[i] = cy;
            out.push(GeneratedVariant { text: spoofed.into_iter().collect(), category: VariantCategory::Visual });
        }
    }
    out
}

fn typo_variants(token: &str, max_typos: usize, deadline: Instant) -> Vec<GeneratedVariant> {
    let mut out = Vec::new();
    let chars: Vec<char> = token.chars().collect();

    // single-character adjacency substitutions
    'outer: for (i, &c) in chars.iter().enumerate() {
        if Instant::now() >= deadline { break; }
        for adj in adjacent_keys(c) {
            if out.len() >= max_typos * chars.len().max(1) { break 'outer; }
            let mut variant = chars.clone();
            variant[i] = adj;
            out.push(GeneratedVariant {
                text: variant.into_iter().collect(),
                category: VariantCategory::Typo,
            });
        }
    }

    // repeated-letter patterns (double a single char, or collapse a double)
    for (i, &c) in chars.iter().enumerate() {
        if Instant::now() >= deadline { break; }
        let mut doubled = chars.clone();
        doubled.insert(i, c);
        out.push(GeneratedVariant { text: doubled.into_iter().collect(), category: VariantCategory::Typo });
    }
    for i in 0..chars.len().saturating_sub(1) {
        if chars[i] == chars[i + 1] {
            let mut collapsed = chars.clone();
            collapsed.remove(i);
            out.push(GeneratedVariant { text: collapsed.into_iter().collect(), category: VariantCategory::Typo });
        }
    }

    out.truncate(max_typos.max(1) * 4);
    out
}

/// 2-4 capitalized tokens: given<->surname swap, "Last First Middle", and a
/// comma-formal form. Skipped if any token is not name-shaped.
fn word_order_variants(tokens: &[String]) -> Vec<GeneratedVariant> {
    if tokens.len() < 2 || tokens.len() > 4 || !tokens.iter().all(|t| is_name_shaped(t)) {
        return Vec::new();
    }
    let mut out = Vec::new();

    if tokens.len() == 2 {
        out.push(GeneratedVariant {
            text: format!("{} {}", tokens[1], tokens[0]),
            category: VariantCategory::WordOrder,
        });
        out.push(GeneratedVariant {
            text: format!("{}, {}", tokens[1], tokens[0]),
            category: VariantCategory::WordOrder,
        });
    } else {
        // Last First Middle(s)
        let mut reordered = vec![tokens[tokens.len() - 1].clone()];
        reordered.extend_from_slice(&tokens[..tokens.len() - 1]);
        out.push(GeneratedVariant { text: reordered.join(" "), category: VariantCategory::WordOrder });
        out.push(GeneratedVariant {
            text: format!("{}, {}", tokens[tokens.len() - 1], tokens[..tokens.len() - 1].join(" ")),
            category: VariantCategory::WordOrder,
        });
    }
    out
}

/// Generate the bounded, per-token variant set for one canonical token.
/// Time-boxed via `max_time_ms`; short-circuits keeping whatever was
/// generated so far if the budget is exceeded (spec §4.F).
pub fn generate_for_token(token: &str, limits: &VariantLimits) -> HashSet<String> {
    let start = Instant::now();
    let deadline = start + Duration::from_millis(limits.max_time_ms);

    let mut all: Vec<GeneratedVariant> = Vec::new();
    all.extend(transliteration_variants(token));
    if Instant::now() < deadline { all.extend(morphological_variants(token)); }
    if Instant::now() < deadline { all.extend(phonetic_variants(token)); }
    if Instant::now() < deadline { all.extend(visual_variants(token)); }
    if Instant::now() < deadline { all.extend(typo_variants(token, limits.max_typos, deadline)); }

    cap_and_dedup(all, token, limits.max_variants)
}

/// Generate word-order variants for a full canonical phrase (operates on the
/// token list, not a single token — callers merge this into the per-token
/// variant maps under a synthetic key or surface the phrase-level set
/// separately, depending on how the orchestrator wants to expose it).
pub fn generate_word_order(tokens: &[String], limits: &VariantLimits) -> Vec<String> {
    let generated = word_order_variants(tokens);
    let capped = cap_and_dedup(generated, "", limits.max_variants);
    capped.into_iter().collect()
}

fn cap_and_dedup(variants: Vec<GeneratedVariant>, exclude: &str, max_variants: usize) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut by_category: Vec<(VariantCategory, String)> = Vec::new();
    for v in variants {
        if v.text == exclude || v.text.is_empty() {
            continue;
        }
        if seen.insert(v.text.clone()) {
            by_category.push((v.category, v.text));
        }
    }

    if by_category.len() <= max_variants {
        return by_category.into_iter().map(|(_, t)| t).collect();
    }

    // Weighted proportional allocation across categories, lowest-priority
    // (lowest weight) dropped first once the per-category quota is exceeded.
    let mut quotas: std::collections::HashMap<VariantCategory, usize> = std::collections::HashMap::new();
    let total_weight: f32 = [
        VariantCategory::Transliteration, VariantCategory::Morphological,
        VariantCategory::Phonetic, VariantCategory::Visual,
        VariantCategory::Typo, VariantCategory::WordOrder,
    ].iter().map(|c| c.weight()).sum();

    for cat in [
        VariantCategory::Transliteration, VariantCategory::Morphological,
        VariantCategory::Phonetic, VariantCategory::Visual,
        VariantCategory::Typo, VariantCategory::WordOrder,
    ] {
        let quota = ((cat.weight() / total_weight) * max_variants as f32).round() as usize;
        quotas.insert(cat, quota.max(1));
    }

    let mut out = HashSet::new();
    let mut taken: std::collections::HashMap<VariantCategory, usize> = std::collections::HashMap::new();
    for (cat, text) in by_category {
        let quota = *quotas.get(&cat).unwrap_or(&1);
        let count = taken.entry(cat).or_insert(0);
        if *count < quota && out.len() < max_variants {
            out.insert(text);
            *count += 1;
        }
        if out.len() >= max_variants {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliteration_variants_are_generated() {
        let limits = VariantLimits::default();
        let variants = generate_for_token("Петро", &limits);
        assert!(variants.iter().any(|v| v == "Petro"));
    }

    #[test]
    fn diminutive_lookup_roundtrips() {
        let limits = VariantLimits::default();
        let variants = generate_for_token("Вова", &limits);
        assert!(variants.iter().any(|v| v == "володимир"));
    }

    #[test]
    fn respects_max_variants_cap() {
        let limits = VariantLimits { max_variants: 5, max_time_ms: 100, max_typos: 5 };
        let variants = generate_for_token("Олександр", &limits);
        assert!(variants.len() <= 5);
    }

    #[test]
    fn word_order_swap_for_two_tokens() {
        let tokens = vec!["Petro".to_string(), "Poroshenko".to_string()];
        let limits = VariantLimits::default();
        let out = generate_word_order(&tokens, &limits);
        assert!(out.iter().any(|v| v == "Poroshenko Petro"));
    }

    #[test]
    fn word_order_skipped_for_non_name_tokens() {
        let tokens = vec!["payment".to_string(), "from".to_string()];
        let limits = VariantLimits::default();
        let out = generate_word_order(&tokens, &limits);
        assert!(out.is_empty());
    }
}
