// AC Pattern Builder & Matcher (component G).
//
// Builds one Aho-Corasick automaton per tier from the active watchlist and
// scans input text against all four, in the teacher's `cot_automaton()`/
// `domain_automaton()` idiom (`workers/cot.rs`): pattern text + label table
// built once, `AhoCorasickBuilder::new().ascii_case_insensitive(true)
// .match_kind(MatchKind::LeftmostFirst)`. The difference from the teacher is
// that our pattern set is derived from watchlist data at index-build time
// rather than hardcoded constants, so the automaton lives on `PatternIndex`
// instead of behind a `OnceLock` — it is rebuilt whenever the watchlist
// reloads (§6 "overlay reload").

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;
use std::sync::LazyLock;

use crate::dictionaries::{is_given_name, legal_form_stem, PAYMENT_CONTEXT_TRIGGERS};
use crate::types::{EntityType, Language, Pattern, PatternHit, ReasonCode, Tier, WatchlistDoc};

static DOC_NUMBER_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z]{2}\d{6}|\d{8}|\d{10}|[A-Z]{2}\d{2}[A-Z0-9]{10,30})$").unwrap()
});

/// Per-entity pattern filter (spec §4.G): below `min_confidence`, keep only
/// the shortest/most specific; never drop below `fallback_floor` patterns.
pub struct PatternFilterConfig {
    pub min_confidence:            f32,
    pub max_patterns_per_entity:   usize,
    pub require_context_for_surnames: bool,
    pub fallback_floor:            usize,
}

impl Default for PatternFilterConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.55,
            max_patterns_per_entity: 12,
            require_context_for_surnames: true,
            fallback_floor: 3,
        }
    }
}

fn is_doc_number_shaped(text: &str) -> bool {
    DOC_NUMBER_SHAPE.is_match(text) || (text.len() == 8 && text.chars().all(|c| c.is_ascii_digit()))
}

fn tier0_patterns(doc: &WatchlistDoc) -> Vec<Pattern> {
    let mut out = Vec::new();
    if let Some(edrpou) = &doc.metadata.edrpou {
        out.push(Pattern {
            text: edrpou.clone(), tier: Tier::T0, precision_hint: 0.97, source_confidence: 0.97,
            language: Language::Unknown, context_required: false,
            reason_code: ReasonCode::RcMetadataEdrpou, entity_id: doc.doc_id.clone(),
        });
    }
    if let Some(tax_id) = &doc.metadata.tax_id {
        out.push(Pattern {
            text: tax_id.clone(), tier: Tier::T0, precision_hint: 0.97, source_confidence: 0.97,
            language: Language::Unknown, context_required: false,
            reason_code: ReasonCode::RcMetadataTaxid, entity_id: doc.doc_id.clone(),
        });
    }
    for alias in &doc.metadata.aliases {
        if is_doc_number_shaped(alias) {
            out.push(Pattern {
                text: alias.clone(), tier: Tier::T0, precision_hint: 0.97, source_confidence: 0.97,
                language: Language::Unknown, context_required: false,
                reason_code: ReasonCode::RcDocnum, entity_id: doc.doc_id.clone(),
            });
        }
    }
    out
}

fn tier1_patterns(doc: &WatchlistDoc) -> Vec<Pattern> {
    let words: Vec<&str> = doc.text.split_whitespace().collect();
    let mut out = Vec::new();

    if words.len() >= 2 {
        out.push(Pattern {
            text: doc.text.clone(), tier: Tier::T1, precision_hint: 0.85, source_confidence: 0.85,
            language: Language::Unknown, context_required: true,
            reason_code: ReasonCode::RcExact, entity_id: doc.doc_id.clone(),
        });
    }
    // Single-token entity: the whole watchlist text already is the name, not
    // a fragment of one, so an exact match is unambiguous on its own and
    // doesn't need a payment-context trigger the way a bare surname would.
    if words.len() == 1 && doc.text.chars().count() >= 4 {
        out.push(Pattern {
            text: doc.text.clone(), tier: Tier::T1, precision_hint: 0.97, source_confidence: 0.97,
            language: Language::Unknown, context_required: false,
            reason_code: ReasonCode::RcExact, entity_id: doc.doc_id.clone(),
        });
    }
    if doc.entity_type == EntityType::Org {
        for w in &words {
            if legal_form_stem(&w.to_lowercase()).is_some() {
                out.push(Pattern {
                    text: doc.text.clone(), tier: Tier::T1, precision_hint: 0.90, source_confidence: 0.90,
                    language: Language::Unknown, context_required: false,
                    reason_code: ReasonCode::RcLegalform, entity_id: doc.doc_id.clone(),
                });
                break;
            }
        }
    }
    out
}

fn tier2_patterns(doc: &WatchlistDoc) -> Vec<Pattern> {
    let words: Vec<&str> = doc.text.split_whitespace().collect();
    let mut out = Vec::new();

    // "Surname I." / "I. Surname" structured-initial forms.
    if words.len() == 2 {
        let (a, b) = (words[0], words[1]);
        if a.chars().count() > 2 && b.chars().count() <= 2 {
            if let Some(initial) = b.chars().next() {
                out.push(Pattern {
                    text: format!("{a} {initial}"), tier: Tier::T2, precision_hint: 0.65,
                    source_confidence: 0.65, language: Language::Unknown, context_required: false,
                    reason_code: ReasonCode::RcInitials, entity_id: doc.doc_id.clone(),
                });
                out.push(Pattern {
                    text: format!("{initial} {a}"), tier: Tier::T2, precision_hint: 0.65,
                    source_confidence: 0.65, language: Language::Unknown, context_required: false,
                    reason_code: ReasonCode::RcInitials, entity_id: doc.doc_id.clone(),
                });
            }
        }
    }
    // standalone dictionary given name, high confidence only when it's the
    // whole watchlist text (single-token entity) rather than a fragment.
    if words.len() == 1 && is_given_name(&words[0].to_lowercase()).is_some() {
        out.push(Pattern {
            text: words[0].to_string(), tier: Tier::T2, precision_hint: 0.65,
            source_confidence: 0.65, language: Language::Unknown, context_required: true,
            reason_code: ReasonCode::RcExact, entity_id: doc.doc_id.clone(),
        });
    }
    out
}

fn tier3_patterns(doc: &WatchlistDoc) -> Vec<Pattern> {
    let mut out = Vec::new();
    for word in doc.text.split_whitespace() {
        if word.chars().count() >= 4 {
            out.push(Pattern {
                text: word.to_string(), tier: Tier::T3, precision_hint: 0.55, source_confidence: 0.55,
                language: Language::Unknown, context_required: true,
                reason_code: ReasonCode::RcPhonetic, entity_id: doc.doc_id.clone(),
            });
        }
    }
    out
}

/// Apply the per-entity filter: drop below `min_confidence` unless doing so
/// would take an entity below `fallback_floor` patterns.
fn filter_patterns(mut patterns: Vec<Pattern>, cfg: &PatternFilterConfig) -> Vec<Pattern> {
    use std::collections::HashMap;

    let mut by_entity: HashMap<String, Vec<Pattern>> = HashMap::new();
    for p in patterns.drain(..) {
        by_entity.entry(p.entity_id.clone()).or_default().push(p);
    }

    let mut out = Vec::new();
    for (_, mut group) in by_entity {
        group.sort_by(|a, b| {
            b.precision_hint.partial_cmp(&a.precision_hint).unwrap()
                .then(a.text.len().cmp(&b.text.len()))
        });

        let above_floor: Vec<Pattern> = group.iter()
            .filter(|p| p.source_confidence >= cfg.min_confidence)
            .cloned()
            .collect();

        let mut kept = if above_floor.len() >= cfg.fallback_floor {
            above_floor
        } else {
            group.clone()
        };
        kept.truncate(cfg.max_patterns_per_entity);
        out.extend(kept);
    }
    out
}

pub struct PatternIndex {
    patterns:  Vec<Pattern>,
    automatons: [Option<AhoCorasick>; 4],
}

impl PatternIndex {
    pub fn build(docs: &[WatchlistDoc], cfg: &PatternFilterConfig) -> Self {
        let mut raw = Vec::new();
        for doc in docs {
            raw.extend(tier0_patterns(doc));
            raw.extend(tier1_patterns(doc));
            raw.extend(tier2_patterns(doc));
            raw.extend(tier3_patterns(doc));
        }
        let patterns = filter_patterns(raw, cfg);

        let mut automatons: [Option<AhoCorasick>; 4] = [None, None, None, None];
        for tier_idx in 0..4 {
            let tier = match tier_idx {
                0 => Tier::T0, 1 => Tier::T1, 2 => Tier::T2, _ => Tier::T3,
            };
            let texts: Vec<&str> = patterns.iter()
                .filter(|p| p.tier == tier)
                .map(|p| p.text.as_str())
                .collect();
            if !texts.is_empty() {
                automatons[tier_idx] = AhoCorasickBuilder::new()
                    .ascii_case_insensitive(true)
                    .match_kind(MatchKind::LeftmostFirst)
                    .build(&texts)
                    .ok();
            }
        }

        Self { patterns, automatons }
    }

    pub fn len(&self) -> usize { self.patterns.len() }
    pub fn is_empty(&self) -> bool { self.patterns.is_empty() }

    fn patterns_for_tier(&self, tier: Tier) -> Vec<&Pattern> {
        self.patterns.iter().filter(|p| p.tier == tier).collect()
    }

    /// Scan `text` against every tier whose automaton is non-empty, honoring
    /// the 20-char context-trigger window for `context_required` patterns.
    pub fn scan(&self, text: &str) -> Vec<PatternHit> {
        let mut hits = Vec::new();
        for (idx, tier) in [Tier::T0, Tier::T1, Tier::T2, Tier::T3].into_iter().enumerate() {
            let Some(ac) = &self.automatons[idx] else { continue };
            let tier_patterns = self.patterns_for_tier(tier);
            for m in ac.find_iter(text) {
                let pattern_idx = m.pattern().as_usize();
                let Some(pattern) = tier_patterns.get(pattern_idx) else { continue };
                if pattern.context_required && !has_context_trigger(text, m.start(), m.end()) {
                    continue;
                }
                hits.push(PatternHit {
                    pattern: (*pattern).clone(),
                    matched_text: text[m.start()..m.end()].to_string(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
        hits
    }
}

/// Trigger fires if a payment-context word exists within a 20-char window
/// around the match (spec §4.G matcher contract).
fn has_context_trigger(text: &str, start: usize, end: usize) -> bool {
    let mut window_start = start.saturating_sub(20);
    while window_start > 0 && !text.is_char_boundary(window_start) {
        window_start -= 1;
    }
    let mut window_end = (end + 20).min(text.len());
    while window_end < text.len() && !text.is_char_boundary(window_end) {
        window_end += 1;
    }
    let window = text[window_start..window_end].to_lowercase();
    PAYMENT_CONTEXT_TRIGGERS.iter().any(|t| window.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WatchlistMetadata;

    fn doc(id: &str, text: &str, entity_type: EntityType) -> WatchlistDoc {
        WatchlistDoc {
            doc_id: id.to_string(), text: text.to_string(), entity_type,
            metadata: WatchlistMetadata::default(),
        }
    }

    #[test]
    fn tier0_matches_edrpou_without_context() {
        let mut d = doc("e1", "Alfa Group", EntityType::Org);
        d.metadata.edrpou = Some("12345678".to_string());
        let idx = PatternIndex::build(&[d], &PatternFilterConfig::default());
        let hits = idx.scan("transfer to edrpou 12345678 today");
        assert!(hits.iter().any(|h| h.pattern.tier == Tier::T0));
    }

    #[test]
    fn tier1_full_name_requires_context_window() {
        let d = doc("p1", "Petro Poroshenko", EntityType::Person);
        let idx = PatternIndex::build(&[d], &PatternFilterConfig::default());

        let with_context = idx.scan("Оплата Petro Poroshenko за послуги");
        assert!(with_context.iter().any(|h| h.pattern.tier == Tier::T1));

        let without_context = idx.scan("some unrelated mention of Petro Poroshenko here with no trigger word anywhere nearby at all");
        assert!(!without_context.iter().any(|h| h.pattern.tier == Tier::T1 && h.pattern.context_required));
    }

    #[test]
    fn tier1_patterns_meet_the_minimum_length_invariant() {
        let d = doc("p1", "Petro Poroshenko", EntityType::Person);
        let idx = PatternIndex::build(&[d], &PatternFilterConfig::default());
        for p in idx.patterns.iter().filter(|p| p.tier == Tier::T1) {
            assert!(p.text.chars().count() >= 4);
        }
    }

    #[test]
    fn fallback_floor_keeps_minimum_patterns_per_entity() {
        let d = doc("p1", "Xy", EntityType::Person);
        let cfg = PatternFilterConfig { min_confidence: 0.99, ..PatternFilterConfig::default() };
        let idx = PatternIndex::build(&[d], &cfg);
        assert!(idx.len() >= 1);
    }
}
