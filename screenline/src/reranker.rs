// Reranker (component J) — combines AC/blocking/vector signals with string
// similarity, metadata match and rule boosts into one calibrated score.
// Weighted-sum-then-sigmoid is the teacher's fusion shape (`engine/fusion.rs`
// combines per-worker scores by fixed weight into one fused score); here the
// weights and the calibration constant are fixed per this screening domain
// rather than per-worker-kind.

use std::collections::HashMap;

use strsim::jaro_winkler;

use crate::dictionaries::has_uk_surname_suffix;
use crate::types::{ReasonCode, ScreeningCandidate, WatchlistMetadata};

const WEIGHT_COSINE: f32 = 0.35;
const WEIGHT_JARO_WINKLER: f32 = 0.25;
const WEIGHT_RULE_BUNDLE: f32 = 0.40;

/// Platt-style calibration: fixed logistic squashing the weighted raw sum
/// into `[0, 1]`. `sigmoid(4.0 * raw - 2.0)` maps a raw sum of 0.5 to ~0.5,
/// steepening around the midpoint so close calls still separate cleanly.
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn calibrate(raw: f32) -> f32 {
    sigmoid(4.0 * raw - 2.0)
}

#[derive(Debug, Clone, Default)]
pub struct QueryMetadata {
    pub birth_year:   Option<i32>,
    pub country_code: Option<String>,
    pub edrpou:       Option<String>,
    pub tax_id:       Option<String>,
    pub surname:      Option<String>,
    pub has_initial:  bool,
}

/// Rule-bundle sub-score (weight 0.40 of the final blend): each satisfied
/// rule contributes a fixed share; the bundle saturates at 1.0.
fn rule_bundle_score(query_name: &str, candidate_name: &str, query_meta: &QueryMetadata, candidate_meta: &WatchlistMetadata) -> (f32, Vec<ReasonCode>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let query_lower = query_name.to_lowercase();
    let candidate_lower = candidate_name.to_lowercase();

    if let Some(surname) = &query_meta.surname {
        if candidate_lower.contains(&surname.to_lowercase()) {
            score += 0.30;
            reasons.push(ReasonCode::RcExact);
        }
    }
    if query_meta.has_initial && query_lower.split_whitespace().count() >= 2 {
        score += 0.10;
        reasons.push(ReasonCode::RcInitials);
    }
    if let (Some(qy), Some(cy)) = (query_meta.birth_year, candidate_meta.birth_year) {
        if (qy - cy).abs() <= 1 {
            score += 0.20;
            reasons.push(ReasonCode::RcMetadataDob);
        }
    }
    if let (Some(qc), Some(cc)) = (&query_meta.country_code, &candidate_meta.country_code) {
        if qc.eq_ignore_ascii_case(cc) {
            score += 0.10;
        }
    }
    if let (Some(qe), Some(ce)) = (&query_meta.edrpou, &candidate_meta.edrpou) {
        if qe == ce {
            score += 0.20;
            reasons.push(ReasonCode::RcMetadataEdrpou);
        }
    }
    if let (Some(qt), Some(ct)) = (&query_meta.tax_id, &candidate_meta.tax_id) {
        if qt == ct {
            score += 0.20;
            reasons.push(ReasonCode::RcMetadataTaxid);
        }
    }
    if query_name.split_whitespace().any(|w| has_uk_surname_suffix(&w.to_lowercase()))
        && candidate_name.split_whitespace().any(|w| has_uk_surname_suffix(&w.to_lowercase())) {
        score += 0.10;
    }

    (score.min(1.0), reasons)
}

/// Combine a single candidate's feature inputs into a calibrated confidence
/// and the reason codes the winning rules contribute. `cosine` is the kNN
/// cosine similarity (or `0.0` if the candidate never surfaced from the
/// vector index).
pub fn score_candidate(
    query_name: &str,
    cosine: f32,
    candidate: &ScreeningCandidate,
    query_meta: &QueryMetadata,
) -> (f32, Vec<ReasonCode>) {
    let jw = jaro_winkler(query_name, &candidate.name) as f32;
    let (rule_score, rule_reasons) = rule_bundle_score(query_name, &candidate.name, query_meta, &candidate.metadata);

    let raw = WEIGHT_COSINE * cosine + WEIGHT_JARO_WINKLER * jw + WEIGHT_RULE_BUNDLE * rule_score;
    let confidence = calibrate(raw);

    let mut reasons = candidate.reason_codes.clone();
    for r in rule_reasons {
        if !reasons.contains(&r) {
            reasons.push(r);
        }
    }
    (confidence, reasons)
}

/// Rerank the union of candidates produced by earlier tiers. `cosines` maps
/// `entity_id -> kNN cosine` for candidates that surfaced from the vector
/// index (component I); candidates absent from the map score `0.0` there.
/// Deduplicates by `entity_id`, keeping the maximum confidence (the explicit
/// resolution for duplicate blocking-key candidates).
pub fn rerank(
    query_name: &str,
    candidates: Vec<ScreeningCandidate>,
    cosines: &HashMap<String, f32>,
    query_meta: &QueryMetadata,
) -> Vec<ScreeningCandidate> {
    let mut by_entity: HashMap<String, ScreeningCandidate> = HashMap::new();

    for mut candidate in candidates {
        let cosine = cosines.get(&candidate.entity_id).copied().unwrap_or(0.0);
        let (confidence, reasons) = score_candidate(query_name, cosine, &candidate, query_meta);
        candidate.confidence = confidence;
        candidate.reason_codes = reasons;
        candidate.tier_scores.insert("reranker".to_string(), confidence);

        by_entity.entry(candidate.entity_id.clone())
            .and_modify(|existing| {
                if candidate.confidence > existing.confidence {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }

    let mut out: Vec<ScreeningCandidate> = by_entity.into_values().collect();
    out.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(entity_id: &str, name: &str) -> ScreeningCandidate {
        ScreeningCandidate {
            entity_id: entity_id.to_string(), name: name.to_string(), confidence: 0.0,
            tier_scores: HashMap::new(), reason_codes: Vec::new(),
            metadata: WatchlistMetadata::default(),
        }
    }

    #[test]
    fn exact_name_and_high_cosine_outscores_rule_free_match() {
        let c = candidate("e1", "Petro Poroshenko");
        let (bare, _) = score_candidate("Petro Poroshenko", 1.0, &c, &QueryMetadata::default());

        let mut meta = QueryMetadata::default();
        meta.surname = Some("Poroshenko".to_string());
        let (with_rules, _) = score_candidate("Petro Poroshenko", 1.0, &c, &meta);

        assert!(with_rules > bare);
        assert!(with_rules > 0.65);
    }

    #[test]
    fn unrelated_name_yields_low_confidence() {
        let c = candidate("e1", "Zelensky");
        let (confidence, _) = score_candidate("Poroshenko", 0.0, &c, &QueryMetadata::default());
        assert!(confidence < 0.3);
    }

    #[test]
    fn edrpou_match_contributes_metadata_reason_code() {
        let mut c = candidate("e1", "Alfa Group");
        c.metadata.edrpou = Some("12345678".to_string());
        let mut meta = QueryMetadata::default();
        meta.edrpou = Some("12345678".to_string());
        let (_, reasons) = score_candidate("Alfa Group", 0.5, &c, &meta);
        assert!(reasons.contains(&ReasonCode::RcMetadataEdrpou));
    }

    #[test]
    fn dedup_by_entity_id_keeps_max_confidence() {
        let low = candidate("e1", "Zelensky");
        let high = candidate("e1", "Petro Poroshenko");
        let mut cosines = HashMap::new();
        cosines.insert("e1".to_string(), 1.0);
        let out = rerank("Petro Poroshenko", vec![low, high], &cosines, &QueryMetadata::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Petro Poroshenko");
    }
}
