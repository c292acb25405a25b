// Orchestrator (component L) — error policy table, pipeline state machine,
// and the screening cascade decision engine. Stage sequencing itself
// (validation → unicode → language → normalization → variants → embeddings
// → signals → screening cascade) lives in `engine.rs`, which owns the
// shared resources this module's functions need (watchlist snapshot,
// thresholds); this module supplies the *policy* those stages are run
// under, in the teacher's error-classification style (cf. `load_shedder.rs`
// reacting to a fixed severity ladder rather than ad hoc matches scattered
// through call sites).

use std::collections::HashMap;

use crate::reranker::{self, QueryMetadata};
use crate::types::{
    BlockingKeys, PatternHit, ReasonCode, RiskLevel, ScreeningCandidate, StageName, Tier,
};
use crate::watchlist::WatchlistSnapshot;
use crate::config::ScreeningThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStrategy {
    Continue,
    Retry,
    Fallback,
    SkipStage,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorRule {
    pub severity:            Severity,
    pub strategy:            ErrorStrategy,
    pub max_retries:         u32,
    pub continue_on_failure: bool,
}

/// Default error-rule table (spec §4.L). `StageName::Validation` failures
/// abort; everything else degrades gracefully by design.
pub fn error_rule_for(stage: StageName) -> ErrorRule {
    match stage {
        StageName::Validation => ErrorRule { severity: Severity::High, strategy: ErrorStrategy::Abort, max_retries: 0, continue_on_failure: false },
        StageName::Language => ErrorRule { severity: Severity::Medium, strategy: ErrorStrategy::Fallback, max_retries: 0, continue_on_failure: true },
        StageName::Normalization => ErrorRule { severity: Severity::Medium, strategy: ErrorStrategy::Retry, max_retries: 2, continue_on_failure: true },
        StageName::Variants => ErrorRule { severity: Severity::Low, strategy: ErrorStrategy::SkipStage, max_retries: 0, continue_on_failure: true },
        StageName::Embeddings => ErrorRule { severity: Severity::Low, strategy: ErrorStrategy::SkipStage, max_retries: 0, continue_on_failure: true },
        StageName::Unicode | StageName::Signals | StageName::ScreeningCascade =>
            ErrorRule { severity: Severity::Medium, strategy: ErrorStrategy::Retry, max_retries: 1, continue_on_failure: true },
    }
}

/// System/unexpected errors always abort regardless of which stage raised
/// them — callers check this before consulting `error_rule_for`.
pub fn is_system_error_rule() -> ErrorRule {
    ErrorRule { severity: Severity::Critical, strategy: ErrorStrategy::Abort, max_retries: 0, continue_on_failure: false }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Degraded,
    Aborted,
    Completed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Aborted | PipelineState::Completed)
    }
}

fn map_risk(confidence: f32, thresholds: &ScreeningThresholds) -> RiskLevel {
    if confidence >= thresholds.auto_hit {
        RiskLevel::AutoHit
    } else if confidence >= thresholds.review_high {
        RiskLevel::ReviewHigh
    } else if confidence >= thresholds.review_low {
        RiskLevel::ReviewLow
    } else {
        RiskLevel::AutoClear
    }
}

const STRONG_METADATA_CODES: &[ReasonCode] =
    &[ReasonCode::RcMetadataDob, ReasonCode::RcMetadataEdrpou, ReasonCode::RcMetadataTaxid];

fn has_strong_metadata(candidate: &ScreeningCandidate) -> bool {
    candidate.reason_codes.iter().any(|r| STRONG_METADATA_CODES.contains(r))
        || candidate.metadata.edrpou.is_some()
        || candidate.metadata.tax_id.is_some()
        || candidate.metadata.birth_year.is_some()
}

/// Metadata gating (spec §4.L step 5): AUTO_HIT requires at least one of
/// DOB/EDRPOU/tax-id on the winning candidate, else downgrade one tier.
fn apply_metadata_gate(risk: RiskLevel, candidate: Option<&ScreeningCandidate>) -> RiskLevel {
    if risk == RiskLevel::AutoHit {
        let gated = candidate.map(has_strong_metadata).unwrap_or(false);
        if !gated {
            return RiskLevel::ReviewHigh;
        }
    }
    risk
}

fn pattern_hit_to_candidate(hit: &PatternHit, snapshot: &WatchlistSnapshot) -> ScreeningCandidate {
    let name = snapshot.docs.iter()
        .find(|d| d.doc_id == hit.pattern.entity_id)
        .map(|d| d.text.clone())
        .unwrap_or_else(|| hit.matched_text.clone());
    let metadata = snapshot.docs.iter()
        .find(|d| d.doc_id == hit.pattern.entity_id)
        .map(|d| d.metadata.clone())
        .unwrap_or_default();

    ScreeningCandidate {
        entity_id:    hit.pattern.entity_id.clone(),
        name,
        confidence:   hit.pattern.source_confidence,
        tier_scores:  HashMap::from([(format!("{:?}", hit.pattern.tier), hit.pattern.source_confidence)]),
        reason_codes: vec![hit.pattern.reason_code],
        metadata,
    }
}

fn dedup_keep_max(candidates: Vec<ScreeningCandidate>) -> Vec<ScreeningCandidate> {
    let mut by_entity: HashMap<String, ScreeningCandidate> = HashMap::new();
    for c in candidates {
        by_entity.entry(c.entity_id.clone())
            .and_modify(|existing| {
                if c.confidence > existing.confidence {
                    *existing = c.clone();
                }
                for r in &c.reason_codes {
                    if !existing.reason_codes.contains(r) {
                        existing.reason_codes.push(*r);
                    }
                }
            })
            .or_insert(c);
    }
    by_entity.into_values().collect()
}

pub struct CascadeOutcome {
    pub risk_level:       RiskLevel,
    pub final_confidence: f32,
    pub candidates:       Vec<ScreeningCandidate>,
    pub tiers_executed:   Vec<Tier>,
    pub early_stopped:    bool,
    pub audit_trail:      Vec<String>,
}

/// Run the screening cascade: AC tiers T0..T3 with early-stop, then (unless
/// already short-circuited) blocking keys + kNN vector search merged and
/// reranked into a final, calibrated score (spec §4.L).
pub fn run_screening_cascade(
    query_text: &str,
    query_keys: &BlockingKeys,
    query_meta: &QueryMetadata,
    snapshot: &WatchlistSnapshot,
    thresholds: &ScreeningThresholds,
) -> CascadeOutcome {
    let mut audit = Vec::new();
    let mut tiers_executed = Vec::new();
    let mut pool: Vec<ScreeningCandidate> = Vec::new();

    let all_hits = snapshot.pattern_index.scan(query_text);

    for tier in [Tier::T0, Tier::T1, Tier::T2, Tier::T3] {
        tiers_executed.push(tier);
        let tier_hits: Vec<&PatternHit> = all_hits.iter().filter(|h| h.pattern.tier == tier).collect();
        for hit in &tier_hits {
            pool.push(pattern_hit_to_candidate(hit, snapshot));
        }
        audit.push(format!("tier {tier:?}: {} hits", tier_hits.len()));

        let max_confidence = pool.iter().map(|c| c.confidence).fold(0.0f32, f32::max);
        if max_confidence >= thresholds.early_stop_hit || (max_confidence > 0.0 && max_confidence <= thresholds.early_stop_clear) {
            let deduped = dedup_keep_max(pool);
            let winner = deduped.iter().max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap());
            let risk = apply_metadata_gate(map_risk(max_confidence, thresholds), winner);
            audit.push(format!("early stop at tier {tier:?}: max_confidence={max_confidence:.2}"));
            return CascadeOutcome {
                risk_level: risk,
                final_confidence: max_confidence,
                candidates: deduped,
                tiers_executed,
                early_stopped: true,
                audit_trail: audit,
            };
        }
    }

    let blocking_hits = snapshot.blocking_index.lookup(query_keys);
    audit.push(format!("blocking: {} candidates", blocking_hits.len()));
    pool.extend(blocking_hits);

    let vector_hits = if snapshot.vector_index.is_empty() {
        // Ephemeral mode (spec §4.I): no persistent index ready, so build a
        // small ad-hoc one from this request's own tier-1/tier-2 AC hits and
        // search within that pool instead.
        let mut ephemeral_pool: Vec<(String, String)> = all_hits.iter()
            .filter(|h| matches!(h.pattern.tier, Tier::T1 | Tier::T2))
            .map(|h| {
                let candidate = pattern_hit_to_candidate(h, snapshot);
                (candidate.entity_id, candidate.name)
            })
            .collect();
        ephemeral_pool.sort();
        ephemeral_pool.dedup();
        audit.push(format!("vector index empty: ephemeral search over {} tier-1/2 candidates", ephemeral_pool.len()));
        crate::vector_index::ephemeral_search(&ephemeral_pool, query_text, 10)
    } else {
        snapshot.vector_index.search(query_text, 10)
    };
    audit.push(format!("vector index: {} candidates", vector_hits.len()));
    let mut cosines: HashMap<String, f32> = HashMap::new();
    for (entity_id, cosine, name, reason) in vector_hits {
        cosines.insert(entity_id.clone(), cosine);
        pool.push(ScreeningCandidate {
            entity_id,
            name,
            confidence: crate::vector_index::cosine_to_confidence(cosine),
            tier_scores: HashMap::new(),
            reason_codes: vec![reason],
            metadata: Default::default(),
        });
    }

    let reranked = reranker::rerank(query_text, pool, &cosines, query_meta);
    audit.push(format!("reranked: {} final candidates", reranked.len()));

    let final_confidence = reranked.iter().map(|c| c.confidence).fold(0.0f32, f32::max);
    let winner = reranked.first();
    let risk_level = apply_metadata_gate(map_risk(final_confidence, thresholds), winner);

    CascadeOutcome {
        risk_level,
        final_confidence,
        candidates: reranked,
        tiers_executed,
        early_stopped: false,
        audit_trail: audit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityType, WatchlistDoc, WatchlistMetadata};
    use crate::watchlist::Watchlist;

    fn thresholds() -> ScreeningThresholds {
        ScreeningThresholds::default()
    }

    #[test]
    fn error_rule_table_matches_spec_defaults() {
        assert_eq!(error_rule_for(StageName::Validation).strategy, ErrorStrategy::Abort);
        assert_eq!(error_rule_for(StageName::Language).strategy, ErrorStrategy::Fallback);
        assert_eq!(error_rule_for(StageName::Normalization).max_retries, 2);
        assert_eq!(error_rule_for(StageName::Variants).strategy, ErrorStrategy::SkipStage);
    }

    #[test]
    fn risk_monotonicity_holds_across_the_threshold_ladder() {
        let t = thresholds();
        assert!(map_risk(0.95, &t) > map_risk(0.80, &t));
        assert!(map_risk(0.80, &t) > map_risk(0.65, &t));
        assert!(map_risk(0.65, &t) > map_risk(0.10, &t));
    }

    #[test]
    fn auto_hit_without_metadata_downgrades_to_review_high() {
        let candidate = ScreeningCandidate {
            entity_id: "e1".into(), name: "Petro Poroshenko".into(), confidence: 0.95,
            tier_scores: HashMap::new(), reason_codes: vec![ReasonCode::RcExact],
            metadata: WatchlistMetadata::default(),
        };
        let gated = apply_metadata_gate(RiskLevel::AutoHit, Some(&candidate));
        assert_eq!(gated, RiskLevel::ReviewHigh);
    }

    #[test]
    fn auto_hit_with_edrpou_metadata_survives_gating() {
        let candidate = ScreeningCandidate {
            entity_id: "e1".into(), name: "Alfa".into(), confidence: 0.95,
            tier_scores: HashMap::new(), reason_codes: vec![ReasonCode::RcMetadataEdrpou],
            metadata: WatchlistMetadata::default(),
        };
        let gated = apply_metadata_gate(RiskLevel::AutoHit, Some(&candidate));
        assert_eq!(gated, RiskLevel::AutoHit);
    }

    #[test]
    fn exact_watchlist_hit_early_stops_with_auto_hit() {
        let mut meta = WatchlistMetadata::default();
        meta.edrpou = Some("87654321".to_string());
        let doc = WatchlistDoc {
            doc_id: "e1".into(), text: "putin".into(), entity_type: EntityType::Person, metadata: meta,
        };
        let wl = Watchlist::new(vec![doc]);
        let snapshot = wl.current();
        let outcome = run_screening_cascade(
            "putin",
            &BlockingKeys::default(),
            &QueryMetadata::default(),
            &snapshot,
            &thresholds(),
        );
        assert!(outcome.early_stopped);
        assert_eq!(outcome.risk_level, RiskLevel::AutoHit);
    }

    #[test]
    fn empty_watchlist_falls_back_to_ephemeral_vector_search() {
        let wl = Watchlist::empty();
        let snapshot = wl.current();
        assert!(snapshot.vector_index.is_empty());
        let outcome = run_screening_cascade(
            "some unrelated payment text",
            &BlockingKeys::default(),
            &QueryMetadata::default(),
            &snapshot,
            &thresholds(),
        );
        assert!(!outcome.early_stopped);
        assert!(outcome.audit_trail.iter().any(|line| line.contains("ephemeral")));
    }

    proptest::proptest! {
        /// Spec-testable property: risk level is monotonically non-decreasing
        /// in confidence for any pair of scores, not just the fixed ladder
        /// points the example above checks.
        #[test]
        fn risk_level_never_decreases_as_confidence_rises(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let t = thresholds();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            proptest::prop_assert!(map_risk(lo, &t) <= map_risk(hi, &t));
        }
    }
}
