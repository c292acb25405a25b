// Core data model shared by every stage and tier.
//
// Mirrors spec §3: ProcessingContext is the one mutable value threaded through
// the orchestrator; every other type here is produced by exactly one stage and
// consumed by later ones. Stage order is fixed — a stage only reads fields an
// earlier stage wrote (enforced by convention, not the type system, the same
// way the teacher's `Pipeline::process` sequences ingest → workers → fuse).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Stages ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageName {
    Validation,
    Unicode,
    Language,
    Normalization,
    Variants,
    Embeddings,
    Signals,
    ScreeningCascade,
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation       => write!(f, "validation"),
            Self::Unicode          => write!(f, "unicode"),
            Self::Language         => write!(f, "language"),
            Self::Normalization    => write!(f, "normalization"),
            Self::Variants         => write!(f, "variants"),
            Self::Embeddings       => write!(f, "embeddings"),
            Self::Signals          => write!(f, "signals"),
            Self::ScreeningCascade => write!(f, "screening_cascade"),
        }
    }
}

/// Every stage returns one of these so the orchestrator has a uniform
/// record to stash in `ProcessingContext::stage_results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageOutcome {
    Completed,
    Degraded { reason: String },
    Skipped { reason: String },
}

// ── Language ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Uk,
    Ru,
    En,
    Unknown,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uk      => write!(f, "uk"),
            Self::Ru      => write!(f, "ru"),
            Self::En      => write!(f, "en"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which rule in the §4.C cascade decided the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    Dictionary,
    CyrillicPriority,
    PatternHeuristic,
    External,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub language:   Language,
    pub confidence: f32,
    pub method:     DetectionMethod,
}

// ── Tokens ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenRole {
    Given,
    Patronymic,
    Surname,
    Initial,
    LegalForm,
    OrgCore,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub surface: String,
    pub role:    TokenRole,
    pub tag:     String,
    pub lemma:   String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTrace {
    pub token:        String,
    pub role:         TokenRole,
    pub rule_applied: String,
    pub output:       String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Masculine,
    Feminine,
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameAnalysis {
    pub lemma:            String,
    pub gender:            Option<Gender>,
    pub declensions:       Vec<String>,
    pub diminutives:       Vec<String>,
    pub transliterations:  Vec<String>,
}

impl Default for Gender {
    fn default() -> Self { Gender::Unknown }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    Org,
    Document,
}

// ── Reason codes ─────────────────────────────────────────────────────────────

/// Stable wire identifiers surfaced on candidates and in the audit trail.
/// `#[non_exhaustive]` since the screening core may grow reason codes without
/// breaking downstream matches on the ones that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ReasonCode {
    RcExact,
    RcAlias,
    RcInitials,
    RcTypo,
    RcPhonetic,
    RcSpacing,
    RcDocnum,
    RcLegalform,
    RcMetadataDob,
    RcMetadataEdrpou,
    RcMetadataTaxid,
    RcMixedScript,
    RcHomoglyph,
    RcZwsp,
    RcNoName,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RcExact         => "RC_EXACT",
            Self::RcAlias         => "RC_ALIAS",
            Self::RcInitials      => "RC_INITIALS",
            Self::RcTypo          => "RC_TYPO",
            Self::RcPhonetic      => "RC_PHONETIC",
            Self::RcSpacing       => "RC_SPACING",
            Self::RcDocnum        => "RC_DOCNUM",
            Self::RcLegalform     => "RC_LEGALFORM",
            Self::RcMetadataDob   => "RC_METADATA_DOB",
            Self::RcMetadataEdrpou=> "RC_METADATA_EDRPOU",
            Self::RcMetadataTaxid => "RC_METADATA_TAXID",
            Self::RcMixedScript   => "RC_MIXED_SCRIPT",
            Self::RcHomoglyph     => "RC_HOMOGLYPH",
            Self::RcZwsp          => "RC_ZWSP",
            Self::RcNoName        => "RC_NO_NAME",
        };
        write!(f, "{s}")
    }
}

// ── AC patterns (component G) ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    T0 = 0,
    T1 = 1,
    T2 = 2,
    T3 = 3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub text:             String,
    pub tier:             Tier,
    pub precision_hint:   f32,
    pub source_confidence: f32,
    pub language:         Language,
    pub context_required: bool,
    pub reason_code:      ReasonCode,
    pub entity_id:        String,
}

/// One hit returned by the matcher: which pattern matched, in which tier, why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternHit {
    pub pattern:     Pattern,
    pub matched_text: String,
    pub start:       usize,
    pub end:         usize,
}

// ── Blocking keys (component H) ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockingKeys {
    pub surname_normalized:    Option<String>,
    pub phonetic_surname:      Option<String>,
    pub first_initial_surname: Option<String>,
    pub org_core_stem:         Option<String>,
    pub legal_form_key:        Option<String>,
    pub birth_year:            Option<i32>,
    pub birth_decade_surname:  Option<String>,
    pub country_code:          Option<String>,
    pub edrpou:                Option<String>,
    pub tax_id:                Option<String>,
}

// ── Watchlist (component I data) ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistDoc {
    pub doc_id:      String,
    pub text:        String,
    pub entity_type: EntityType,
    pub metadata:    WatchlistMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchlistMetadata {
    pub birth_year:   Option<i32>,
    pub country_code: Option<String>,
    pub edrpou:       Option<String>,
    pub tax_id:       Option<String>,
    pub aliases:      Vec<String>,
}

// ── Candidates & results (components J/L) ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningCandidate {
    pub entity_id:     String,
    pub name:          String,
    pub confidence:    f32,
    pub tier_scores:   HashMap<String, f32>,
    pub reason_codes:  Vec<ReasonCode>,
    pub metadata:      WatchlistMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    AutoClear,
    ReviewLow,
    ReviewHigh,
    AutoHit,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AutoClear  => "AUTO_CLEAR",
            Self::ReviewLow  => "REVIEW_LOW",
            Self::ReviewHigh => "REVIEW_HIGH",
            Self::AutoHit    => "AUTO_HIT",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub input_text:          String,
    pub risk_level:          RiskLevel,
    pub final_confidence:    f32,
    pub candidates:          Vec<ScreeningCandidate>,
    pub processing_time_ms:  u64,
    pub tiers_executed:      Vec<Tier>,
    pub early_stopped:       bool,
    pub audit_trail:         Vec<String>,
}

// ── Signals (component K) ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalsResult {
    pub persons:       Vec<String>,
    pub organizations: Vec<String>,
    pub documents:      Vec<String>,
    pub dates:          Vec<String>,
    pub amounts:        Vec<String>,
}

// ── Validator output (component A) ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidatorRisk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid:        bool,
    pub sanitized_text:  String,
    pub warnings:        Vec<String>,
    pub blocked_patterns: Vec<String>,
    pub risk_level:      ValidatorRisk,
    pub anomaly_codes:   Vec<ReasonCode>,
}

// ── Processing context (the threaded value) ─────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub original_text:       String,
    pub current_text:        String,
    pub language:            Option<Language>,
    pub language_confidence: f32,
    pub normalized_text:     Option<String>,
    pub tokens:              Vec<Token>,
    pub token_traces:        Vec<TokenTrace>,
    pub token_variants:      HashMap<String, HashSet<String>>,
    pub signals:             Option<SignalsResult>,
    pub errors:              Vec<String>,
    pub stage_results:       HashMap<StageName, StageOutcome>,
    pub stage_timings:       HashMap<StageName, Duration>,
    pub metadata:            HashMap<String, serde_json::Value>,
    pub entity_type:         Option<EntityType>,
    pub started_at:          DateTime<Utc>,
}

impl ProcessingContext {
    pub fn new(text: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            original_text:       text.to_string(),
            current_text:        text.to_string(),
            language:            None,
            language_confidence: 0.0,
            normalized_text:     None,
            tokens:              Vec::new(),
            token_traces:        Vec::new(),
            token_variants:      HashMap::new(),
            signals:             None,
            errors:              Vec::new(),
            stage_results:       HashMap::new(),
            stage_timings:       HashMap::new(),
            metadata:            HashMap::new(),
            entity_type:         None,
            started_at,
        }
    }

    pub fn record(&mut self, stage: StageName, outcome: StageOutcome, elapsed: Duration) {
        self.stage_timings.insert(stage, elapsed);
        self.stage_results.insert(stage, outcome);
    }
}

// ── Top-level processing options & result (public API, §6) ─────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub generate_variants:        bool,
    pub generate_embeddings:      bool,
    pub cache_result:             bool,
    pub force_reprocess:          bool,
    pub language_hint:            Option<Language>,
    pub timeout_ms:               Option<u64>,
    pub remove_stop_words:        bool,
    pub preserve_names:           bool,
    pub enable_advanced_features: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            generate_variants:        true,
            generate_embeddings:      false,
            cache_result:             true,
            force_reprocess:          false,
            language_hint:            None,
            timeout_ms:               None,
            remove_stop_words:        true,
            preserve_names:           true,
            enable_advanced_features: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedProcessingResult {
    pub original_text:      String,
    pub normalized_text:    String,
    pub language:           Language,
    pub language_confidence: f32,
    pub tokens:             Vec<Token>,
    pub token_variants:     HashMap<String, Vec<String>>,
    pub signals:            SignalsResult,
    pub screening:          Option<ScreeningResult>,
    pub processing_time_ms: u64,
    pub success:            bool,
    pub errors:             Vec<String>,
    pub stage_timings:      HashMap<String, u64>,
}
