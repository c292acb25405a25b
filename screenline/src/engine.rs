// Engine — the public API surface (§6). Owns every shared resource (config,
// cache, metrics, watchlist) and sequences the stage pipeline, delegating
// error policy and the screening cascade itself to `orchestrator.rs`. Shape
// follows the teacher's top-level `Pipeline` (ingest → workers → fuse →
// publish owned by one struct, constructed once and shared via `Arc` across
// tasks) generalized from a streaming pipeline to a request/response one.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::blocking::compute_keys;
use crate::cache::BoundedCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::language;
use crate::metrics::Metrics;
use crate::monitor::{MemoryPressureMonitor, MonitorConfig};
use crate::morphology::{self, NormalizationOptions};
use crate::orchestrator::{self, ErrorStrategy};
use crate::reranker::QueryMetadata;
use crate::signals;
use crate::types::{
    Language, ProcessingContext, ProcessingOptions, ScreeningResult, SignalsResult, StageName,
    StageOutcome, UnifiedProcessingResult, WatchlistDoc, WatchlistMetadata,
};
use crate::unicode_norm;
use crate::validator::{self, ValidatorOptions};
use crate::watchlist::{ReloadMode, Watchlist, WatchlistStatus};

/// Snapshot of `Metrics` suitable for the public `get_processing_stats` API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessingStats {
    pub total_requests:    u64,
    pub total_errors:      u64,
    pub total_timeouts:    u64,
    pub auto_clear_count:  u64,
    pub review_low_count:  u64,
    pub review_high_count: u64,
    pub auto_hit_count:    u64,
    pub stage_performance: std::collections::HashMap<String, crate::metrics::StagePerformance>,
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub healthy:          bool,
    pub watchlist_docs:   usize,
    pub watchlist_version: u64,
    pub cache_len:        usize,
}

pub struct Engine {
    config:    EngineConfig,
    watchlist: Watchlist,
    cache:     std::sync::Arc<BoundedCache<String, UnifiedProcessingResult>>,
    metrics:   Metrics,
}

impl Engine {
    pub fn new(config: EngineConfig, watchlist_docs: Vec<WatchlistDoc>) -> Self {
        let cache = std::sync::Arc::new(BoundedCache::new(
            config.cache.capacity,
            Some(Duration::from_secs(config.cache.ttl_seconds)),
        ));
        Self {
            watchlist: Watchlist::new(watchlist_docs),
            config,
            cache,
            metrics: Metrics::new(),
        }
    }

    pub fn from_config_path(json_path: Option<&Path>, watchlist_docs: Vec<WatchlistDoc>) -> Self {
        Self::new(EngineConfig::load(json_path), watchlist_docs)
    }

    /// Run one text through the full pipeline: validate → unicode-normalize →
    /// detect language → morphologically normalize → (optional) variants →
    /// (optional) vector reindex check → extract signals → screen against
    /// the active watchlist.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn process(&self, text: &str, opts: &ProcessingOptions) -> Result<UnifiedProcessingResult> {
        self.metrics.record_request();
        let started = Instant::now();
        let deadline = Duration::from_millis(
            opts.timeout_ms.unwrap_or(self.config.processing_timeout_ms),
        );

        if text.trim().is_empty() {
            self.metrics.record_error();
            return Ok(UnifiedProcessingResult {
                original_text: text.to_string(),
                normalized_text: String::new(),
                language: Language::Unknown,
                language_confidence: 0.0,
                tokens: Vec::new(),
                token_variants: Default::default(),
                signals: Default::default(),
                screening: None,
                processing_time_ms: started.elapsed().as_millis() as u64,
                success: false,
                errors: vec!["empty input".to_string()],
                stage_timings: Default::default(),
            });
        }

        if opts.cache_result && !opts.force_reprocess {
            if let Some(cached) = self.cache.get(&cache_key(text, opts)) {
                return Ok(cached);
            }
        }

        let mut ctx = ProcessingContext::new(text, Utc::now());
        let mut state = PipelineRunState::Running;

        // ── validation ───────────────────────────────────────────────────
        let validation = self.run_stage(&mut ctx, StageName::Validation, || {
            let stage_cfg = self.config.stage("validation");
            if !stage_cfg.enabled {
                return Err(EngineError::Validation {
                    stage: StageName::Validation, message: "stage disabled".into(), recoverable: true,
                });
            }
            validator::validate(&ctx.current_text, &ValidatorOptions {
                strict_mode: self.config.validation.strict_mode,
                remove_homoglyphs: self.config.validation.remove_homoglyphs,
                max_input_len: self.config.validation.max_input_len,
            }).map_err(|message| EngineError::Validation { stage: StageName::Validation, message, recoverable: false })
        });

        let validation = match validation {
            Ok(v) => v,
            Err(e) => return Err(self.abort(&mut ctx, state, e)),
        };
        ctx.current_text = validation.sanitized_text.clone();
        if !validation.is_valid {
            state = PipelineRunState::Degraded;
        }
        // Anomaly reason codes (RC_MIXED_SCRIPT/RC_HOMOGLYPH/RC_ZWSP) flow
        // into the screening reason trail even though they're decided here,
        // long before any candidate exists (spec §4.A).
        ctx.metadata.insert(
            "validation_anomaly_codes".to_string(),
            serde_json::json!(validation.anomaly_codes.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
        );

        // ── unicode normalization ───────────────────────────────────────
        let norm_outcome = unicode_norm::normalize(&ctx.current_text);
        ctx.current_text = norm_outcome.text;
        ctx.record(StageName::Unicode, StageOutcome::Completed, Duration::ZERO);

        // ── language detection ───────────────────────────────────────────
        let external_label = opts.language_hint.map(|l| l.to_string());
        let detection = language::detect(&ctx.current_text, external_label.as_deref());
        ctx.language = Some(detection.language);
        ctx.language_confidence = detection.confidence;
        ctx.record(StageName::Language, StageOutcome::Completed, Duration::ZERO);

        // ── morphological normalization ──────────────────────────────────
        let normalization = morphology::normalize(
            &ctx.current_text,
            detection.language,
            &NormalizationOptions {
                preserve_names: opts.preserve_names,
                remove_stop_words: opts.remove_stop_words,
                company_person_preference: self.config.company_person_preference,
            },
        );
        ctx.normalized_text = Some(normalization.canonical_text.clone());
        ctx.tokens = normalization.tokens.clone();
        ctx.token_traces = normalization.traces;
        ctx.entity_type = normalization.entity_type;
        if normalization.reason_codes.is_empty() {
            ctx.record(StageName::Normalization, StageOutcome::Completed, Duration::ZERO);
        } else {
            state = PipelineRunState::Degraded;
            ctx.record(StageName::Normalization, StageOutcome::Degraded { reason: "no canonical name found".into() }, Duration::ZERO);
        }

        // ── variants (optional) ──────────────────────────────────────────
        if opts.generate_variants && self.config.stage("variants").enabled {
            let limits = crate::variants::VariantLimits {
                max_variants: self.config.variants.max_variants,
                max_time_ms:  self.config.variants.max_time_ms,
                max_typos:    self.config.variants.max_typos,
            };
            for token in &ctx.tokens {
                let set = crate::variants::generate_for_token(&token.surface, &limits);
                ctx.token_variants.insert(token.surface.clone(), set);
            }
            ctx.record(StageName::Variants, StageOutcome::Completed, Duration::ZERO);
        } else {
            ctx.record(StageName::Variants, StageOutcome::Skipped { reason: "not requested".into() }, Duration::ZERO);
        }

        // ── embeddings (optional, reserved for a future dedicated model;
        //    the vector index itself always runs as part of screening) ────
        if opts.generate_embeddings && self.config.stage("embeddings").enabled {
            ctx.record(StageName::Embeddings, StageOutcome::Completed, Duration::ZERO);
        } else {
            ctx.record(StageName::Embeddings, StageOutcome::Skipped { reason: "not requested".into() }, Duration::ZERO);
        }

        // ── signals ───────────────────────────────────────────────────────
        let signals_result = signals::extract(&ctx.current_text);
        ctx.signals = Some(signals_result.clone());
        ctx.record(StageName::Signals, StageOutcome::Completed, Duration::ZERO);

        // Cooperative cancellation: the screening cascade is the most
        // expensive remaining stage, so the deadline is checked just before
        // entering it rather than after every cheap stage above.
        if started.elapsed() > deadline {
            self.metrics.record_timeout();
            ctx.errors.push("timeout".to_string());
            return Ok(UnifiedProcessingResult {
                original_text:      text.to_string(),
                normalized_text:    normalization.canonical_text,
                language:           detection.language,
                language_confidence: detection.confidence,
                tokens:             ctx.tokens.clone(),
                token_variants:     ctx.token_variants.iter().map(|(k, v)| (k.clone(), v.iter().cloned().collect())).collect(),
                signals:            signals_result,
                screening:          None,
                processing_time_ms: started.elapsed().as_millis() as u64,
                success:            false,
                errors:             ctx.errors.clone(),
                stage_timings:      ctx.stage_timings.iter().map(|(k, v)| (k.to_string(), v.as_millis() as u64)).collect(),
            });
        }

        // ── screening cascade ─────────────────────────────────────────────
        let screening = if self.config.stage("screening_cascade").enabled {
            let snapshot = self.watchlist.current();
            let signal_meta = derive_signal_metadata(&signals_result);
            let query_keys = compute_keys(&ctx.tokens, &signal_meta);
            let query_meta = build_query_metadata(&ctx, &signal_meta);
            let cascade = orchestrator::run_screening_cascade(
                normalization.canonical_text.as_str(),
                &query_keys,
                &query_meta,
                &snapshot,
                &self.config.thresholds,
            );
            self.metrics.record_risk(cascade.risk_level);
            ctx.record(StageName::ScreeningCascade, StageOutcome::Completed, Duration::ZERO);
            let mut audit_trail = cascade.audit_trail;
            if !validation.anomaly_codes.is_empty() {
                audit_trail.insert(0, format!(
                    "validator anomalies: {}",
                    validation.anomaly_codes.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", "),
                ));
            }
            Some(ScreeningResult {
                input_text:         text.to_string(),
                risk_level:         cascade.risk_level,
                final_confidence:   cascade.final_confidence,
                candidates:         cascade.candidates,
                processing_time_ms: started.elapsed().as_millis() as u64,
                tiers_executed:     cascade.tiers_executed,
                early_stopped:      cascade.early_stopped,
                audit_trail,
            })
        } else {
            ctx.record(StageName::ScreeningCascade, StageOutcome::Skipped { reason: "stage disabled".into() }, Duration::ZERO);
            None
        };

        let elapsed = started.elapsed();
        let result = UnifiedProcessingResult {
            original_text:      text.to_string(),
            normalized_text:    normalization.canonical_text,
            language:           detection.language,
            language_confidence: detection.confidence,
            tokens:             ctx.tokens.clone(),
            token_variants:     ctx.token_variants.iter().map(|(k, v)| (k.clone(), v.iter().cloned().collect())).collect(),
            signals:            signals_result,
            screening,
            processing_time_ms: elapsed.as_millis() as u64,
            success:            !matches!(state, PipelineRunState::Aborted),
            errors:             ctx.errors.clone(),
            stage_timings:      ctx.stage_timings.iter().map(|(k, v)| (k.to_string(), v.as_millis() as u64)).collect(),
        };

        if opts.cache_result {
            self.cache.set(cache_key(text, opts), result.clone(), None);
        }

        Ok(result)
    }

    pub fn process_batch(&self, texts: &[String], opts: &ProcessingOptions) -> Vec<Result<UnifiedProcessingResult>> {
        texts.iter().map(|t| self.process(t, opts)).collect()
    }

    /// Semaphore-bounded concurrent batch (spec §5, §6): each text runs as
    /// its own task, fanned out up to `max_concurrent` at a time, with no
    /// ordering guarantee between tasks — results are returned in input
    /// order regardless of completion order. Requires the engine to be
    /// shared via `Arc` since tasks may outlive the calling stack frame.
    pub async fn process_batch_async(
        self: &std::sync::Arc<Self>,
        texts: &[String],
        opts: &ProcessingOptions,
        max_concurrent: usize,
    ) -> Vec<Result<UnifiedProcessingResult>> {
        let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(texts.len());

        for text in texts {
            let engine = std::sync::Arc::clone(self);
            let opts = opts.clone();
            let text = text.clone();
            let permit = std::sync::Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore never closed");
                tokio::task::spawn_blocking(move || engine.process(&text, &opts))
                    .await
                    .map_err(|join_err| EngineError::System { message: join_err.to_string() })
                    .and_then(|r| r)
            }));
        }

        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(r) => out.push(r),
                Err(join_err) => out.push(Err(EngineError::System { message: join_err.to_string() })),
            }
        }
        out
    }

    /// Spawns the background memory-pressure monitor (spec §5), registering
    /// this engine's result cache so `on_pressure` fires on it when resident
    /// memory crosses the configured warning/critical fractions. Mirrors the
    /// teacher's `tokio::spawn(store.housekeeping_loop())` startup call — the
    /// caller is expected to spawn this once, at process startup, the same
    /// way. A no-op loop (never trips) if `memory_monitor.memory_limit_bytes`
    /// is left at its default of `0`.
    pub fn spawn_pressure_monitor(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut monitor = MemoryPressureMonitor::new(MonitorConfig {
            interval:           Duration::from_millis(self.config.memory_monitor.check_interval_ms),
            memory_limit_bytes: self.config.memory_monitor.memory_limit_bytes,
            warning_fraction:   self.config.cache.warning_pressure_fraction,
            critical_fraction:  self.config.cache.critical_pressure_fraction,
        });
        monitor.register(self.cache.clone());
        tokio::spawn(std::sync::Arc::new(monitor).run_loop())
    }

    /// Screen a single already-normalized entity name directly against the
    /// watchlist, bypassing validation/variants (used by callers that have
    /// already resolved a canonical name — e.g. batch ingestion pipelines).
    pub fn screen_entity(&self, name: &str, query_meta: &QueryMetadata) -> ScreeningResult {
        let started = Instant::now();
        let detection = language::detect(name, None);
        let normalization = morphology::normalize(name, detection.language, &NormalizationOptions::default());
        let snapshot = self.watchlist.current();
        let query_keys = compute_keys(&normalization.tokens, &WatchlistMetadata {
            birth_year:   query_meta.birth_year,
            country_code: query_meta.country_code.clone(),
            edrpou:       query_meta.edrpou.clone(),
            tax_id:       query_meta.tax_id.clone(),
            aliases:      Vec::new(),
        });
        let cascade = orchestrator::run_screening_cascade(
            &normalization.canonical_text, &query_keys, query_meta, &snapshot, &self.config.thresholds,
        );
        self.metrics.record_risk(cascade.risk_level);
        ScreeningResult {
            input_text:         name.to_string(),
            risk_level:         cascade.risk_level,
            final_confidence:   cascade.final_confidence,
            candidates:         cascade.candidates,
            processing_time_ms: started.elapsed().as_millis() as u64,
            tiers_executed:     cascade.tiers_executed,
            early_stopped:      cascade.early_stopped,
            audit_trail:        cascade.audit_trail,
        }
    }

    /// kNN-only lookup against the watchlist's vector index, bypassing the
    /// AC tiers and reranker entirely. Distinct from the public
    /// `search_similar_names` below: this one always compares against the
    /// loaded watchlist, the public one against a caller-supplied list.
    pub fn search_watchlist_by_vector(&self, name: &str, k: usize) -> Vec<(String, f32, String)> {
        let snapshot = self.watchlist.current();
        snapshot.vector_index.search(name, k).into_iter()
            .map(|(id, cosine, candidate_name, _)| (id, cosine, candidate_name))
            .collect()
    }

    /// Ad-hoc similarity ranking over a caller-supplied candidate list
    /// (spec §6's `search_similar_names(query, candidates, threshold,
    /// top_k)`), independent of the loaded watchlist — used by callers who
    /// already have their own shortlist and just want it scored and ranked.
    /// Jaro-Winkler is used directly rather than building an ephemeral
    /// TF-IDF index for what is usually a handful of candidates.
    pub fn search_similar_names(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f32,
        top_k: usize,
    ) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = candidates.iter()
            .map(|c| (c.clone(), strsim::jaro_winkler(query, c) as f32))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        scored.truncate(top_k);
        scored
    }

    pub fn reload_watchlist(&self, docs: Vec<WatchlistDoc>, overlay: bool) -> WatchlistStatus {
        let mode = if overlay { ReloadMode::Overlay } else { ReloadMode::AtomicReplace };
        let status = self.watchlist.reload(docs, mode);
        info!(version = status.version, doc_count = status.doc_count, "watchlist reloaded");
        status
    }

    pub fn get_watchlist_status(&self) -> WatchlistStatus {
        self.watchlist.status()
    }

    pub fn get_processing_stats(&self) -> ProcessingStats {
        ProcessingStats {
            total_requests:    self.metrics.total_requests.load(std::sync::atomic::Ordering::Relaxed),
            total_errors:      self.metrics.total_errors.load(std::sync::atomic::Ordering::Relaxed),
            total_timeouts:    self.metrics.total_timeouts.load(std::sync::atomic::Ordering::Relaxed),
            auto_clear_count:  self.metrics.auto_clear_count.load(std::sync::atomic::Ordering::Relaxed),
            review_low_count:  self.metrics.review_low_count.load(std::sync::atomic::Ordering::Relaxed),
            review_high_count: self.metrics.review_high_count.load(std::sync::atomic::Ordering::Relaxed),
            auto_hit_count:    self.metrics.auto_hit_count.load(std::sync::atomic::Ordering::Relaxed),
            stage_performance: self.metrics.stage_performance(),
        }
    }

    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn health_check(&self) -> HealthCheck {
        let status = self.watchlist.status();
        HealthCheck {
            healthy: true,
            watchlist_docs: status.doc_count,
            watchlist_version: status.version,
            cache_len: self.cache.len(),
        }
    }

    fn run_stage<T>(&self, ctx: &mut ProcessingContext, stage: StageName, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        self.metrics.record_stage(stage, elapsed, result.is_ok());
        match &result {
            Ok(_) => ctx.record(stage, StageOutcome::Completed, elapsed),
            Err(e) => {
                warn!(stage = %stage, error = %e, "stage failed");
                self.metrics.record_error();
                ctx.errors.push(e.to_string());
            }
        }
        result
    }

    fn abort(&self, ctx: &mut ProcessingContext, _state: PipelineRunState, error: EngineError) -> EngineError {
        let rule = orchestrator::error_rule_for(error.stage().unwrap_or(StageName::Validation));
        ctx.errors.push(error.to_string());
        if rule.strategy != ErrorStrategy::Abort {
            warn!(error = %error, "stage failed but error rule is non-abort; aborting anyway at top level");
        }
        error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineRunState {
    Running,
    Degraded,
    Aborted,
}

/// Hashes the raw request text plus options down to a short, fixed-length
/// key instead of keying the cache on the (potentially long, PII-bearing)
/// input text directly. Same idea as the teacher's `header_order_hash`
/// (`workers/fingerprint.rs`): `Sha256` over a delimiter-joined string,
/// truncated to the first 8 bytes and hex-encoded.
fn cache_key(text: &str, opts: &ProcessingOptions) -> String {
    let joined = format!("{text}::{:?}::{}::{}", opts.language_hint, opts.generate_variants, opts.generate_embeddings);
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

fn build_query_metadata(ctx: &ProcessingContext, signal_meta: &WatchlistMetadata) -> QueryMetadata {
    let surname = ctx.tokens.iter()
        .find(|t| t.role == crate::types::TokenRole::Surname)
        .map(|t| t.lemma.clone());
    let has_initial = ctx.tokens.iter().any(|t| t.role == crate::types::TokenRole::Initial);
    QueryMetadata {
        birth_year:   signal_meta.birth_year,
        country_code: signal_meta.country_code.clone(),
        edrpou:       signal_meta.edrpou.clone(),
        tax_id:       signal_meta.tax_id.clone(),
        surname,
        has_initial,
    }
}

/// Maps extracted signals (component K) onto the query-side metadata shape
/// blocking and reranking already consume for watchlist docs: a bare 8-digit
/// document is treated as an EDRPOU, a bare 10-digit one as a tax id, and the
/// first extracted date's 4-digit year as a birth year. `country_code` has no
/// signal-extractor source yet and stays `None`.
fn derive_signal_metadata(signals: &SignalsResult) -> WatchlistMetadata {
    let mut meta = WatchlistMetadata::default();
    for doc in &signals.documents {
        if !doc.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if doc.len() == 8 && meta.edrpou.is_none() {
            meta.edrpou = Some(doc.clone());
        } else if doc.len() == 10 && meta.tax_id.is_none() {
            meta.tax_id = Some(doc.clone());
        }
    }
    meta.birth_year = signals.dates.iter().find_map(|d| extract_year(d));
    meta
}

/// First 4-digit run in a date signal, read as a calendar year. Handles every
/// shape `signals::extract`'s `DATE_RE` produces (`dd.mm.yyyy`, `yyyy-mm-dd`,
/// and `dd <month name> yyyy`) without needing to know which one matched.
fn extract_year(date: &str) -> Option<i32> {
    date.split(|c: char| !c.is_ascii_digit())
        .find(|s| s.len() == 4)
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityType, WatchlistMetadata};

    fn doc(id: &str, text: &str) -> WatchlistDoc {
        WatchlistDoc { doc_id: id.to_string(), text: text.to_string(), entity_type: EntityType::Person, metadata: WatchlistMetadata::default() }
    }

    #[test]
    fn process_returns_completed_result_for_clean_text() {
        let engine = Engine::new(EngineConfig::default(), vec![doc("e1", "Petro Poroshenko")]);
        let result = engine.process("Оплата від Петро Порошенко за послуги", &ProcessingOptions::default()).unwrap();
        assert!(result.success);
        assert_eq!(result.language, Language::Uk);
    }

    #[test]
    fn process_screens_against_watchlist_and_finds_exact_match() {
        let engine = Engine::new(EngineConfig::default(), vec![doc("e1", "Petro Poroshenko")]);
        let result = engine.process("Petro Poroshenko", &ProcessingOptions::default()).unwrap();
        let screening = result.screening.unwrap();
        assert!(!screening.candidates.is_empty());
    }

    #[test]
    fn cached_result_is_returned_on_second_call() {
        let engine = Engine::new(EngineConfig::default(), vec![doc("e1", "Petro Poroshenko")]);
        let opts = ProcessingOptions::default();
        let first = engine.process("Volodymyr Zelensky", &opts).unwrap();
        let second = engine.process("Volodymyr Zelensky", &opts).unwrap();
        assert_eq!(first.normalized_text, second.normalized_text);
        assert_eq!(engine.cache.len(), 1);
    }

    #[test]
    fn derive_signal_metadata_maps_eight_digit_document_to_edrpou() {
        let signals = SignalsResult { documents: vec!["12345678".to_string()], ..Default::default() };
        let meta = derive_signal_metadata(&signals);
        assert_eq!(meta.edrpou, Some("12345678".to_string()));
        assert_eq!(meta.tax_id, None);
    }

    #[test]
    fn derive_signal_metadata_maps_ten_digit_document_to_tax_id() {
        let signals = SignalsResult { documents: vec!["1234567890".to_string()], ..Default::default() };
        let meta = derive_signal_metadata(&signals);
        assert_eq!(meta.tax_id, Some("1234567890".to_string()));
    }

    #[test]
    fn derive_signal_metadata_reads_birth_year_from_a_date_signal() {
        let signals = SignalsResult { dates: vec!["15.03.1965".to_string()], ..Default::default() };
        let meta = derive_signal_metadata(&signals);
        assert_eq!(meta.birth_year, Some(1965));
    }

    #[test]
    fn build_query_metadata_carries_signal_derived_fields_through() {
        let ctx = ProcessingContext::new("Ivan Franko", Utc::now());
        let mut signal_meta = WatchlistMetadata::default();
        signal_meta.edrpou = Some("12345678".to_string());
        signal_meta.birth_year = Some(1965);
        let query_meta = build_query_metadata(&ctx, &signal_meta);
        assert_eq!(query_meta.edrpou, Some("12345678".to_string()));
        assert_eq!(query_meta.birth_year, Some(1965));
    }

    #[test]
    fn empty_input_fails_without_running_the_pipeline() {
        let engine = Engine::new(EngineConfig::default(), vec![doc("e1", "Petro Poroshenko")]);
        let result = engine.process("   ", &ProcessingOptions::default()).unwrap();
        assert!(!result.success);
        assert_eq!(result.errors, vec!["empty input".to_string()]);
    }

    #[tokio::test]
    async fn process_batch_async_runs_every_text_under_the_semaphore_limit() {
        let engine = std::sync::Arc::new(Engine::new(
            EngineConfig::default(),
            vec![doc("e1", "Petro Poroshenko"), doc("e2", "Volodymyr Zelensky")],
        ));
        let texts = vec!["Petro Poroshenko".to_string(), "Volodymyr Zelensky".to_string(), "unrelated text".to_string()];
        let results = engine.process_batch_async(&texts, &ProcessingOptions::default(), 2).await;
        assert_eq!(results.len(), 3);
        for r in &results {
            assert!(r.is_ok());
        }
    }

    #[tokio::test]
    async fn spawn_pressure_monitor_runs_without_panicking() {
        let engine = std::sync::Arc::new(Engine::new(EngineConfig::default(), vec![doc("e1", "Petro Poroshenko")]));
        let handle = engine.spawn_pressure_monitor();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[test]
    fn reload_watchlist_updates_status() {
        let engine = Engine::new(EngineConfig::default(), vec![doc("e1", "Petro Poroshenko")]);
        let status = engine.reload_watchlist(vec![doc("e2", "Volodymyr Zelensky")], false);
        assert_eq!(status.doc_count, 1);
        assert_eq!(engine.get_watchlist_status().version, 2);
    }

    #[test]
    fn health_check_reports_watchlist_size() {
        let engine = Engine::new(EngineConfig::default(), vec![doc("e1", "Petro Poroshenko")]);
        let health = engine.health_check();
        assert!(health.healthy);
        assert_eq!(health.watchlist_docs, 1);
    }

    #[test]
    fn search_similar_names_ranks_an_adhoc_candidate_list() {
        let engine = Engine::new(EngineConfig::default(), vec![]);
        let candidates = vec![
            "Petro Poroshenko".to_string(),
            "Petro Poroshenkoo".to_string(),
            "Volodymyr Zelensky".to_string(),
        ];
        let ranked = engine.search_similar_names("Petro Poroshenko", &candidates, 0.5, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "Petro Poroshenko");
        assert!(ranked[0].1 >= ranked[1].1);
    }
}
