// Layered configuration: struct defaults → JSON file → environment variables,
// highest priority last (spec §6). No config-crate magic — the teacher's
// codebase favors explicit structs everywhere (`Cli` in main.rs, `WEIGHTS` in
// fusion.rs), so the merge here is a plain function over plain structs.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::Language;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub enabled:        bool,
    pub timeout_ms:     u64,
    pub retry_count:    u32,
    pub cache_results:  bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self { enabled: true, timeout_ms: 2_000, retry_count: 0, cache_results: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningThresholds {
    pub auto_clear:          f32,
    pub review_low:          f32,
    pub review_high:         f32,
    pub auto_hit:            f32,
    pub early_stop_clear:    f32,
    pub early_stop_hit:      f32,
}

impl Default for ScreeningThresholds {
    fn default() -> Self {
        Self {
            auto_clear:       0.60,
            review_low:       0.60,
            review_high:      0.74,
            auto_hit:         0.86,
            early_stop_clear: 0.10,
            early_stop_hit:   0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyPersonPreference {
    PreferCompany,
    PreferPerson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputValidationConfig {
    pub max_input_len:      usize,
    pub strict_mode:        bool,
    pub remove_homoglyphs:  bool,
}

impl Default for InputValidationConfig {
    fn default() -> Self {
        Self { max_input_len: 10_000, strict_mode: false, remove_homoglyphs: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity:         usize,
    pub ttl_seconds:      u64,
    pub warning_pressure_fraction:  f32,
    pub critical_pressure_fraction: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl_seconds: 300,
            warning_pressure_fraction: 0.80,
            critical_pressure_fraction: 0.95,
        }
    }
}

/// Background RSS-sampling monitor (spec §5). `memory_limit_bytes: 0` keeps
/// the monitor dormant, since a sane default memory ceiling cannot be
/// guessed — only a deployment knows its own container/VM limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMonitorConfig {
    pub check_interval_ms:  u64,
    pub memory_limit_bytes: u64,
}

impl Default for MemoryMonitorConfig {
    fn default() -> Self {
        Self { check_interval_ms: 5_000, memory_limit_bytes: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_concurrent_stages:   usize,
    pub enable_caching:          bool,
    pub enable_metrics:          bool,
    pub enable_error_recovery:   bool,
    pub processing_timeout_ms:   u64,
    pub batch_size:              usize,
    pub max_concurrent:          usize,
    pub default_language:        Language,
    pub confidence_threshold:    f32,
    pub company_person_preference: CompanyPersonPreference,

    pub cache:      CacheConfig,
    pub validation: InputValidationConfig,
    pub variants:   VariantLimits,
    pub thresholds: ScreeningThresholds,
    pub stages:     HashMap<String, StageConfig>,
    pub memory_monitor: MemoryMonitorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut stages = HashMap::new();
        for name in [
            "validation", "unicode", "language", "normalization",
            "variants", "embeddings", "signals", "screening_cascade",
        ] {
            stages.insert(name.to_string(), StageConfig::default());
        }
        Self {
            max_concurrent_stages: 8,
            enable_caching:        true,
            enable_metrics:        true,
            enable_error_recovery: true,
            processing_timeout_ms: 30_000,
            batch_size:            32,
            max_concurrent:        10,
            default_language:      Language::En,
            confidence_threshold:  0.5,
            company_person_preference: CompanyPersonPreference::PreferPerson,
            cache:      CacheConfig::default(),
            validation: InputValidationConfig::default(),
            variants:   VariantLimits::default(),
            thresholds: ScreeningThresholds::default(),
            stages,
            memory_monitor: MemoryMonitorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults → JSON file (if it exists) → environment variables.
    pub fn load(json_path: Option<&Path>) -> Self {
        let mut cfg = Self::default();
        if let Some(path) = json_path {
            if let Ok(text) = std::fs::read_to_string(path) {
                if let Ok(partial) = serde_json::from_str::<serde_json::Value>(&text) {
                    cfg.merge_json(&partial);
                } else {
                    tracing::warn!(path = %path.display(), "failed to parse config JSON, ignoring");
                }
            }
        }
        cfg.merge_env();
        cfg
    }

    fn merge_json(&mut self, v: &serde_json::Value) {
        if let Some(n) = v.get("max_concurrent_stages").and_then(|x| x.as_u64()) {
            self.max_concurrent_stages = n as usize;
        }
        if let Some(b) = v.get("enable_caching").and_then(|x| x.as_bool()) {
            self.enable_caching = b;
        }
        if let Some(b) = v.get("enable_metrics").and_then(|x| x.as_bool()) {
            self.enable_metrics = b;
        }
        if let Some(b) = v.get("enable_error_recovery").and_then(|x| x.as_bool()) {
            self.enable_error_recovery = b;
        }
        if let Some(n) = v.get("processing_timeout_ms").and_then(|x| x.as_u64()) {
            self.processing_timeout_ms = n;
        }
        if let Some(n) = v.get("batch_size").and_then(|x| x.as_u64()) {
            self.batch_size = n as usize;
        }
        if let Some(n) = v.get("max_concurrent").and_then(|x| x.as_u64()) {
            self.max_concurrent = n as usize;
        }
        if let Some(obj) = v.get("stages").and_then(|x| x.as_object()) {
            for (name, stage_val) in obj {
                let entry = self.stages.entry(name.clone()).or_default();
                if let Some(b) = stage_val.get("enabled").and_then(|x| x.as_bool()) {
                    entry.enabled = b;
                }
                if let Some(n) = stage_val.get("timeout_ms").and_then(|x| x.as_u64()) {
                    entry.timeout_ms = n;
                }
            }
        }
    }

    /// `AI_PIPELINE_*` overrides top-level pipeline fields; `AI_STAGE_<NAME>_ENABLED`
    /// (and `_TIMEOUT_MS`) override per-stage config.
    fn merge_env(&mut self) {
        if let Ok(v) = std::env::var("AI_PIPELINE_MAX_CONCURRENT") {
            if let Ok(n) = v.parse() { self.max_concurrent = n; }
        }
        if let Ok(v) = std::env::var("AI_PIPELINE_TIMEOUT_MS") {
            if let Ok(n) = v.parse() { self.processing_timeout_ms = n; }
        }
        if let Ok(v) = std::env::var("AI_PIPELINE_ENABLE_CACHING") {
            self.enable_caching = parse_bool(&v, self.enable_caching);
        }
        if let Ok(v) = std::env::var("AI_PIPELINE_BATCH_SIZE") {
            if let Ok(n) = v.parse() { self.batch_size = n; }
        }

        let stage_names: Vec<String> = self.stages.keys().cloned().collect();
        for name in stage_names {
            let upper = name.to_uppercase();
            let enabled_key = format!("AI_STAGE_{upper}_ENABLED");
            let timeout_key = format!("AI_STAGE_{upper}_TIMEOUT_MS");
            if let Ok(v) = std::env::var(&enabled_key) {
                let entry = self.stages.get_mut(&name).unwrap();
                entry.enabled = parse_bool(&v, entry.enabled);
            }
            if let Ok(v) = std::env::var(&timeout_key) {
                if let Ok(n) = v.parse() {
                    self.stages.get_mut(&name).unwrap().timeout_ms = n;
                }
            }
        }
    }

    pub fn stage(&self, name: &str) -> StageConfig {
        self.stages.get(name).cloned().unwrap_or_default()
    }
}

fn parse_bool(v: &str, default: bool) -> bool {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on"  => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_all_stages() {
        let cfg = EngineConfig::default();
        assert!(cfg.stages.contains_key("validation"));
        assert!(cfg.stages.contains_key("screening_cascade"));
    }

    #[test]
    fn env_override_applies() {
        std::env::set_var("AI_PIPELINE_MAX_CONCURRENT", "42");
        let cfg = EngineConfig::load(None);
        assert_eq!(cfg.max_concurrent, 42);
        std::env::remove_var("AI_PIPELINE_MAX_CONCURRENT");
    }

    #[test]
    fn json_merge_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("screenline_cfg_test_{}", std::process::id()));
        std::fs::write(&dir, r#"{"batch_size": 7}"#).unwrap();
        let cfg = EngineConfig::load(Some(&dir));
        assert_eq!(cfg.batch_size, 7);
        std::fs::remove_file(&dir).ok();
    }
}
