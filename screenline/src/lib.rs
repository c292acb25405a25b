//! Multilingual sanctions-screening and name-matching engine.
//!
//! Pipeline: validate → unicode-normalize → detect language → morphologically
//! normalize → generate variants → extract signals → screen against a
//! watchlist via Aho-Corasick tiers, blocking keys and a kNN vector index,
//! fused by a calibrated reranker. See [`engine::Engine`] for the public API.

pub mod blocking;
pub mod cache;
pub mod config;
pub mod dictionaries;
pub mod engine;
pub mod error;
pub mod language;
pub mod metrics;
pub mod monitor;
pub mod morphology;
pub mod orchestrator;
pub mod patterns;
pub mod reranker;
pub mod signals;
pub mod types;
pub mod unicode_norm;
pub mod validator;
pub mod variants;
pub mod vector_index;
pub mod watchlist;

pub use config::EngineConfig;
pub use engine::{Engine, HealthCheck, ProcessingStats};
pub use error::{EngineError, Result};
pub use types::{ProcessingOptions, ScreeningResult, UnifiedProcessingResult};
