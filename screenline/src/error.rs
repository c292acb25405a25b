// Single error sum type for the whole engine.
//
// The original service this was distilled from threw a deep hierarchy of
// exceptions (one subclass per stage). We collapse that into one enum whose
// variants carry the stage that failed and whether the orchestrator may
// retry/skip or must abort the request, matching the error-rule table the
// orchestrator consults per stage.

use crate::types::StageName;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed at {stage:?}: {message}")]
    Validation { stage: StageName, message: String, recoverable: bool },

    #[error("language detection failed at {stage:?}: {message}")]
    LanguageDetection { stage: StageName, message: String, recoverable: bool },

    #[error("normalization failed at {stage:?}: {message}")]
    Normalization { stage: StageName, message: String, recoverable: bool },

    #[error("variant generation failed at {stage:?}: {message}")]
    Variant { stage: StageName, message: String, recoverable: bool },

    #[error("embedding/vector stage failed at {stage:?}: {message}")]
    Embedding { stage: StageName, message: String, recoverable: bool },

    #[error("stage {stage:?} timed out after {elapsed_ms}ms")]
    Timeout { stage: StageName, elapsed_ms: u64 },

    #[error("watchlist unavailable: {message}")]
    WatchlistUnavailable { message: String },

    #[error("cache error: {message}")]
    Cache { message: String },

    #[error("system error: {message}")]
    System { message: String },
}

impl EngineError {
    pub fn stage(&self) -> Option<StageName> {
        match self {
            EngineError::Validation { stage, .. }
            | EngineError::LanguageDetection { stage, .. }
            | EngineError::Normalization { stage, .. }
            | EngineError::Variant { stage, .. }
            | EngineError::Embedding { stage, .. }
            | EngineError::Timeout { stage, .. } => Some(*stage),
            EngineError::WatchlistUnavailable { .. }
            | EngineError::Cache { .. }
            | EngineError::System { .. } => None,
        }
    }

    /// Whether the orchestrator may skip this stage and continue with
    /// degraded output, versus aborting the whole request.
    pub fn recoverable(&self) -> bool {
        match self {
            EngineError::Validation { recoverable, .. }
            | EngineError::LanguageDetection { recoverable, .. }
            | EngineError::Normalization { recoverable, .. }
            | EngineError::Variant { recoverable, .. }
            | EngineError::Embedding { recoverable, .. } => *recoverable,
            EngineError::Timeout { .. } => true,
            EngineError::WatchlistUnavailable { .. } => false,
            EngineError::Cache { .. } => true,
            EngineError::System { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
