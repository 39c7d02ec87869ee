//! Error taxonomy for a run

use appforge_sdk::ProviderError;
use thiserror::Error;

use crate::types::ValidationIssue;

/// Aborts the run; reported verbatim to the caller
#[derive(Debug, Error)]
pub enum FatalWorkflowError {
    #[error("failed to process idea: {0}")]
    IdeaProcessing(String),
    #[error("UI generation failed: {0}")]
    UiGeneration(String),
    #[error("failed to persist run: {0}")]
    Persist(#[from] StoreError),
    #[error("run cancelled")]
    Cancelled,
    #[error("stage {to} cannot run after {from}")]
    InvalidTransition { from: String, to: String },
}

/// Outcome of generating one artifact when it could not be produced
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerateError {
    #[error("artifact {name} failed after {attempts} attempts")]
    Exhausted {
        name: String,
        attempts: usize,
        issues: Vec<ValidationIssue>,
    },
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerateError {
    pub fn from_provider(err: ProviderError) -> Option<Self> {
        match err {
            ProviderError::Cancelled => Some(GenerateError::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("duplicate filename in bundle: {0}")]
    DuplicateFilename(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run {0} not found")]
    NotFound(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bundle serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown provider '{0}' (expected openai, anthropic or local)")]
    UnknownProvider(String),
    #[error("missing environment variable {0}")]
    MissingVar(String),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Failure of a single text stage; the engine decides whether it degrades or aborts
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("unusable model output: {0}")]
    Parse(String),
}

impl StageError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageError::Provider(ProviderError::Cancelled))
    }
}
