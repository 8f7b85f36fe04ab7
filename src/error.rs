//! Error types for cage persistence analysis.
//!
//! Four kinds are scoped to a single structure and never abort a batch:
//! `MissingInput`, `ComputationFailure`, `MalformedDiagram` and
//! `IncompleteDimension`. Everything else (configuration, I/O on the batch
//! artifacts themselves) is batch-fatal.

use thiserror::Error;

/// Unified error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum TdaError {
    /// No coordinate data exists for the identifier
    #[error("no coordinate data for '{id}'")]
    MissingInput { id: String },

    /// Filtration or persistence computation failed (usually resource limits)
    #[error("persistence computation failed for '{id}': {reason}")]
    ComputationFailure { id: String, reason: String },

    /// Stored diagram text could not be repaired or parsed
    #[error("malformed diagram for '{id}': {reason}")]
    MalformedDiagram { id: String, reason: String },

    /// Diagram lacks the Betti dimension a comparison needs
    #[error("'{id}' has no Betti-{dimension} features")]
    IncompleteDimension { id: String, dimension: usize },

    /// Invalid configuration or absent batch input
    #[error("configuration error: {0}")]
    Config(String),

    /// Line-oriented artifact could not be parsed
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("binary encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TdaError {
    pub fn missing(id: impl Into<String>) -> Self {
        TdaError::MissingInput { id: id.into() }
    }

    pub fn computation(id: impl Into<String>, reason: impl Into<String>) -> Self {
        TdaError::ComputationFailure {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        TdaError::MalformedDiagram {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn incomplete(id: impl Into<String>, dimension: usize) -> Self {
        TdaError::IncompleteDimension {
            id: id.into(),
            dimension,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TdaError::Config(message.into())
    }

    /// True for errors recorded against one structure while the batch continues.
    pub fn is_per_structure(&self) -> bool {
        matches!(
            self,
            TdaError::MissingInput { .. }
                | TdaError::ComputationFailure { .. }
                | TdaError::MalformedDiagram { .. }
                | TdaError::IncompleteDimension { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TdaError>;
