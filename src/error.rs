//! Error types for the evidence pipeline
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Only [`Error::Schema`] is fatal for a dataset. Data defects are repaired and
//! reported as [`DataQualityIssue`](crate::validation::DataQualityIssue)s, weak
//! evidence becomes an `insufficient_data` evaluation, and external call failures
//! are absorbed by the orchestrator unless they abort the run.

use crate::llm::ParseError;
use crate::retry::ExternalCallError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required identifier column is entirely absent (fatal)
    #[error("Schema error: missing required identifier column(s): {}\nThe dataset cannot be segmented without them.", missing.join(", "))]
    Schema {
        /// Names of the absent columns
        missing: Vec<String>,
    },

    /// Storage error (Parquet/Arrow loading)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Run state machine received an illegal transition
    #[error("Invalid run transition: {from} -> {to}")]
    InvalidTransition {
        /// State the run was in
        from: String,
        /// Requested state
        to: String,
    },

    /// External response could not be parsed (never retried)
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// External call failed after the retry policy gave up
    #[error(transparent)]
    ExternalCall(#[from] ExternalCallError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow/Parquet error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// The run's cancellation token fired
    #[error("Run cancelled")]
    Cancelled,

    /// JSON encoding/decoding of reports and log entries
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must abort an analysis run.
    ///
    /// External-call and parse failures degrade the run instead, unless the
    /// call stopped because the run was cancelled.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::ExternalCall(err) => err.is_cancelled(),
            Self::Parse(_) => false,
            _ => true,
        }
    }
}
