//! Error types for pid-analyzer
//!
//! Every variant names the pipeline stage that failed so the caller can
//! report extraction, analysis and training failures apart.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Operator-supplied scalars (mode, setpoint, interval, gains)
    Input,
    /// Log scanning
    Extraction,
    /// Step-response metric computation
    Analysis,
    /// Dataset bookkeeping
    Dataset,
    /// Regression fit / prediction
    Training,
    /// Tabular export/import, counter file, artifacts
    Storage,
    /// Configuration loading
    Config,
}

/// pid-analyzer error types
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unparseable operator input
    #[error("Invalid input: {0}")]
    Input(String),

    /// The mode's pattern matched no line of the log
    #[error("Extraction failed: no line matched the {mode} pattern ({lines_scanned} lines scanned)\nCheck that the log was recorded in this mode")]
    Extraction {
        /// Display name of the selected mode
        mode: String,
        /// Number of lines inspected
        lines_scanned: usize,
    },

    /// Setpoint is zero or not finite, which breaks the metric formulas
    #[error("Invalid setpoint {0}: step-response metrics need a finite, non-zero setpoint")]
    InvalidSetpoint(f64),

    /// Too few samples or records for the requested computation
    #[error("Insufficient data for {context}: need at least {needed}, got {available}")]
    InsufficientData {
        /// Stage that ran short of data
        stage: Stage,
        /// What was being computed
        context: String,
        /// Minimum required count
        needed: usize,
        /// Count actually available
        available: usize,
    },

    /// Regression model could not be fit or evaluated
    #[error("Training failed: {0}")]
    Training(String),

    /// Dataset position out of range
    #[error("Index {index} out of range for dataset of {len} records")]
    Index {
        /// Requested position
        index: usize,
        /// Dataset length at the time of the call
        len: usize,
    },

    /// Storage error (Parquet/Arrow schema, counter file, artifacts)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    /// Pipeline stage this error belongs to
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Input(_) => Stage::Input,
            Self::Extraction { .. } => Stage::Extraction,
            Self::InvalidSetpoint(_) => Stage::Analysis,
            Self::InsufficientData { stage, .. } => *stage,
            Self::Training(_) => Stage::Training,
            Self::Index { .. } => Stage::Dataset,
            Self::Storage(_) | Self::Io(_) | Self::Arrow(_) | Self::Parquet(_) => Stage::Storage,
            Self::Config(_) => Stage::Config,
        }
    }

    pub(crate) fn insufficient(
        stage: Stage,
        context: impl Into<String>,
        needed: usize,
        available: usize,
    ) -> Self {
        Self::InsufficientData {
            stage,
            context: context.into(),
            needed,
            available,
        }
    }
}
