//! Error types for the assignment engine
//!
//! Assignment failures are pure-computation errors and are cloneable so a
//! failed experiment can hand the same failure back on every read. Logging
//! failures wrap I/O and encoding errors from the collaborator.

use std::io;
use thiserror::Error;

/// Failures raised while computing an assignment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentError {
    /// Malformed operator parameters or a malformed program document.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A program read a variable that is neither a param nor an input.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// A caller asked for a param that assignment never produced.
    #[error("undefined parameter '{0}'")]
    UndefinedParameter(String),

    /// The document names an operator this interpreter does not implement.
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    /// Numeric range violation (inverted bounds, division by zero, ...).
    #[error("domain error: {0}")]
    Domain(String),
}

impl AssignmentError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        AssignmentError::Validation(message.into())
    }

    pub(crate) fn domain(message: impl Into<String>) -> Self {
        AssignmentError::Domain(message.into())
    }
}

/// Convenience result alias for assignment operations
pub type AssignmentResult<T> = std::result::Result<T, AssignmentError>;

/// Failures surfaced by a logging collaborator.
#[derive(Debug, Error)]
pub enum LogError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Record encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Collaborator-specific failure
    #[error("log sink failed: {0}")]
    Sink(String),
}

/// Convenience result alias for logging operations
pub type LogResult<T> = std::result::Result<T, LogError>;

/// Top-level error returned by [`crate::Experiment`] reads.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Assignment failed; nothing was logged.
    #[error("assignment failed: {0}")]
    Assignment(#[from] AssignmentError),

    /// The exposure could not be logged.
    #[error("exposure logging failed: {0}")]
    Log(#[from] LogError),

    /// Mutation attempted after assignment already ran.
    #[error("experiment '{0}' is frozen after assignment")]
    Frozen(String),
}

/// Result type using ExperimentError
pub type Result<T> = std::result::Result<T, ExperimentError>;
