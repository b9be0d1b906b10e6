//! Sortition – deterministic experiment assignment
//!
//! This crate computes reproducible pseudo-random parameter values for a unit
//! of randomization (a user id, a session, ...) under an experiment salt:
//! - A versioned, stable hash engine mapping (salt, unit) to integers and floats
//! - A catalog of random operators (uniform/weighted choice, Bernoulli trial,
//!   random integer/float, sampling without replacement)
//! - An interpreter for assignment programs shipped as JSON documents
//! - Experiments with lazy, memoized, override-aware assignment that log each
//!   exposure exactly once through a pluggable logger

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Experiment configuration and definition documents.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Experiment lifecycle, strategies and logging collaborators.
pub mod experiment;
/// The assignment language: values, AST, parser and evaluator.
pub mod interpreter;
/// Hash engine and random operators.
pub mod random;

// Re-export key types for convenience
pub use config::{ExperimentConfig, ExperimentDefinition};
pub use error::{AssignmentError, ExperimentError, LogError};
pub use experiment::{
    Assignment, AssignmentStrategy, Experiment, ExperimentState, ExposureLogger, ExposureRecord,
    Interpreted, MemoryLogger, Native,
};
pub use interpreter::{Params, Program, Value};
pub use random::{HashVersion, RandomOp};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
