//! Interpreter for the assignment language.
//!
//! Assignment programs are data: a tree of operator nodes, either deserialized
//! from a compiled JSON document or assembled with [`builder`]. The
//! [`Interpreter`] walks that tree against experiment inputs and writes the
//! resulting params into an [`Assignment`](crate::experiment::Assignment).

/// Abstract syntax tree definitions for assignment programs.
pub mod ast;
/// Helpers for building programs in Rust.
pub mod builder;
/// Operator argument handling and pure operators.
pub mod ops;
/// Parser for compiled JSON documents.
pub mod parser;
/// Recursive evaluator.
pub mod runtime;
/// Dynamically typed values.
pub mod value;

pub use ast::{CondBranch, Node, OpKind, Program, PureOp};
pub use parser::parse_node;
pub use runtime::{Evaluation, Interpreter, evaluate_program};
pub use value::{Params, Value};
