//! Programmatic construction of assignment programs.
//!
//! Trees built here are the same values the parser produces, so a program can
//! be assembled in Rust and shipped as a compiled document via
//! [`Program::to_json`](super::Program::to_json).

use std::collections::BTreeMap;

use crate::random::RandomOpKind;

use super::ast::{CondBranch, Node, OpKind, PureOp};
use super::value::Value;

/// Constant node.
pub fn literal(value: impl Into<Value>) -> Node {
    Node::Literal(value.into())
}

/// Variable read.
pub fn get(var: impl Into<String>) -> Node {
    Node::Get(var.into())
}

/// Variable write.
pub fn set(var: impl Into<String>, value: Node) -> Node {
    Node::Set {
        var: var.into(),
        value: Box::new(value),
    }
}

/// Statement sequence.
pub fn seq(statements: Vec<Node>) -> Node {
    Node::Seq(statements)
}

/// Conditional with an optional fallback block.
pub fn cond(branches: Vec<(Node, Node)>, otherwise: Option<Node>) -> Node {
    Node::Cond {
        branches: branches
            .into_iter()
            .map(|(when, then)| CondBranch { when, then })
            .collect(),
        otherwise: otherwise.map(Box::new),
    }
}

/// Early return.
pub fn ret(value: Node) -> Node {
    Node::Return(Box::new(value))
}

/// Generic operator invocation.
pub fn op<K: Into<String>>(kind: OpKind, args: impl IntoIterator<Item = (K, Node)>) -> Node {
    Node::Operator {
        kind,
        args: args
            .into_iter()
            .map(|(name, node)| (name.into(), node))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Random operator invocation.
pub fn random<K: Into<String>>(
    kind: RandomOpKind,
    args: impl IntoIterator<Item = (K, Node)>,
) -> Node {
    op(OpKind::Random(kind), args)
}

/// Pure operator invocation.
pub fn pure<K: Into<String>>(kind: PureOp, args: impl IntoIterator<Item = (K, Node)>) -> Node {
    op(OpKind::Pure(kind), args)
}

/// `uniformChoice` over `choices` seeded by `unit`.
pub fn uniform_choice(choices: Node, unit: Node) -> Node {
    random(
        RandomOpKind::UniformChoice,
        [("choices", choices), ("unit", unit)],
    )
}

/// `weightedChoice` over `choices` seeded by `unit`.
pub fn weighted_choice(choices: Node, weights: Node, unit: Node) -> Node {
    random(
        RandomOpKind::WeightedChoice,
        [("choices", choices), ("weights", weights), ("unit", unit)],
    )
}

/// `bernoulliTrial` with probability `p` seeded by `unit`.
pub fn bernoulli_trial(p: Node, unit: Node) -> Node {
    random(RandomOpKind::BernoulliTrial, [("p", p), ("unit", unit)])
}

/// `randomInteger` in `[min, max]` seeded by `unit`.
pub fn random_integer(min: Node, max: Node, unit: Node) -> Node {
    random(
        RandomOpKind::RandomInteger,
        [("min", min), ("max", max), ("unit", unit)],
    )
}

/// `equals` comparison.
pub fn equals(left: Node, right: Node) -> Node {
    pure(PureOp::Equals, [("left", left), ("right", right)])
}

/// `not` negation.
pub fn not(value: Node) -> Node {
    pure(PureOp::Not, [("value", value)])
}
