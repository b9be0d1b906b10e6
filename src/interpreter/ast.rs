use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AssignmentError;
use crate::random::RandomOpKind;

use super::parser::parse_node;
use super::value::Value;

/// Assignment program node.
///
/// Programs are finite trees; evaluation is a pre-order walk.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Constant value.
    Literal(Value),
    /// Bare list whose elements are evaluated in order.
    List(Vec<Node>),
    /// Read a param, falling back to inputs.
    Get(String),
    /// Evaluate `value` and store it as a param.
    Set {
        /// Parameter name.
        var: String,
        /// Value expression.
        value: Box<Node>,
    },
    /// Statements evaluated in order; yields the last value.
    Seq(Vec<Node>),
    /// First branch whose predicate is truthy wins.
    Cond {
        /// Branches evaluated in order.
        branches: Vec<CondBranch>,
        /// Fallback block when no predicate matches.
        otherwise: Option<Box<Node>>,
    },
    /// Stop the program; the value's truthiness decides `in_experiment`.
    Return(Box<Node>),
    /// Operator invocation with named arguments.
    Operator {
        /// Operator kind.
        kind: OpKind,
        /// Argument expressions, evaluated in key order.
        args: BTreeMap<String, Node>,
    },
}

/// One `if`/`then` pair of a `cond`.
#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    /// Predicate expression.
    pub when: Node,
    /// Block evaluated when the predicate holds.
    pub then: Node,
}

/// Operator catalog: random draws and pure utilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Hash-seeded random operator.
    Random(RandomOpKind),
    /// Deterministic utility operator.
    Pure(PureOp),
}

impl OpKind {
    /// Operator name used in compiled documents.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Random(kind) => kind.name(),
            OpKind::Pure(op) => op.name(),
        }
    }
}

impl FromStr for OpKind {
    type Err = AssignmentError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if let Ok(kind) = name.parse::<RandomOpKind>() {
            return Ok(OpKind::Random(kind));
        }
        name.parse::<PureOp>().map(OpKind::Pure)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deterministic utility operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PureOp {
    /// `array {values}`
    Array,
    /// `map {..}` builds a map from its arguments.
    Map,
    /// `index {base, index}`
    Index,
    /// `length {value}`
    Length,
    /// `equals {left, right}`
    Equals,
    /// `not {value}`
    Not,
    /// `and {values}`, short-circuiting.
    And,
    /// `or {values}`, short-circuiting.
    Or,
    /// `sum {values}` (also `add`).
    Sum,
    /// `product {values}`
    Product,
    /// `negative {value}`
    Negative,
    /// `min {values}`
    Min,
    /// `max {values}`
    Max,
    /// `% {left, right}`
    Mod,
    /// `/ {left, right}`
    Divide,
    /// `> {left, right}`
    GreaterThan,
    /// `< {left, right}`
    LessThan,
    /// `>= {left, right}`
    GreaterThanOrEqual,
    /// `<= {left, right}`
    LessThanOrEqual,
    /// `round {value}`
    Round,
    /// `coalesce {values}`
    Coalesce,
}

impl PureOp {
    /// Every pure operator.
    pub const ALL: [PureOp; 21] = [
        PureOp::Array,
        PureOp::Map,
        PureOp::Index,
        PureOp::Length,
        PureOp::Equals,
        PureOp::Not,
        PureOp::And,
        PureOp::Or,
        PureOp::Sum,
        PureOp::Product,
        PureOp::Negative,
        PureOp::Min,
        PureOp::Max,
        PureOp::Mod,
        PureOp::Divide,
        PureOp::GreaterThan,
        PureOp::LessThan,
        PureOp::GreaterThanOrEqual,
        PureOp::LessThanOrEqual,
        PureOp::Round,
        PureOp::Coalesce,
    ];

    /// Operator name used in compiled documents.
    pub fn name(&self) -> &'static str {
        match self {
            PureOp::Array => "array",
            PureOp::Map => "map",
            PureOp::Index => "index",
            PureOp::Length => "length",
            PureOp::Equals => "equals",
            PureOp::Not => "not",
            PureOp::And => "and",
            PureOp::Or => "or",
            PureOp::Sum => "sum",
            PureOp::Product => "product",
            PureOp::Negative => "negative",
            PureOp::Min => "min",
            PureOp::Max => "max",
            PureOp::Mod => "%",
            PureOp::Divide => "/",
            PureOp::GreaterThan => ">",
            PureOp::LessThan => "<",
            PureOp::GreaterThanOrEqual => ">=",
            PureOp::LessThanOrEqual => "<=",
            PureOp::Round => "round",
            PureOp::Coalesce => "coalesce",
        }
    }
}

impl FromStr for PureOp {
    type Err = AssignmentError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name == "add" {
            return Ok(PureOp::Sum);
        }
        PureOp::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| AssignmentError::UnsupportedOperator(name.to_string()))
    }
}

impl Node {
    /// Serialize the node into the compiled document format.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Map, Value as Json, json};

        match self {
            Node::Literal(value) => match value {
                Value::List(_) | Value::Map(_) => json!({"op": "literal", "value": value.to_json()}),
                scalar => scalar.to_json(),
            },
            Node::List(items) => Json::Array(items.iter().map(Node::to_json).collect()),
            Node::Get(var) => json!({"op": "get", "var": var}),
            Node::Set { var, value } => json!({"op": "set", "var": var, "value": value.to_json()}),
            Node::Seq(statements) => json!({
                "op": "seq",
                "seq": statements.iter().map(Node::to_json).collect::<Vec<_>>(),
            }),
            Node::Cond {
                branches,
                otherwise,
            } => {
                let arms: Vec<Json> = branches
                    .iter()
                    .map(|branch| json!({"if": branch.when.to_json(), "then": branch.then.to_json()}))
                    .collect();
                let mut doc = json!({"op": "cond", "cond": arms});
                if let (Some(block), Some(fields)) = (otherwise, doc.as_object_mut()) {
                    fields.insert("else".to_string(), block.to_json());
                }
                doc
            }
            Node::Return(value) => json!({"op": "return", "value": value.to_json()}),
            Node::Operator { kind, args } => {
                let mut fields = Map::new();
                fields.insert("op".to_string(), Json::String(kind.name().to_string()));
                for (name, arg) in args {
                    fields.insert(name.clone(), arg.to_json());
                }
                Json::Object(fields)
            }
        }
    }
}

/// A compiled assignment program.
///
/// (De)serializes as the compiled document itself, e.g.
/// `{"op": "seq", "seq": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct Program {
    /// Root node, usually a `seq`.
    pub root: Node,
}

impl Program {
    /// Wrap an already-built tree.
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// Parse a compiled document held in a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, AssignmentError> {
        let doc: serde_json::Value = serde_json::from_str(text).map_err(|err| {
            AssignmentError::Validation(format!("program is not valid JSON: {}", err))
        })?;
        Program::try_from(doc)
    }

    /// Serialize back into the compiled document format.
    pub fn to_json(&self) -> serde_json::Value {
        self.root.to_json()
    }

    /// First 8 hex digits of the BLAKE3 hash of the serialized document.
    pub fn checksum(&self) -> String {
        let text = self.to_json().to_string();
        let digest = blake3::hash(text.as_bytes());
        digest.to_hex()[..8].to_string()
    }
}

impl TryFrom<serde_json::Value> for Program {
    type Error = AssignmentError;

    fn try_from(doc: serde_json::Value) -> Result<Self, Self::Error> {
        parse_node(&doc).map(Program::new)
    }
}

impl From<Program> for serde_json::Value {
    fn from(program: Program) -> Self {
        program.to_json()
    }
}
