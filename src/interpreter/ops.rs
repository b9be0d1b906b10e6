//! Operator argument handling and the pure operator catalog.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{AssignmentError, AssignmentResult};
use crate::random::{Distribution, RandomOp, RandomOpKind};

use super::ast::PureOp;
use super::value::{Params, Value};

/// Evaluated arguments of one operator invocation.
#[derive(Debug)]
pub struct Args {
    op: &'static str,
    values: BTreeMap<String, Value>,
}

impl Args {
    /// Wrap evaluated arguments for operator `op`.
    pub fn new(op: &'static str, values: BTreeMap<String, Value>) -> Self {
        Self { op, values }
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    fn required(&mut self, key: &str) -> AssignmentResult<Value> {
        self.take(key).ok_or_else(|| {
            AssignmentError::Validation(format!("{} is missing argument '{}'", self.op, key))
        })
    }

    fn mismatch(&self, key: &str, expected: &str, found: &Value) -> AssignmentError {
        AssignmentError::Validation(format!(
            "{} argument '{}' must be {}, found {}",
            self.op,
            key,
            expected,
            found.type_name()
        ))
    }

    fn list(&mut self, key: &str) -> AssignmentResult<Vec<Value>> {
        match self.required(key)? {
            Value::List(items) => Ok(items),
            other => Err(self.mismatch(key, "a list", &other)),
        }
    }

    fn optional_list(&mut self, key: &str) -> AssignmentResult<Vec<Value>> {
        match self.take(key) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => Ok(items),
            Some(other) => Err(self.mismatch(key, "a list", &other)),
        }
    }

    fn number(&mut self, key: &str) -> AssignmentResult<f64> {
        let value = self.required(key)?;
        value.as_f64().ok_or_else(|| self.mismatch(key, "a number", &value))
    }

    fn integer(&mut self, key: &str) -> AssignmentResult<i64> {
        let value = self.required(key)?;
        self.to_integer(key, &value)
    }

    fn optional_integer(&mut self, key: &str) -> AssignmentResult<Option<i64>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.to_integer(key, &value).map(Some),
        }
    }

    /// Whole floats beyond the `i64` range are a domain error, never clamped.
    fn to_integer(&self, key: &str, value: &Value) -> AssignmentResult<i64> {
        if let Some(num) = value.as_i64() {
            return Ok(num);
        }
        match value {
            Value::Float(num) if num.is_infinite() || num.fract() == 0.0 => {
                Err(AssignmentError::domain(format!(
                    "{} argument '{}' is outside the integer range: {}",
                    self.op, key, num
                )))
            }
            other => Err(self.mismatch(key, "an integer", other)),
        }
    }

    fn optional_string(&mut self, key: &str) -> AssignmentResult<Option<String>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(other) => Err(self.mismatch(key, "a string", &other)),
        }
    }

    fn numbers(&mut self, key: &str) -> AssignmentResult<Vec<f64>> {
        let items = self.list(key)?;
        items
            .iter()
            .map(|item| item.as_f64().ok_or_else(|| self.mismatch(key, "a list of numbers", item)))
            .collect()
    }

    fn into_map(self) -> Params {
        self.values
    }
}

/// Build a [`RandomOp`] from evaluated arguments.
///
/// Recognised seeding arguments: `unit` (scalar or list), `salt`, `full_salt`.
pub fn random_op(kind: RandomOpKind, mut args: Args) -> AssignmentResult<RandomOp> {
    let distribution = match kind {
        RandomOpKind::UniformChoice => Distribution::UniformChoice {
            choices: args.list("choices")?,
        },
        RandomOpKind::WeightedChoice => Distribution::WeightedChoice {
            choices: args.list("choices")?,
            weights: args.numbers("weights")?,
        },
        RandomOpKind::BernoulliTrial => Distribution::BernoulliTrial {
            p: args.number("p")?,
        },
        RandomOpKind::BernoulliFilter => Distribution::BernoulliFilter {
            p: args.number("p")?,
            choices: args.list("choices")?,
        },
        RandomOpKind::RandomInteger => Distribution::RandomInteger {
            min: args.integer("min")?,
            max: args.integer("max")?,
        },
        RandomOpKind::RandomFloat => Distribution::RandomFloat {
            min: args.number("min")?,
            max: args.number("max")?,
        },
        RandomOpKind::Sample => Distribution::Sample {
            choices: args.list("choices")?,
            draws: args.optional_integer("draws")?,
        },
    };

    let mut op = RandomOp::new(distribution);
    op.unit = match args.take("unit") {
        None | Some(Value::Null) => None,
        Some(Value::List(items)) => Some(items),
        Some(value) => Some(vec![value]),
    };
    op.salt = args.optional_string("salt")?;
    op.full_salt = args.optional_string("full_salt")?;
    Ok(op)
}

/// Apply a pure operator to evaluated arguments.
pub fn apply_pure(op: PureOp, mut args: Args) -> AssignmentResult<Value> {
    match op {
        PureOp::Array => Ok(Value::List(args.optional_list("values")?)),
        PureOp::Map => Ok(Value::Map(args.into_map())),
        PureOp::Index => {
            let base = args.required("base")?;
            let index = args.required("index")?;
            index_into(&base, &index)
        }
        PureOp::Length => {
            let value = args.required("value")?;
            let len = match &value {
                Value::List(items) => items.len(),
                Value::String(text) => text.chars().count(),
                Value::Map(entries) => entries.len(),
                Value::Null => 0,
                other => return Err(args.mismatch("value", "a list, string or map", other)),
            };
            Ok(Value::Integer(len as i64))
        }
        PureOp::Equals => {
            let left = args.required("left")?;
            let right = args.required("right")?;
            Ok(Value::Boolean(left == right))
        }
        PureOp::Not => Ok(Value::Boolean(!args.required("value")?.is_truthy())),
        PureOp::And => Ok(Value::Boolean(
            args.optional_list("values")?.iter().all(Value::is_truthy),
        )),
        PureOp::Or => Ok(Value::Boolean(
            args.optional_list("values")?.iter().any(Value::is_truthy),
        )),
        PureOp::Sum => fold_numbers(&mut args, 0, i64::checked_add, |a, b| a + b),
        PureOp::Product => fold_numbers(&mut args, 1, i64::checked_mul, |a, b| a * b),
        PureOp::Negative => match args.required("value")? {
            Value::Integer(num) => num
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| AssignmentError::domain("negative overflowed")),
            Value::Float(num) => Ok(Value::Float(-num)),
            other => Err(args.mismatch("value", "a number", &other)),
        },
        PureOp::Min => extreme(&mut args, Ordering::Less),
        PureOp::Max => extreme(&mut args, Ordering::Greater),
        PureOp::Mod => {
            let left = args.required("left")?;
            let right = args.required("right")?;
            modulo(&args, &left, &right)
        }
        PureOp::Divide => {
            let left = args.number("left")?;
            let right = args.number("right")?;
            if right == 0.0 {
                return Err(AssignmentError::domain("division by zero"));
            }
            Ok(Value::Float(left / right))
        }
        PureOp::GreaterThan => compare(&mut args, |ord| ord == Ordering::Greater),
        PureOp::LessThan => compare(&mut args, |ord| ord == Ordering::Less),
        PureOp::GreaterThanOrEqual => compare(&mut args, |ord| ord != Ordering::Less),
        PureOp::LessThanOrEqual => compare(&mut args, |ord| ord != Ordering::Greater),
        PureOp::Round => {
            let value = args.number("value")?;
            let rounded = value.round();
            if !rounded.is_finite() || rounded.abs() >= 9.2e18 {
                return Err(AssignmentError::domain(format!(
                    "round of {} does not fit an integer",
                    value
                )));
            }
            Ok(Value::Integer(rounded as i64))
        }
        PureOp::Coalesce => Ok(args
            .optional_list("values")?
            .into_iter()
            .find(|value| !matches!(value, Value::Null))
            .unwrap_or(Value::Null)),
    }
}

/// Out-of-range list positions and missing map keys yield `null`.
fn index_into(base: &Value, index: &Value) -> AssignmentResult<Value> {
    match (base, index) {
        (Value::List(items), index) if index.as_i64().is_some() => {
            let position = index.as_i64().unwrap_or(-1);
            Ok(usize::try_from(position)
                .ok()
                .and_then(|pos| items.get(pos))
                .cloned()
                .unwrap_or(Value::Null))
        }
        (Value::Map(entries), Value::String(key)) => {
            Ok(entries.get(key).cloned().unwrap_or(Value::Null))
        }
        (base, index) => Err(AssignmentError::Validation(format!(
            "index cannot index {} with {}",
            base.type_name(),
            index.type_name()
        ))),
    }
}

fn fold_numbers(
    args: &mut Args,
    identity: i64,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> AssignmentResult<Value> {
    let values = args.optional_list("values")?;
    if values.iter().all(|value| matches!(value, Value::Integer(_))) {
        let mut acc = identity;
        for value in &values {
            if let Value::Integer(num) = value {
                acc = int_op(acc, *num).ok_or_else(|| {
                    AssignmentError::domain(format!("{} overflowed", args.op))
                })?;
            }
        }
        return Ok(Value::Integer(acc));
    }

    let mut acc = identity as f64;
    for value in &values {
        let num = value
            .as_f64()
            .ok_or_else(|| args.mismatch("values", "a list of numbers", value))?;
        acc = float_op(acc, num);
    }
    Ok(Value::Float(acc))
}

fn extreme(args: &mut Args, keep: Ordering) -> AssignmentResult<Value> {
    let values = args.list("values")?;
    let mut best: Option<Value> = None;
    for value in values {
        if !value.is_number() {
            return Err(args.mismatch("values", "a list of numbers", &value));
        }
        best = match best {
            Some(current) if value.compare(&current) != Some(keep) => Some(current),
            _ => Some(value),
        };
    }
    best.ok_or_else(|| AssignmentError::Validation(format!("{} of an empty list", args.op)))
}

fn modulo(args: &Args, left: &Value, right: &Value) -> AssignmentResult<Value> {
    match (left, right) {
        (Value::Integer(_), Value::Integer(0)) => Err(AssignmentError::domain("modulo by zero")),
        (Value::Integer(a), Value::Integer(b)) => {
            // Result takes the sign of the divisor.
            let rem = a.wrapping_rem(*b);
            Ok(Value::Integer(if rem != 0 && (rem < 0) != (*b < 0) {
                rem + b
            } else {
                rem
            }))
        }
        (left, right) => {
            let a = left
                .as_f64()
                .ok_or_else(|| args.mismatch("left", "a number", left))?;
            let b = right
                .as_f64()
                .ok_or_else(|| args.mismatch("right", "a number", right))?;
            if b == 0.0 {
                return Err(AssignmentError::domain("modulo by zero"));
            }
            let rem = a % b;
            Ok(Value::Float(if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
                rem + b
            } else {
                rem
            }))
        }
    }
}

fn compare(args: &mut Args, accept: fn(Ordering) -> bool) -> AssignmentResult<Value> {
    let left = args.required("left")?;
    let right = args.required("right")?;
    let ordering = left.compare(&right).ok_or_else(|| {
        AssignmentError::Validation(format!(
            "{} cannot compare {} with {}",
            args.op,
            left.type_name(),
            right.type_name()
        ))
    })?;
    Ok(Value::Boolean(accept(ordering)))
}
