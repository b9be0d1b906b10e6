//! Deterministic random operators.
//!
//! A [`RandomOp`] bundles a [`Distribution`] with the unit and salt that seed
//! it. Native assignment code builds these values directly; the interpreter
//! builds the same values from evaluated operator arguments, so both paths
//! reach the hash engine through identical code.

/// Stable (salt, unit) hashing and derived helpers.
pub mod hash;
/// Operator bodies.
pub mod ops;

pub use hash::{HashVersion, SHA1_SCALE, hash, hash_with, uniform_float, uniform_int, unit_key};
pub use ops::DrawContext;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AssignmentError, AssignmentResult};
use crate::interpreter::Value;

/// Catalog of random operator kinds, as named in compiled documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RandomOpKind {
    /// `uniformChoice`
    UniformChoice,
    /// `weightedChoice`
    WeightedChoice,
    /// `bernoulliTrial`
    BernoulliTrial,
    /// `bernoulliFilter`
    BernoulliFilter,
    /// `randomInteger`
    RandomInteger,
    /// `randomFloat`
    RandomFloat,
    /// `sample`
    Sample,
}

impl RandomOpKind {
    /// Every random operator kind.
    pub const ALL: [RandomOpKind; 7] = [
        RandomOpKind::UniformChoice,
        RandomOpKind::WeightedChoice,
        RandomOpKind::BernoulliTrial,
        RandomOpKind::BernoulliFilter,
        RandomOpKind::RandomInteger,
        RandomOpKind::RandomFloat,
        RandomOpKind::Sample,
    ];

    /// Operator name used in compiled documents.
    pub fn name(&self) -> &'static str {
        match self {
            RandomOpKind::UniformChoice => "uniformChoice",
            RandomOpKind::WeightedChoice => "weightedChoice",
            RandomOpKind::BernoulliTrial => "bernoulliTrial",
            RandomOpKind::BernoulliFilter => "bernoulliFilter",
            RandomOpKind::RandomInteger => "randomInteger",
            RandomOpKind::RandomFloat => "randomFloat",
            RandomOpKind::Sample => "sample",
        }
    }
}

impl FromStr for RandomOpKind {
    type Err = AssignmentError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        RandomOpKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| AssignmentError::UnsupportedOperator(name.to_string()))
    }
}

impl fmt::Display for RandomOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameterized distribution drawn by a random operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    /// One element, equal probability.
    UniformChoice {
        /// Candidate values.
        choices: Vec<Value>,
    },
    /// One element, probability proportional to weight.
    WeightedChoice {
        /// Candidate values.
        choices: Vec<Value>,
        /// Non-negative weights, one per choice.
        weights: Vec<f64>,
    },
    /// 1 with probability `p`, else 0.
    BernoulliTrial {
        /// Success probability.
        p: f64,
    },
    /// Each element kept independently with probability `p`.
    BernoulliFilter {
        /// Keep probability.
        p: f64,
        /// Candidate values.
        choices: Vec<Value>,
    },
    /// Integer in `[min, max]`.
    RandomInteger {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// Float in `[min, max)`.
    RandomFloat {
        /// Inclusive lower bound.
        min: f64,
        /// Exclusive upper bound.
        max: f64,
    },
    /// Sampling without replacement.
    Sample {
        /// Candidate values.
        choices: Vec<Value>,
        /// Number of draws; `None` draws everything.
        draws: Option<i64>,
    },
}

impl Distribution {
    /// Kind tag of this distribution.
    pub fn kind(&self) -> RandomOpKind {
        match self {
            Distribution::UniformChoice { .. } => RandomOpKind::UniformChoice,
            Distribution::WeightedChoice { .. } => RandomOpKind::WeightedChoice,
            Distribution::BernoulliTrial { .. } => RandomOpKind::BernoulliTrial,
            Distribution::BernoulliFilter { .. } => RandomOpKind::BernoulliFilter,
            Distribution::RandomInteger { .. } => RandomOpKind::RandomInteger,
            Distribution::RandomFloat { .. } => RandomOpKind::RandomFloat,
            Distribution::Sample { .. } => RandomOpKind::Sample,
        }
    }

    /// Draw a value for the given context.
    pub fn draw(&self, ctx: &DrawContext<'_>) -> AssignmentResult<Value> {
        match self {
            Distribution::UniformChoice { choices } => ops::uniform_choice(ctx, choices),
            Distribution::WeightedChoice { choices, weights } => {
                ops::weighted_choice(ctx, choices, weights)
            }
            Distribution::BernoulliTrial { p } => ops::bernoulli_trial(ctx, *p).map(Value::Integer),
            Distribution::BernoulliFilter { p, choices } => {
                ops::bernoulli_filter(ctx, *p, choices).map(Value::List)
            }
            Distribution::RandomInteger { min, max } => {
                ops::random_integer(ctx, *min, *max).map(Value::Integer)
            }
            Distribution::RandomFloat { min, max } => {
                ops::random_float(ctx, *min, *max).map(Value::Float)
            }
            Distribution::Sample { choices, draws } => {
                ops::sample(ctx, choices, *draws).map(Value::List)
            }
        }
    }
}

/// A random operator invocation: distribution plus seeding.
///
/// ```
/// use sortition::random::{HashVersion, RandomOp};
///
/// let op = RandomOp::uniform_choice(vec!["a", "b"]).unit(42);
/// let value = op.evaluate("test_name.foo", None, HashVersion::Sha1).unwrap();
/// assert_eq!(value, "b".into());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RandomOp {
    /// What to draw.
    pub distribution: Distribution,
    /// Unit of randomization; `None` falls back to the experiment's default unit.
    pub unit: Option<Vec<Value>>,
    /// Operator salt, appended to the experiment salt.
    pub salt: Option<String>,
    /// Salt used verbatim, without the experiment prefix.
    pub full_salt: Option<String>,
}

impl RandomOp {
    /// Wrap a distribution with no unit or salt yet.
    pub fn new(distribution: Distribution) -> Self {
        Self {
            distribution,
            unit: None,
            salt: None,
            full_salt: None,
        }
    }

    /// `uniformChoice` over `choices`.
    pub fn uniform_choice<T: Into<Value>>(choices: Vec<T>) -> Self {
        Self::new(Distribution::UniformChoice {
            choices: choices.into_iter().map(Into::into).collect(),
        })
    }

    /// `weightedChoice` over `choices`.
    pub fn weighted_choice<T: Into<Value>>(choices: Vec<T>, weights: Vec<f64>) -> Self {
        Self::new(Distribution::WeightedChoice {
            choices: choices.into_iter().map(Into::into).collect(),
            weights,
        })
    }

    /// `bernoulliTrial` with success probability `p`.
    pub fn bernoulli_trial(p: f64) -> Self {
        Self::new(Distribution::BernoulliTrial { p })
    }

    /// `bernoulliFilter` keeping each choice with probability `p`.
    pub fn bernoulli_filter<T: Into<Value>>(p: f64, choices: Vec<T>) -> Self {
        Self::new(Distribution::BernoulliFilter {
            p,
            choices: choices.into_iter().map(Into::into).collect(),
        })
    }

    /// `randomInteger` in `[min, max]`.
    pub fn random_integer(min: i64, max: i64) -> Self {
        Self::new(Distribution::RandomInteger { min, max })
    }

    /// `randomFloat` in `[min, max)`.
    pub fn random_float(min: f64, max: f64) -> Self {
        Self::new(Distribution::RandomFloat { min, max })
    }

    /// `sample` of `draws` elements (all when `None`).
    pub fn sample<T: Into<Value>>(choices: Vec<T>, draws: Option<i64>) -> Self {
        Self::new(Distribution::Sample {
            choices: choices.into_iter().map(Into::into).collect(),
            draws,
        })
    }

    /// Set a single-valued unit.
    pub fn unit(mut self, unit: impl Into<Value>) -> Self {
        self.unit = Some(vec![unit.into()]);
        self
    }

    /// Set a composite unit.
    pub fn units(mut self, unit: Vec<Value>) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the operator salt.
    pub fn salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Set a full salt that bypasses the experiment prefix.
    pub fn full_salt(mut self, salt: impl Into<String>) -> Self {
        self.full_salt = Some(salt.into());
        self
    }

    /// Compose the salt actually hashed.
    ///
    /// `default_salt` is the name of the parameter being assigned and is used
    /// when the operator declares no salt of its own.
    pub fn effective_salt(
        &self,
        experiment_salt: &str,
        default_salt: Option<&str>,
    ) -> AssignmentResult<String> {
        if let Some(full) = &self.full_salt {
            return Ok(full.clone());
        }
        let op_salt = self.salt.as_deref().or(default_salt).ok_or_else(|| {
            AssignmentError::validation(format!(
                "{} needs a salt when not assigned to a parameter",
                self.distribution.kind()
            ))
        })?;
        Ok(format!("{}.{}", experiment_salt, op_salt))
    }

    /// Draw using an already-composed salt; `default_unit` fills a missing unit.
    pub fn evaluate(
        &self,
        salt: &str,
        default_unit: Option<&[Value]>,
        version: HashVersion,
    ) -> AssignmentResult<Value> {
        let unit = match (&self.unit, default_unit) {
            (Some(unit), _) => unit.as_slice(),
            (None, Some(unit)) => unit,
            (None, None) => {
                return Err(AssignmentError::validation(format!(
                    "{} has no unit and the experiment declares no default unit",
                    self.distribution.kind()
                )));
            }
        };
        let ctx = DrawContext {
            salt,
            unit,
            version,
        };
        self.distribution.draw(&ctx)
    }
}
