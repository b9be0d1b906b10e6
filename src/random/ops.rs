//! Numeric bodies of the random operator catalog
//!
//! Each function is pure in (salt, unit, parameters). Operators that need more
//! than one draw hash a per-draw sub-salt (`salt.index`) instead of reusing
//! entropy from a single hash.

use crate::error::{AssignmentError, AssignmentResult};
use crate::interpreter::Value;

use super::hash::{HashVersion, hash_with, uniform_int};

/// Hashing context shared by every draw of one operator invocation.
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    /// Fully composed salt.
    pub salt: &'a str,
    /// Unit of randomization.
    pub unit: &'a [Value],
    /// Hash function version.
    pub version: HashVersion,
}

impl<'a> DrawContext<'a> {
    /// Create a context using the current hash version.
    pub fn new(salt: &'a str, unit: &'a [Value]) -> Self {
        Self {
            salt,
            unit,
            version: HashVersion::default(),
        }
    }

    fn hash(&self) -> AssignmentResult<u64> {
        hash_with(self.version, self.salt, self.unit)
    }

    fn sub_hash(&self, index: usize) -> AssignmentResult<u64> {
        let salt = format!("{}.{}", self.salt, index);
        hash_with(self.version, &salt, self.unit)
    }

    fn uniform(&self) -> AssignmentResult<f64> {
        Ok(self.version.uniform_float(self.hash()?))
    }

    fn sub_uniform(&self, index: usize) -> AssignmentResult<f64> {
        Ok(self.version.uniform_float(self.sub_hash(index)?))
    }
}

fn check_probability(p: f64) -> AssignmentResult<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(AssignmentError::validation(format!(
            "probability {} is outside [0, 1]",
            p
        )));
    }
    Ok(())
}

/// Returns 1 with probability `p`, else 0.
pub fn bernoulli_trial(ctx: &DrawContext<'_>, p: f64) -> AssignmentResult<i64> {
    check_probability(p)?;
    let draw = ctx.uniform()?;
    Ok(if draw < p { 1 } else { 0 })
}

/// Keeps each choice independently with probability `p`.
pub fn bernoulli_filter(
    ctx: &DrawContext<'_>,
    p: f64,
    choices: &[Value],
) -> AssignmentResult<Vec<Value>> {
    check_probability(p)?;
    let mut kept = Vec::new();
    for (index, choice) in choices.iter().enumerate() {
        if ctx.sub_uniform(index)? < p {
            kept.push(choice.clone());
        }
    }
    Ok(kept)
}

/// Picks one element with equal probability.
pub fn uniform_choice(ctx: &DrawContext<'_>, choices: &[Value]) -> AssignmentResult<Value> {
    if choices.is_empty() {
        return Err(AssignmentError::validation(
            "uniformChoice requires at least one choice",
        ));
    }
    let index = uniform_int(ctx.hash()?, 0, choices.len() as i64 - 1)?;
    Ok(choices[index as usize].clone())
}

/// Picks one element with probability proportional to its weight.
pub fn weighted_choice(
    ctx: &DrawContext<'_>,
    choices: &[Value],
    weights: &[f64],
) -> AssignmentResult<Value> {
    if choices.is_empty() {
        return Err(AssignmentError::validation(
            "weightedChoice requires at least one choice",
        ));
    }
    if choices.len() != weights.len() {
        return Err(AssignmentError::validation(format!(
            "weightedChoice has {} choices but {} weights",
            choices.len(),
            weights.len()
        )));
    }
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(AssignmentError::validation(format!(
            "weightedChoice weight {} is negative or not finite",
            bad
        )));
    }

    let mut cumulative = Vec::with_capacity(weights.len());
    let mut total = 0.0;
    for weight in weights {
        total += weight;
        cumulative.push(total);
    }
    if total <= 0.0 {
        return Err(AssignmentError::validation(
            "weightedChoice weights sum to zero",
        ));
    }
    if !total.is_finite() {
        return Err(AssignmentError::validation(
            "weightedChoice weights overflow when summed",
        ));
    }

    let stop = ctx.uniform()? * total;
    let index = cumulative
        .iter()
        .position(|bound| stop < *bound)
        // A draw of exactly 1.0 lands on the last choice with weight.
        .or_else(|| weights.iter().rposition(|w| *w > 0.0))
        .unwrap_or(choices.len() - 1);
    Ok(choices[index].clone())
}

/// Integer in the inclusive range `[min, max]`.
pub fn random_integer(ctx: &DrawContext<'_>, min: i64, max: i64) -> AssignmentResult<i64> {
    if max < min {
        return Err(AssignmentError::domain(format!(
            "randomInteger max {} is below min {}",
            max, min
        )));
    }
    uniform_int(ctx.hash()?, min, max)
}

/// Float in `[min, max)`; SHA-1 draws can also land on `max` itself.
pub fn random_float(ctx: &DrawContext<'_>, min: f64, max: f64) -> AssignmentResult<f64> {
    if !(min.is_finite() && max.is_finite()) || max < min {
        return Err(AssignmentError::domain(format!(
            "randomFloat bounds [{}, {}) are invalid",
            min, max
        )));
    }
    Ok(min + (max - min) * ctx.uniform()?)
}

/// Sampling without replacement.
///
/// Draw `k` removes an index from the remaining pool using sub-salt
/// `salt.k`; `draws` of `None` or beyond the pool size returns a full
/// permutation.
pub fn sample(
    ctx: &DrawContext<'_>,
    choices: &[Value],
    draws: Option<i64>,
) -> AssignmentResult<Vec<Value>> {
    let count = match draws {
        Some(n) if n < 0 => {
            return Err(AssignmentError::validation(format!(
                "sample draws must be non-negative, found {}",
                n
            )));
        }
        Some(n) => (n as usize).min(choices.len()),
        None => choices.len(),
    };

    let mut remaining = choices.to_vec();
    let mut picked = Vec::with_capacity(count);
    for draw in 0..count {
        let index = uniform_int(ctx.sub_hash(draw)?, 0, remaining.len() as i64 - 1)?;
        picked.push(remaining.remove(index as usize));
    }
    Ok(picked)
}
