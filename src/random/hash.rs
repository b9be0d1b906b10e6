//! Versioned, stable hashing of (salt, unit) pairs
//!
//! Every random draw in the engine is derived from a single call to [`hash`].
//! The key layout and digest are a cross-implementation contract: any engine
//! evaluating the same salt and unit under the same [`HashVersion`] must
//! produce the same integer.
//!
//! Both versions hash the UTF-8 key `salt + "." + join(unit, ".")`.
//! [`HashVersion::Sha1`] (the default) keeps the first 15 hex digits of the
//! SHA-1 digest, which is the bucketing used by existing assignment engines
//! for this document format. [`HashVersion::Blake3`] reads the first eight
//! BLAKE3 digest bytes as a big-endian `u64`.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

use crate::error::{AssignmentError, AssignmentResult};
use crate::interpreter::Value;

/// Largest value produced by [`HashVersion::Sha1`] (15 hex digits).
pub const SHA1_SCALE: u64 = 0x0FFF_FFFF_FFFF_FFFF;

/// Identifies the hash function and key layout used for bucketing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashVersion {
    /// SHA-1 over `salt.unit`, first 15 hex digits.
    #[default]
    Sha1,
    /// BLAKE3 over `salt.unit`, first 8 bytes big-endian.
    Blake3,
}

impl HashVersion {
    /// Stable label written into exposure records.
    pub fn label(&self) -> &'static str {
        match self {
            HashVersion::Sha1 => "sha1-hex15",
            HashVersion::Blake3 => "blake3-be64-v1",
        }
    }

    /// Map a hash produced by this version onto the unit interval.
    ///
    /// SHA-1 hashes divide by `2^60 - 1`, so the top of the range maps to
    /// exactly 1. BLAKE3 hashes keep the top 53 bits and stay strictly below 1.
    pub fn uniform_float(&self, hash: u64) -> f64 {
        match self {
            HashVersion::Sha1 => hash as f64 / SHA1_SCALE as f64,
            HashVersion::Blake3 => (hash >> 11) as f64 / (1u64 << 53) as f64,
        }
    }
}

impl fmt::Display for HashVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Build the canonical key hashed for `salt` and `unit`.
///
/// Fails when the unit is empty or contains nulls or maps, which have no
/// canonical rendering.
pub fn unit_key(salt: &str, unit: &[Value]) -> AssignmentResult<String> {
    if unit.is_empty() {
        return Err(AssignmentError::validation("unit must not be empty"));
    }
    let mut key = String::from(salt);
    for value in unit {
        push_unit_value(&mut key, value)?;
    }
    Ok(key)
}

fn push_unit_value(key: &mut String, value: &Value) -> AssignmentResult<()> {
    match value {
        Value::String(text) => {
            key.push('.');
            key.push_str(text);
        }
        Value::Integer(num) => {
            key.push('.');
            key.push_str(&num.to_string());
        }
        Value::Float(num) => {
            key.push('.');
            key.push_str(&render_float(*num));
        }
        Value::Boolean(flag) => {
            key.push('.');
            key.push_str(if *flag { "true" } else { "false" });
        }
        Value::List(items) => {
            if items.is_empty() {
                return Err(AssignmentError::validation("unit contains an empty list"));
            }
            for item in items {
                push_unit_value(key, item)?;
            }
        }
        Value::Null | Value::Map(_) => {
            return Err(AssignmentError::validation(format!(
                "unit values must be primitive, found {}",
                value.type_name()
            )));
        }
    }
    Ok(())
}

fn render_float(num: f64) -> String {
    if num.is_finite() && num.fract() == 0.0 {
        format!("{:.1}", num)
    } else {
        num.to_string()
    }
}

/// Hash `salt` and `unit` under the given version.
pub fn hash_with(version: HashVersion, salt: &str, unit: &[Value]) -> AssignmentResult<u64> {
    let key = unit_key(salt, unit)?;
    let hash = match version {
        HashVersion::Sha1 => {
            let digest = Sha1::digest(key.as_bytes());
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[..8]);
            // 15 hex digits = top 60 bits
            u64::from_be_bytes(prefix) >> 4
        }
        HashVersion::Blake3 => {
            let mut hasher = Hasher::new();
            hasher.update(key.as_bytes());
            let digest = hasher.finalize();
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest.as_bytes()[..8]);
            u64::from_be_bytes(prefix)
        }
    };
    Ok(hash)
}

/// Hash `salt` and `unit` under the default version.
pub fn hash(salt: &str, unit: &[Value]) -> AssignmentResult<u64> {
    hash_with(HashVersion::default(), salt, unit)
}

/// Map a default-version hash onto `[0, 1]`.
pub fn uniform_float(hash: u64) -> f64 {
    HashVersion::default().uniform_float(hash)
}

/// Map a hash onto the inclusive range `[min, max]`.
pub fn uniform_int(hash: u64, min: i64, max: i64) -> AssignmentResult<i64> {
    if max < min {
        return Err(AssignmentError::domain(format!(
            "upper bound {} is below lower bound {}",
            max, min
        )));
    }
    let span = (max as i128 - min as i128 + 1) as u128;
    let offset = (hash as u128 % span) as i128;
    Ok((min as i128 + offset) as i64)
}
