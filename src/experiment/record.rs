//! Exposure and event records handed to logging collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LogResult;
use crate::interpreter::Params;

/// Event name used for automatic and manual exposures.
pub const EXPOSURE_EVENT: &str = "exposure";

/// Identity of one logical exposure, used for dedup across instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExposureKey {
    /// Experiment name.
    pub name: String,
    /// Experiment salt.
    pub salt: String,
    /// Canonical JSON of the inputs.
    pub inputs: String,
}

impl ExposureKey {
    /// Build the key for an experiment instance.
    pub fn new(name: &str, salt: &str, inputs: &Params) -> LogResult<Self> {
        Ok(Self {
            name: name.to_string(),
            salt: salt.to_string(),
            inputs: serde_json::to_string(inputs)?,
        })
    }
}

/// One logged event: the inputs and the effective params at the time.
///
/// Records are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    /// Event type (`exposure` or a caller-defined name).
    pub event: String,
    /// Experiment name.
    pub name: String,
    /// Experiment salt.
    pub salt: String,
    /// Inputs supplied at construction.
    pub inputs: Params,
    /// Override-applied params.
    pub params: Params,
    /// Checksum of the assignment program, when interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Hash version label used for draws.
    pub hash_version: String,
    /// Unique id of this record.
    pub event_id: Uuid,
    /// Wall-clock time the record was built.
    pub time: DateTime<Utc>,
    /// Caller-supplied extra fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Params>,
}

impl ExposureRecord {
    /// Dedup key for this record.
    pub fn key(&self) -> LogResult<ExposureKey> {
        ExposureKey::new(&self.name, &self.salt, &self.inputs)
    }

    /// Whether this is an exposure rather than a custom event.
    pub fn is_exposure(&self) -> bool {
        self.event == EXPOSURE_EVENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Value;

    fn record() -> ExposureRecord {
        let mut inputs = Params::new();
        inputs.insert("i".into(), Value::Integer(42));
        let mut params = Params::new();
        params.insert("foo".into(), Value::from("a"));
        ExposureRecord {
            event: EXPOSURE_EVENT.to_string(),
            name: "test_name".into(),
            salt: "test_name".into(),
            inputs,
            params,
            checksum: None,
            hash_version: "sha1-hex15".into(),
            event_id: Uuid::new_v4(),
            time: Utc::now(),
            extra_data: None,
        }
    }

    #[test]
    fn serializes_inputs_and_params_as_objects() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["inputs"]["i"], 42);
        assert_eq!(json["params"]["foo"], "a");
        assert!(json.get("checksum").is_none());
        let back: ExposureRecord = serde_json::from_value(json).unwrap();
        assert!(back.is_exposure());
    }

    #[test]
    fn key_ignores_event_identity() {
        let first = record();
        let second = record();
        assert_ne!(first.event_id, second.event_id);
        assert_eq!(first.key().unwrap(), second.key().unwrap());
    }

    #[test]
    fn key_is_canonical_inputs_json() {
        let key = record().key().unwrap();
        assert_eq!(key.inputs, r#"{"i":42}"#);

        let mut other = record();
        other.inputs.insert("i".into(), Value::Integer(43));
        assert_ne!(other.key().unwrap(), key);

        let mut non_finite = Params::new();
        non_finite.insert("f".into(), Value::Float(f64::NAN));
        let key = ExposureKey::new("exp", "exp", &non_finite).unwrap();
        assert_eq!(key.inputs, r#"{"f":null}"#);
    }
}
