//! Experiment configuration and definition documents
//!
//! A definition is a JSON document pairing an [`ExperimentConfig`] with a
//! compiled assignment program:
//!
//! ```json
//! {
//!   "name": "button_color",
//!   "default_unit": ["userid"],
//!   "program": {"op": "seq", "seq": [...]}
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::interpreter::Program;
use crate::random::HashVersion;

/// Per-experiment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Experiment name, written into every record.
    pub name: String,

    /// Salt prefix for every draw; defaults to the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// Input names whose values form the default unit.
    pub default_unit: Vec<String>,

    /// Log the exposure automatically on the first param read.
    pub auto_exposure_log: bool,

    /// Hash function version used for draws.
    pub hash_version: HashVersion,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "experiment".to_string(),
            salt: None,
            default_unit: Vec::new(),
            auto_exposure_log: true,
            hash_version: HashVersion::default(),
        }
    }
}

impl ExperimentConfig {
    /// Configuration with the given name and defaults elsewhere.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Use an explicit salt instead of the name.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Declare the inputs forming the default unit.
    pub fn with_default_unit(mut self, inputs: Vec<String>) -> Self {
        self.default_unit = inputs;
        self
    }

    /// Salt actually used for hashing.
    pub fn effective_salt(&self) -> &str {
        self.salt.as_deref().unwrap_or(&self.name)
    }
}

/// An interpreted experiment: configuration plus program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    /// Experiment settings.
    #[serde(flatten)]
    pub config: ExperimentConfig,
    /// Compiled assignment program.
    pub program: Program,
}

impl ExperimentDefinition {
    /// Parse a definition held in a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to deserialize experiment definition")
    }
}

/// Load an experiment definition from disk.
pub fn load_definition(path: &Path) -> Result<ExperimentDefinition> {
    let data = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let definition = serde_json::from_slice(&data)
        .with_context(|| format!("Failed to deserialize experiment definition: {:?}", path))?;
    Ok(definition)
}

/// Write an experiment definition to disk.
pub fn write_definition(path: &Path, definition: &ExperimentDefinition) -> Result<()> {
    let json =
        serde_json::to_vec_pretty(definition).context("Failed to serialize experiment definition")?;
    fs::write(path, json).with_context(|| format!("Failed to write file: {:?}", path))?;
    Ok(())
}
