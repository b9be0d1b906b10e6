use crate::error::AssignmentResult;
use crate::interpreter::{Params, Value};
use crate::random::{HashVersion, RandomOp};

/// Param set under construction during one assignment pass.
///
/// Native assignment code receives `&mut Assignment` and fills it with
/// [`Assignment::set`] and [`Assignment::draw`]; the interpreter writes
/// through the same methods, so both paths salt and hash identically.
#[derive(Debug, Clone)]
pub struct Assignment {
    experiment_salt: String,
    hash_version: HashVersion,
    default_unit: Option<Vec<Value>>,
    params: Params,
    in_experiment: bool,
}

impl Assignment {
    /// Start an empty assignment for the given experiment salt.
    pub fn new(experiment_salt: impl Into<String>) -> Self {
        Self {
            experiment_salt: experiment_salt.into(),
            hash_version: HashVersion::default(),
            default_unit: None,
            params: Params::new(),
            in_experiment: true,
        }
    }

    /// Unit used by random operators that declare none.
    pub fn with_default_unit(mut self, unit: Vec<Value>) -> Self {
        self.default_unit = Some(unit);
        self
    }

    /// Pin the hash version used for every draw.
    pub fn with_hash_version(mut self, version: HashVersion) -> Self {
        self.hash_version = version;
        self
    }

    /// Experiment salt prefixed onto every operator salt.
    pub fn experiment_salt(&self) -> &str {
        &self.experiment_salt
    }

    /// Hash version used for draws.
    pub fn hash_version(&self) -> HashVersion {
        self.hash_version
    }

    /// Default unit, if the experiment declares one.
    pub fn default_unit(&self) -> Option<&[Value]> {
        self.default_unit.as_deref()
    }

    /// Store a plain value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(name.into(), value.into());
    }

    /// Draw `op` salted by the param name and store the result under `name`.
    pub fn draw(&mut self, name: impl Into<String>, op: RandomOp) -> AssignmentResult<Value> {
        let name = name.into();
        let value = self.evaluate_random(&op, Some(name.as_str()))?;
        self.params.insert(name, value.clone());
        Ok(value)
    }

    /// Draw `op` without storing it. `default_salt` is used when the operator
    /// carries no salt of its own.
    pub fn evaluate_random(
        &self,
        op: &RandomOp,
        default_salt: Option<&str>,
    ) -> AssignmentResult<Value> {
        let salt = op.effective_salt(&self.experiment_salt, default_salt)?;
        op.evaluate(&salt, self.default_unit(), self.hash_version)
    }

    /// Read a param assigned so far.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// All params assigned so far.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Consume the assignment, keeping only the params.
    pub fn into_params(self) -> Params {
        self.params
    }

    /// Whether the unit participates in the experiment (and gets logged).
    pub fn in_experiment(&self) -> bool {
        self.in_experiment
    }

    /// Mark the unit as in or out of the experiment.
    pub fn set_in_experiment(&mut self, in_experiment: bool) {
        self.in_experiment = in_experiment;
    }
}
