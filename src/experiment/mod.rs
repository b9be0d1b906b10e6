//! Experiment lifecycle
//!
//! An [`Experiment`] is created per exposure request. It holds the caller's
//! inputs, runs its assignment strategy at most once (on the first read or an
//! explicit [`Experiment::assign`]), merges overrides into an effective param
//! view, and emits at most one exposure record.
//!
//! ```text
//! Created --read/assign--> Assigning --ok--> Assigned{logged: false} --read--> Assigned{logged: true}
//!                                    \--err--> Failed
//! ```

/// Params under construction.
pub mod assignment;
/// Logging collaborators.
pub mod logger;
/// Exposure records.
pub mod record;
/// Native and interpreted assignment strategies.
pub mod strategy;

pub use assignment::Assignment;
pub use logger::{ExposureLogger, JsonLinesLogger, MemoryLogger, NullLogger, read_records};
pub use record::{EXPOSURE_EVENT, ExposureKey, ExposureRecord};
pub use strategy::{AssignmentStrategy, Interpreted, Native};

use chrono::Utc;
use uuid::Uuid;

use crate::config::{ExperimentConfig, ExperimentDefinition};
use crate::error::{AssignmentError, ExperimentError, Result};
use crate::interpreter::{Params, Value};

/// Lifecycle state of an experiment instance.
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentState {
    /// Inputs held, nothing computed yet.
    Created,
    /// Strategy is running.
    Assigning,
    /// Params computed; `logged` tracks the exposure record.
    Assigned {
        /// Whether the exposure has been handled.
        logged: bool,
    },
    /// Assignment failed; the instance stays failed.
    Failed(AssignmentError),
}

/// One experiment exposure request.
pub struct Experiment<S, L> {
    config: ExperimentConfig,
    inputs: Params,
    strategy: S,
    logger: L,
    overrides: Params,
    state: ExperimentState,
    raw: Params,
    effective: Params,
    in_experiment: bool,
}

impl<S: AssignmentStrategy, L: ExposureLogger> Experiment<S, L> {
    /// Create an experiment and run the logger's setup hook.
    pub fn new(config: ExperimentConfig, inputs: Params, strategy: S, logger: L) -> Result<Self> {
        logger.configure()?;
        Ok(Self {
            config,
            inputs,
            strategy,
            logger,
            overrides: Params::new(),
            state: ExperimentState::Created,
            raw: Params::new(),
            effective: Params::new(),
            in_experiment: true,
        })
    }

    /// Experiment name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Salt used to prefix every operator salt.
    pub fn salt(&self) -> &str {
        self.config.effective_salt()
    }

    /// Inputs supplied at construction.
    pub fn inputs(&self) -> &Params {
        &self.inputs
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &ExperimentState {
        &self.state
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// The logging collaborator.
    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Install param overrides. Only allowed before assignment runs.
    pub fn set_overrides(&mut self, overrides: Params) -> Result<()> {
        self.require_created()?;
        self.overrides = overrides;
        Ok(())
    }

    /// Toggle automatic exposure logging on reads. Only allowed before
    /// assignment runs.
    pub fn set_auto_exposure_log(&mut self, enabled: bool) -> Result<()> {
        self.require_created()?;
        self.config.auto_exposure_log = enabled;
        Ok(())
    }

    fn require_created(&self) -> Result<()> {
        if self.state != ExperimentState::Created {
            return Err(ExperimentError::Frozen(self.config.name.clone()));
        }
        Ok(())
    }

    /// Run assignment now without logging an exposure.
    pub fn assign(&mut self) -> Result<()> {
        self.ensure_assigned()
    }

    /// Read one param, logging the exposure on the first successful read.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        self.ensure_assigned()?;
        let value = self
            .effective
            .get(name)
            .cloned()
            .ok_or_else(|| AssignmentError::UndefinedParameter(name.to_string()))?;
        self.auto_expose()?;
        Ok(value)
    }

    /// Read one param or fall back to `default`; still an exposure.
    pub fn get_or(&mut self, name: &str, default: impl Into<Value>) -> Result<Value> {
        self.ensure_assigned()?;
        self.auto_expose()?;
        Ok(self
            .effective
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.into()))
    }

    /// Read every effective param, logging the exposure on first use.
    pub fn get_params(&mut self) -> Result<Params> {
        self.ensure_assigned()?;
        self.auto_expose()?;
        Ok(self.effective.clone())
    }

    /// Params exactly as assignment produced them, before overrides.
    pub fn raw_params(&mut self) -> Result<&Params> {
        self.ensure_assigned()?;
        Ok(&self.raw)
    }

    /// Whether the unit is in the experiment. Does not log.
    pub fn in_experiment(&mut self) -> Result<bool> {
        self.ensure_assigned()?;
        Ok(self.in_experiment)
    }

    /// Log the exposure explicitly; a no-op once it has been logged.
    pub fn log_exposure(&mut self, extra_data: Option<Params>) -> Result<()> {
        self.ensure_assigned()?;
        self.expose(extra_data)
    }

    /// Log a custom event carrying the current params. Never counts as the
    /// exposure.
    pub fn log_event(&mut self, event: &str, extra_data: Option<Params>) -> Result<()> {
        self.ensure_assigned()?;
        if event == EXPOSURE_EVENT {
            return self.expose(extra_data);
        }
        let record = self.record(event, extra_data);
        self.logger.log(&record)?;
        tracing::debug!(experiment = %self.config.name, event, "logged event");
        Ok(())
    }

    fn ensure_assigned(&mut self) -> Result<()> {
        match &self.state {
            ExperimentState::Assigned { .. } => return Ok(()),
            ExperimentState::Failed(err) => return Err(err.clone().into()),
            ExperimentState::Assigning => {
                return Err(AssignmentError::validation(format!(
                    "experiment '{}' re-entered assignment",
                    self.config.name
                ))
                .into());
            }
            ExperimentState::Created => {}
        }

        self.state = ExperimentState::Assigning;
        tracing::debug!(experiment = %self.config.name, salt = %self.salt(), "assigning");

        match self.run_strategy() {
            Ok(assignment) => {
                self.in_experiment = assignment.in_experiment();
                self.raw = assignment.into_params();
                self.effective = self.raw.clone();
                self.effective
                    .extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
                self.state = ExperimentState::Assigned { logged: false };
                tracing::debug!(
                    experiment = %self.config.name,
                    params = self.raw.len(),
                    overrides = self.overrides.len(),
                    in_experiment = self.in_experiment,
                    "assignment complete"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(experiment = %self.config.name, error = %err, "assignment failed");
                self.state = ExperimentState::Failed(err.clone());
                Err(err.into())
            }
        }
    }

    fn run_strategy(&mut self) -> std::result::Result<Assignment, AssignmentError> {
        let mut assignment = Assignment::new(self.config.effective_salt())
            .with_hash_version(self.config.hash_version);
        if !self.config.default_unit.is_empty() {
            let unit = self
                .config
                .default_unit
                .iter()
                .map(|name| {
                    self.inputs
                        .get(name)
                        .cloned()
                        .ok_or_else(|| AssignmentError::UndefinedVariable(name.clone()))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            assignment = assignment.with_default_unit(unit);
        }
        self.strategy.assign(&mut assignment, &self.inputs)?;
        Ok(assignment)
    }

    fn auto_expose(&mut self) -> Result<()> {
        if self.config.auto_exposure_log {
            self.expose(None)?;
        }
        Ok(())
    }

    fn expose(&mut self, extra_data: Option<Params>) -> Result<()> {
        if self.state != (ExperimentState::Assigned { logged: false }) {
            return Ok(());
        }

        if !self.in_experiment {
            tracing::debug!(experiment = %self.config.name, "unit not in experiment; no exposure");
            self.state = ExperimentState::Assigned { logged: true };
            return Ok(());
        }

        let key = ExposureKey::new(&self.config.name, self.salt(), &self.inputs)?;
        if self.logger.previously_logged(&key)? {
            tracing::debug!(experiment = %self.config.name, "exposure previously logged");
            self.state = ExperimentState::Assigned { logged: true };
            return Ok(());
        }

        let record = self.record(EXPOSURE_EVENT, extra_data);
        if let Err(err) = self.logger.log(&record) {
            tracing::warn!(experiment = %self.config.name, error = %err, "exposure logging failed");
            return Err(err.into());
        }
        tracing::info!(
            experiment = %self.config.name,
            event_id = %record.event_id,
            "exposure logged"
        );
        self.state = ExperimentState::Assigned { logged: true };
        Ok(())
    }

    fn record(&self, event: &str, extra_data: Option<Params>) -> ExposureRecord {
        ExposureRecord {
            event: event.to_string(),
            name: self.config.name.clone(),
            salt: self.salt().to_string(),
            inputs: self.inputs.clone(),
            params: self.effective.clone(),
            checksum: self.strategy.checksum(),
            hash_version: self.config.hash_version.label().to_string(),
            event_id: Uuid::new_v4(),
            time: Utc::now(),
            extra_data,
        }
    }
}

impl<L: ExposureLogger> Experiment<Interpreted, L> {
    /// Build an interpreted experiment from a definition document.
    pub fn from_definition(definition: ExperimentDefinition, inputs: Params, logger: L) -> Result<Self> {
        let ExperimentDefinition { config, program } = definition;
        Self::new(config, inputs, Interpreted::new(program), logger)
    }
}
