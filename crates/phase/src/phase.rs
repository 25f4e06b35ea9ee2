//! A single trajectory segment and its variable/constraint registries.

use std::collections::BTreeMap;
use std::fmt;

use composer_core::{OptionValue, Options};
use serde::Serialize;
use thiserror::Error;

/// Name under which the phase's independent variable can be linked or constrained.
pub const TIME: &str = "time";

/// Registry a variable or constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    State,
    Control,
    Parameter,
    BoundaryConstraint,
    PathConstraint,
}

impl VariableKind {
    /// Option keys accepted for this kind.
    pub fn accepted_keys(self) -> &'static [&'static str] {
        match self {
            VariableKind::State => &[
                "units",
                "lower",
                "upper",
                "ref",
                "ref0",
                "defect_ref",
                "defect_scaler",
                "scaler",
                "rate_source",
                "targets",
                "fix_initial",
                "fix_final",
                "val",
                "opt",
                "shape",
                "continuity",
                "solve_segments",
            ],
            VariableKind::Control => &[
                "units",
                "lower",
                "upper",
                "ref",
                "ref0",
                "scaler",
                "targets",
                "opt",
                "val",
                "shape",
                "continuity",
                "rate_continuity",
                "rate_continuity_scaler",
                "rate2_continuity",
            ],
            VariableKind::Parameter => &[
                "units",
                "val",
                "opt",
                "lower",
                "upper",
                "ref",
                "ref0",
                "scaler",
                "targets",
                "static_target",
                "shape",
            ],
            VariableKind::BoundaryConstraint => &[
                "loc", "lower", "upper", "equals", "ref", "ref0", "scaler", "units", "indices",
                "linear",
            ],
            VariableKind::PathConstraint => &[
                "lower", "upper", "equals", "ref", "ref0", "scaler", "units", "indices", "linear",
            ],
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VariableKind::State => "state",
            VariableKind::Control => "control",
            VariableKind::Parameter => "parameter",
            VariableKind::BoundaryConstraint => "boundary constraint",
            VariableKind::PathConstraint => "path constraint",
        };
        f.write_str(label)
    }
}

/// Endpoint of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Initial,
    Final,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Initial => "initial",
            Location::Final => "final",
        }
    }

    fn parse(value: &OptionValue) -> Option<Self> {
        match value.as_str()? {
            "initial" => Some(Location::Initial),
            "final" => Some(Location::Final),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time options of a phase (`set_time_options`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeOptions {
    pub fix_initial: bool,
    pub duration_bounds: (f64, f64),
    pub duration_ref: f64,
    pub units: String,
}

impl Default for TimeOptions {
    fn default() -> Self {
        Self {
            fix_initial: false,
            duration_bounds: (0.0, f64::INFINITY),
            duration_ref: 1.0,
            units: "s".to_string(),
        }
    }
}

/// Objective attached to one endpoint of a phase variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseObjective {
    pub variable: String,
    pub loc: Location,
    pub reference: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhaseError {
    #[error("{kind} '{variable}' has unsupported option '{key}'")]
    InvalidOption {
        kind: VariableKind,
        variable: String,
        key: String,
    },
    #[error("boundary constraint '{variable}' needs loc 'initial' or 'final' (got {found})")]
    InvalidLocation { variable: String, found: String },
    #[error("'{variable}' is already registered as a {existing}; cannot also add it as a {requested}")]
    ConflictingDefinition {
        variable: String,
        existing: VariableKind,
        requested: VariableKind,
    },
    #[error("phase '{phase}' has no {kind} named '{variable}'")]
    UnknownVariable {
        phase: String,
        kind: VariableKind,
        variable: String,
    },
    #[error("phase '{phase}' already has an objective on '{existing}'")]
    DuplicateObjective { phase: String, existing: String },
}

/// One segment of a trajectory. Registries are keyed by variable name; inserting
/// an existing name replaces its options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    name: String,
    time: TimeOptions,
    states: BTreeMap<String, Options>,
    controls: BTreeMap<String, Options>,
    parameters: BTreeMap<String, Options>,
    boundary_constraints: BTreeMap<String, Options>,
    path_constraints: BTreeMap<String, Options>,
    objective: Option<PhaseObjective>,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: TimeOptions::default(),
            states: BTreeMap::new(),
            controls: BTreeMap::new(),
            parameters: BTreeMap::new(),
            boundary_constraints: BTreeMap::new(),
            path_constraints: BTreeMap::new(),
            objective: None,
        }
    }

    pub fn with_time_options(mut self, time: TimeOptions) -> Self {
        self.time = time;
        self
    }

    pub fn set_time_options(&mut self, time: TimeOptions) {
        self.time = time;
    }

    pub fn add_state(&mut self, name: &str, options: Options) -> Result<(), PhaseError> {
        check_keys(VariableKind::State, name, &options)?;
        if self.controls.contains_key(name) {
            return Err(conflict(name, VariableKind::Control, VariableKind::State));
        }
        self.states.insert(name.to_string(), options);
        Ok(())
    }

    /// Merge `options` into an already registered state.
    pub fn set_state_options(&mut self, name: &str, options: Options) -> Result<(), PhaseError> {
        check_keys(VariableKind::State, name, &options)?;
        let existing = self
            .states
            .get_mut(name)
            .ok_or_else(|| PhaseError::UnknownVariable {
                phase: self.name.clone(),
                kind: VariableKind::State,
                variable: name.to_string(),
            })?;
        existing.extend(options);
        Ok(())
    }

    pub fn add_control(&mut self, name: &str, options: Options) -> Result<(), PhaseError> {
        check_keys(VariableKind::Control, name, &options)?;
        if self.states.contains_key(name) {
            return Err(conflict(name, VariableKind::State, VariableKind::Control));
        }
        self.controls.insert(name.to_string(), options);
        Ok(())
    }

    pub fn add_parameter(&mut self, name: &str, options: Options) -> Result<(), PhaseError> {
        check_keys(VariableKind::Parameter, name, &options)?;
        self.parameters.insert(name.to_string(), options);
        Ok(())
    }

    /// Requires a `loc` option of `initial` or `final`.
    pub fn add_boundary_constraint(
        &mut self,
        name: &str,
        options: Options,
    ) -> Result<(), PhaseError> {
        check_keys(VariableKind::BoundaryConstraint, name, &options)?;
        match options.get("loc") {
            Some(loc) if Location::parse(loc).is_some() => {}
            Some(other) => {
                return Err(PhaseError::InvalidLocation {
                    variable: name.to_string(),
                    found: other.to_string(),
                });
            }
            None => {
                return Err(PhaseError::InvalidLocation {
                    variable: name.to_string(),
                    found: "nothing".to_string(),
                });
            }
        }
        self.boundary_constraints.insert(name.to_string(), options);
        Ok(())
    }

    pub fn add_path_constraint(&mut self, name: &str, options: Options) -> Result<(), PhaseError> {
        check_keys(VariableKind::PathConstraint, name, &options)?;
        self.path_constraints.insert(name.to_string(), options);
        Ok(())
    }

    pub fn add_objective(
        &mut self,
        variable: &str,
        loc: Location,
        reference: f64,
    ) -> Result<(), PhaseError> {
        if let Some(existing) = &self.objective {
            return Err(PhaseError::DuplicateObjective {
                phase: self.name.clone(),
                existing: existing.variable.clone(),
            });
        }
        self.objective = Some(PhaseObjective {
            variable: variable.to_string(),
            loc,
            reference,
        });
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> &TimeOptions {
        &self.time
    }

    pub fn states(&self) -> &BTreeMap<String, Options> {
        &self.states
    }

    pub fn controls(&self) -> &BTreeMap<String, Options> {
        &self.controls
    }

    pub fn parameters(&self) -> &BTreeMap<String, Options> {
        &self.parameters
    }

    pub fn boundary_constraints(&self) -> &BTreeMap<String, Options> {
        &self.boundary_constraints
    }

    pub fn path_constraints(&self) -> &BTreeMap<String, Options> {
        &self.path_constraints
    }

    pub fn objective(&self) -> Option<&PhaseObjective> {
        self.objective.as_ref()
    }

    /// Location of a registered boundary constraint.
    pub fn boundary_location(&self, name: &str) -> Option<Location> {
        self.boundary_constraints
            .get(name)
            .and_then(|opts| opts.get("loc"))
            .and_then(Location::parse)
    }

    /// True for states, controls, and the phase time: everything linkable across phases.
    pub fn has_variable(&self, name: &str) -> bool {
        name == TIME || self.states.contains_key(name) || self.controls.contains_key(name)
    }

    /// Whether a state endpoint is pinned via `fix_initial` / `fix_final`.
    pub fn is_state_fixed(&self, name: &str, loc: Location) -> bool {
        let key = match loc {
            Location::Initial => "fix_initial",
            Location::Final => "fix_final",
        };
        self.states
            .get(name)
            .and_then(|opts| opts.get(key))
            .and_then(OptionValue::as_bool)
            .unwrap_or(false)
    }
}

fn check_keys(kind: VariableKind, variable: &str, options: &Options) -> Result<(), PhaseError> {
    let accepted = kind.accepted_keys();
    match options.keys().find(|key| !accepted.contains(&key.as_str())) {
        Some(key) => Err(PhaseError::InvalidOption {
            kind,
            variable: variable.to_string(),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn conflict(variable: &str, existing: VariableKind, requested: VariableKind) -> PhaseError {
    PhaseError::ConflictingDefinition {
        variable: variable.to_string(),
        existing,
        requested,
    }
}
