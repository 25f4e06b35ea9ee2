//! Ordered phases plus the continuity linkages between adjacent ones.

use std::collections::BTreeMap;
use std::fmt;

use composer_core::Options;
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use crate::phase::{Phase, PhaseError, VariableKind};

/// Wildcard accepted by [`PhaseLinker::link`] for "every state present in both phases".
pub const ALL_STATES: &str = "*";

/// Continuity constraint: `earlier.final:variable == later.initial:variable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Linkage {
    pub variable: String,
    pub earlier: String,
    pub later: String,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.final:{} == {}.initial:{}",
            self.earlier, self.variable, self.later, self.variable
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrajectoryError {
    #[error("trajectory already has a phase named '{0}'")]
    DuplicatePhase(String),
    #[error("trajectory has no phase named '{0}'")]
    UnknownPhase(String),
    #[error("phases '{earlier}' and '{later}' are not adjacent in trajectory order")]
    NonAdjacentPhases { earlier: String, later: String },
    #[error("cannot link '{variable}': phase '{phase}' does not define it")]
    LinkageVariableMissing { variable: String, phase: String },
    #[error("trajectory is finalized; no further phases, parameters, or linkages may be added")]
    Finalized,
    #[error("trajectory parameter rejected: {0}")]
    Parameter(#[from] PhaseError),
}

/// Phases in flight order, trajectory-level parameters, and linkage records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trajectory {
    phases: Vec<Phase>,
    parameters: BTreeMap<String, Options>,
    linkages: Vec<Linkage>,
    finalized: bool,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_phase(&mut self, phase: Phase) -> Result<(), TrajectoryError> {
        self.ensure_open()?;
        if self.phase(phase.name()).is_some() {
            return Err(TrajectoryError::DuplicatePhase(phase.name().to_string()));
        }
        self.phases.push(phase);
        Ok(())
    }

    /// Parameter shared by every phase (`traj.parameters:<name>`).
    pub fn add_parameter(&mut self, name: &str, options: Options) -> Result<(), TrajectoryError> {
        self.ensure_open()?;
        let accepted = VariableKind::Parameter.accepted_keys();
        if let Some(key) = options.keys().find(|key| !accepted.contains(&key.as_str())) {
            return Err(PhaseError::InvalidOption {
                kind: VariableKind::Parameter,
                variable: name.to_string(),
                key: key.clone(),
            }
            .into());
        }
        self.parameters.insert(name.to_string(), options);
        Ok(())
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name() == name)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn parameters(&self) -> &BTreeMap<String, Options> {
        &self.parameters
    }

    pub fn linkages(&self) -> &[Linkage] {
        &self.linkages
    }

    /// Freeze the structure before it is handed to a solver.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn ensure_open(&self) -> Result<(), TrajectoryError> {
        if self.finalized {
            Err(TrajectoryError::Finalized)
        } else {
            Ok(())
        }
    }

    fn position(&self, name: &str) -> Result<usize, TrajectoryError> {
        self.phases
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| TrajectoryError::UnknownPhase(name.to_string()))
    }
}

/// Creates continuity constraints between adjacent phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseLinker;

impl PhaseLinker {
    /// Link `variables` from the end of `phases.0` to the start of `phases.1`.
    ///
    /// `*` expands to every state present in both phases. All names are checked
    /// before anything is recorded, so a failed call leaves the trajectory
    /// untouched. Returns the number of new linkages.
    pub fn link(
        trajectory: &mut Trajectory,
        phases: (&str, &str),
        variables: &[&str],
    ) -> Result<usize, TrajectoryError> {
        trajectory.ensure_open()?;
        let (earlier_name, later_name) = phases;
        let earlier_idx = trajectory.position(earlier_name)?;
        let later_idx = trajectory.position(later_name)?;
        if later_idx != earlier_idx + 1 {
            return Err(TrajectoryError::NonAdjacentPhases {
                earlier: earlier_name.to_string(),
                later: later_name.to_string(),
            });
        }

        let earlier = &trajectory.phases[earlier_idx];
        let later = &trajectory.phases[later_idx];
        let mut names: Vec<String> = Vec::new();
        for &variable in variables {
            if variable == ALL_STATES {
                let common: Vec<String> = earlier
                    .states()
                    .keys()
                    .filter(|name| later.states().contains_key(*name))
                    .cloned()
                    .collect();
                if common.is_empty() {
                    warn!("'*' linkage between '{earlier_name}' and '{later_name}' matched no states");
                }
                names.extend(common);
                continue;
            }
            for phase in [earlier, later] {
                if !phase.has_variable(variable) {
                    return Err(TrajectoryError::LinkageVariableMissing {
                        variable: variable.to_string(),
                        phase: phase.name().to_string(),
                    });
                }
            }
            names.push(variable.to_string());
        }

        let mut added = 0;
        for variable in names {
            let linkage = Linkage {
                variable,
                earlier: earlier_name.to_string(),
                later: later_name.to_string(),
            };
            if trajectory.linkages.contains(&linkage) {
                continue;
            }
            debug!("linking {linkage}");
            trajectory.linkages.push(linkage);
            added += 1;
        }
        Ok(added)
    }
}
