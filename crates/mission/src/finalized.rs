//! An assembled, frozen mission ready to be handed to a solver.

use std::collections::{BTreeMap, BTreeSet};

use composer_core::{Case, CaseReader};
use composer_phase::Trajectory;
use log::debug;
use serde::Serialize;

use crate::problem::MissionError;
use crate::sizing::{Quantity, SizingStage};
use crate::variables::{
    ConstraintRecord, Connection, DesignVariable, FixedParameter, ObjectiveRecord,
};

/// Prefix `rel` with `namespace` (`group_0` + `mass` → `group_0.mass`).
pub fn qualify(namespace: &str, rel: &str) -> String {
    if namespace.is_empty() {
        rel.to_string()
    } else {
        format!("{namespace}.{rel}")
    }
}

/// Output of [`crate::MissionProblem::assemble`].
#[derive(Debug)]
pub struct FinalizedMission {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) trajectory: Trajectory,
    pub(crate) sizing: Box<dyn SizingStage>,
    pub(crate) sizing_inputs: Vec<Quantity>,
    pub(crate) sizing_outputs: Vec<Quantity>,
    pub(crate) input_defaults: BTreeMap<String, f64>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) design_vars: Vec<DesignVariable>,
    pub(crate) fixed: Vec<FixedParameter>,
    pub(crate) constraints: Vec<ConstraintRecord>,
    pub(crate) objective: Option<ObjectiveRecord>,
    pub(crate) initial_guess: BTreeMap<String, Vec<f64>>,
    pub(crate) terminal_output: Option<String>,
    pub(crate) post_inputs: Vec<String>,
}

/// Serializable structure of a finalized mission.
#[derive(Debug, Clone, Serialize)]
pub struct MissionSummary {
    pub namespace: String,
    pub name: String,
    pub phases: Vec<String>,
    pub linkages: Vec<String>,
    pub sizing_inputs: Vec<String>,
    pub sizing_outputs: Vec<String>,
    pub connections: Vec<Connection>,
    pub design_variables: Vec<DesignVariable>,
    pub fixed_parameters: Vec<FixedParameter>,
    pub constraints: Vec<ConstraintRecord>,
    pub objective: Option<ObjectiveRecord>,
    pub terminal_output: Option<String>,
}

impl FinalizedMission {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn sizing_inputs(&self) -> &[Quantity] {
        &self.sizing_inputs
    }

    pub fn sizing_outputs(&self) -> &[Quantity] {
        &self.sizing_outputs
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn design_variables(&self) -> &[DesignVariable] {
        &self.design_vars
    }

    pub fn fixed_parameters(&self) -> &[FixedParameter] {
        &self.fixed
    }

    pub fn constraints(&self) -> &[ConstraintRecord] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&ObjectiveRecord> {
        self.objective.as_ref()
    }

    pub fn initial_guess(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.initial_guess
    }

    /// Qualified path of the output whose last node is this mission's result.
    pub fn terminal_output(&self) -> Option<&str> {
        self.terminal_output.as_deref()
    }

    pub fn post_mission_inputs(&self) -> &[String] {
        &self.post_inputs
    }

    /// Qualify a mission-relative path with this mission's namespace.
    pub fn path(&self, rel: &str) -> String {
        qualify(&self.namespace, rel)
    }

    /// Hand a sizing input over to a super-level variable named `name`.
    ///
    /// The mission-local fixed parameter and design variable for that input
    /// are dropped; the value is read from the bare name instead.
    pub(crate) fn promote(&mut self, name: &str) -> Option<DesignVariable> {
        let local = self.path(name);
        self.fixed.retain(|p| p.name != local);
        let position = self.design_vars.iter().position(|d| d.name == local)?;
        Some(self.design_vars.remove(position))
    }

    /// Write fixed parameters, sizing defaults, and the initial guess into `case`.
    pub fn seed(&self, case: &mut Case) {
        for parameter in &self.fixed {
            case.set_scalar(parameter.name.clone(), parameter.value);
        }
        for input in &self.sizing_inputs {
            let path = self.path(&input.name);
            if self.design_vars.iter().any(|d| d.name == path) && !case.contains(&path) {
                let value = self
                    .input_defaults
                    .get(&input.name)
                    .copied()
                    .unwrap_or(input.default);
                case.set_scalar(path, value);
            }
        }
        for (path, values) in &self.initial_guess {
            case.set_val(path.clone(), values.clone());
        }
    }

    /// Run the sizing stage on values read from `case`, store its outputs, and
    /// propagate them along every connection.
    ///
    /// Inputs named in `promoted` are read from their bare name; all others from
    /// the mission namespace, falling back to their default.
    pub fn evaluate_sizing(
        &self,
        case: &mut Case,
        promoted: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, f64>, MissionError> {
        let mut inputs = BTreeMap::new();
        for input in &self.sizing_inputs {
            let path = if promoted.contains(&input.name) {
                input.name.clone()
            } else {
                self.path(&input.name)
            };
            let value = case.scalar(&path).unwrap_or_else(|| {
                self.input_defaults
                    .get(&input.name)
                    .copied()
                    .unwrap_or(input.default)
            });
            inputs.insert(input.name.clone(), value);
        }
        let outputs = self
            .sizing
            .compute(&inputs)
            .map_err(|source| MissionError::Sizing {
                mission: self.label().to_string(),
                source,
            })?;
        for (name, value) in &outputs {
            case.set_scalar(self.path(name), *value);
        }
        for connection in &self.connections {
            if let Some(value) = case.scalar(&connection.source) {
                debug!("{} -> {} = {value}", connection.source, connection.target);
                case.set_scalar(connection.target.clone(), value);
            }
        }
        Ok(outputs)
    }

    pub fn summary(&self) -> MissionSummary {
        MissionSummary {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            phases: self
                .trajectory
                .phases()
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
            linkages: self
                .trajectory
                .linkages()
                .iter()
                .map(ToString::to_string)
                .collect(),
            sizing_inputs: self.sizing_inputs.iter().map(|q| q.name.clone()).collect(),
            sizing_outputs: self.sizing_outputs.iter().map(|q| q.name.clone()).collect(),
            connections: self.connections.clone(),
            design_variables: self.design_vars.clone(),
            fixed_parameters: self.fixed.clone(),
            constraints: self.constraints.clone(),
            objective: self.objective.clone(),
            terminal_output: self.terminal_output.clone(),
        }
    }

    fn label(&self) -> &str {
        if self.namespace.is_empty() {
            &self.name
        } else {
            &self.namespace
        }
    }
}
