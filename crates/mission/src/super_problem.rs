//! N missions combined under disjoint namespaces, sharing promoted sizing inputs
//! and one weighted objective.

use std::collections::{BTreeMap, BTreeSet};

use composer_core::{Case, CaseReader};
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::driver::{Driver, DriverOutcome, SolveReport};
use crate::finalized::{FinalizedMission, MissionSummary};
use crate::objective::{ObjectiveAggregator, ObjectiveSense};
use crate::problem::{MissionError, MissionProblem};
use crate::variables::{ConstraintRecord, DesignVariable, FixedParameter, ObjectiveRecord};

/// Factory for one mission. Called once per mission during assembly, after the
/// weight count has been validated.
pub trait MissionSpec {
    fn build(&self) -> MissionProblem;
}

impl<T: MissionSpec + ?Sized> MissionSpec for Box<T> {
    fn build(&self) -> MissionProblem {
        (**self).build()
    }
}

impl<T: MissionSpec + ?Sized> MissionSpec for &T {
    fn build(&self) -> MissionProblem {
        (**self).build()
    }
}

/// Sizing input consumed identically by every mission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedVariable {
    pub name: String,
    pub value: f64,
    pub units: Option<String>,
    pub design: Option<DesignVariable>,
}

impl SharedVariable {
    /// Held at `value` for the whole solve.
    pub fn fixed(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            units: None,
            design: None,
        }
    }

    /// Optimizable within `[lower, upper]`, starting from `value`.
    pub fn design(name: impl Into<String>, value: f64, lower: f64, upper: f64) -> Self {
        let name = name.into();
        Self {
            design: Some(DesignVariable::new(name.clone()).bounds(lower, upper)),
            name,
            value,
            units: None,
        }
    }

    pub fn scaling(mut self, ref0: f64, reference: f64) -> Self {
        if let Some(dv) = self.design.take() {
            self.design = Some(dv.scaling(ref0, reference));
        }
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        let units = units.into();
        if let Some(dv) = self.design.take() {
            self.design = Some(dv.units(units.clone()));
        }
        self.units = Some(units);
        self
    }
}

#[derive(Debug, Error)]
pub enum SuperProblemError {
    #[error("a super-problem needs at least one mission")]
    NoMissions,
    #[error("more weights than missions ({weights} weights for {missions} missions)")]
    WeightCountMismatch { weights: usize, missions: usize },
    #[error("shared variable '{0}' is declared more than once")]
    DuplicateSharedVariable(String),
    #[error(transparent)]
    Mission(#[from] MissionError),
    #[error("shared variable '{variable}' is not a sizing input of mission '{mission}'")]
    SharedVariableNotConsumed { variable: String, mission: String },
    #[error("mission '{0}' declares no terminal output for the objective")]
    MissingTerminalOutput(String),
    #[error(
        "shared output '{output}' diverged: {reference_mission} = {reference_value}, {mission} = {value}"
    )]
    SharedOutputDivergence {
        output: String,
        reference_mission: String,
        reference_value: f64,
        mission: String,
        value: f64,
    },
    #[error("case has no value for '{0}'")]
    MissingCaseValue(String),
    #[error("driver failed: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Apply the weight rule: more weights than missions is an error; fewer
/// resets every mission to weight 1.
pub fn resolve_weights(missions: usize, weights: &[f64]) -> Result<Vec<f64>, SuperProblemError> {
    if weights.len() > missions {
        return Err(SuperProblemError::WeightCountMismatch {
            weights: weights.len(),
            missions,
        });
    }
    if weights.len() < missions {
        if !weights.is_empty() {
            warn!(
                "{} weight(s) supplied for {missions} missions; using uniform weight 1 for every mission",
                weights.len()
            );
        }
        return Ok(vec![1.0; missions]);
    }
    Ok(weights.to_vec())
}

/// Builds a [`SuperProblem`] from mission factories and weights.
#[derive(Debug, Clone)]
pub struct SuperProblemAssembler {
    prefix: String,
    shared: Vec<SharedVariable>,
    verified_outputs: Option<Vec<String>>,
    alias: String,
    output: String,
    sense: ObjectiveSense,
}

impl Default for SuperProblemAssembler {
    fn default() -> Self {
        Self {
            prefix: "group".to_string(),
            shared: Vec::new(),
            verified_outputs: None,
            alias: "r".to_string(),
            output: "compound_range".to_string(),
            sense: ObjectiveSense::Maximize,
        }
    }
}

impl SuperProblemAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace prefix; mission `i` lives under `<prefix>_<i>`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn shared(mut self, variable: SharedVariable) -> Self {
        self.shared.push(variable);
        self
    }

    /// Outputs checked for equality across missions. Defaults to the sizing
    /// outputs common to every mission.
    pub fn verify_outputs(mut self, outputs: &[&str]) -> Self {
        self.verified_outputs = Some(outputs.iter().map(|o| o.to_string()).collect());
        self
    }

    /// Term alias stem: terms are named `<alias>0`, `<alias>1`, ...
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn objective(mut self, output: impl Into<String>, sense: ObjectiveSense) -> Self {
        self.output = output.into();
        self.sense = sense;
        self
    }

    pub fn assemble<S: MissionSpec>(
        &self,
        missions: &[S],
        weights: &[f64],
    ) -> Result<SuperProblem, SuperProblemError> {
        let weights = resolve_weights(missions.len(), weights)?;
        if missions.is_empty() {
            return Err(SuperProblemError::NoMissions);
        }

        let mut seen = BTreeSet::new();
        for variable in &self.shared {
            if !seen.insert(variable.name.as_str()) {
                return Err(SuperProblemError::DuplicateSharedVariable(
                    variable.name.clone(),
                ));
            }
        }

        let mut finalized = Vec::with_capacity(missions.len());
        let mut folded: BTreeMap<String, DesignVariable> = BTreeMap::new();
        let mut aggregator = ObjectiveAggregator::new(self.output.clone());
        for (i, (spec, weight)) in missions.iter().zip(&weights).enumerate() {
            let namespace = format!("{}_{i}", self.prefix);
            let problem = spec.build();
            info!("assembling mission '{}' as {namespace}", problem.name());
            let mut mission = problem.assemble_in(&namespace)?;

            for variable in &self.shared {
                if !mission
                    .sizing_inputs()
                    .iter()
                    .any(|q| q.name == variable.name)
                {
                    return Err(SuperProblemError::SharedVariableNotConsumed {
                        variable: variable.name.clone(),
                        mission: namespace,
                    });
                }
                if let Some(local) = mission.promote(&variable.name) {
                    folded
                        .entry(variable.name.clone())
                        .or_insert_with(|| local.renamed(variable.name.clone()));
                }
            }

            let terminal = mission
                .terminal_output()
                .ok_or_else(|| SuperProblemError::MissingTerminalOutput(namespace.clone()))?
                .to_string();
            aggregator = aggregator.with_term(format!("{}{i}", self.alias), terminal, *weight);
            finalized.push(mission);
        }

        let mut design_vars = Vec::new();
        let mut fixed = Vec::new();
        for variable in &self.shared {
            match variable.design.clone().or_else(|| folded.remove(&variable.name)) {
                Some(dv) => design_vars.push(dv),
                None => fixed.push(FixedParameter {
                    name: variable.name.clone(),
                    value: variable.value,
                    units: variable.units.clone(),
                }),
            }
        }

        let verified_outputs = match &self.verified_outputs {
            Some(outputs) => outputs.clone(),
            None => common_sizing_outputs(&finalized),
        };

        info!("objective: {}", aggregator.expression());
        Ok(SuperProblem {
            promoted: self.shared.iter().map(|v| v.name.clone()).collect(),
            objective: ObjectiveRecord {
                name: self.output.clone(),
                loc: None,
                reference: None,
                scaler: self.sense.scaler(),
            },
            missions: finalized,
            shared: self.shared.clone(),
            design_vars,
            fixed,
            aggregator,
            weights,
            verified_outputs,
            sense: self.sense,
        })
    }
}

fn common_sizing_outputs(missions: &[FinalizedMission]) -> Vec<String> {
    let Some((first, rest)) = missions.split_first() else {
        return Vec::new();
    };
    first
        .sizing_outputs()
        .iter()
        .map(|q| q.name.clone())
        .filter(|name| {
            rest.iter()
                .all(|m| m.sizing_outputs().iter().any(|q| &q.name == name))
        })
        .collect()
}

/// Assembled multi-mission problem.
#[derive(Debug)]
pub struct SuperProblem {
    missions: Vec<FinalizedMission>,
    shared: Vec<SharedVariable>,
    promoted: BTreeSet<String>,
    design_vars: Vec<DesignVariable>,
    fixed: Vec<FixedParameter>,
    objective: ObjectiveRecord,
    aggregator: ObjectiveAggregator,
    weights: Vec<f64>,
    verified_outputs: Vec<String>,
    sense: ObjectiveSense,
}

/// Serializable structure of a super-problem.
#[derive(Debug, Clone, Serialize)]
pub struct SuperProblemSummary {
    pub shared: Vec<SharedVariable>,
    pub design_variables: Vec<DesignVariable>,
    pub fixed_parameters: Vec<FixedParameter>,
    pub objective: ObjectiveRecord,
    pub expression: String,
    pub sense: ObjectiveSense,
    pub weights: Vec<f64>,
    pub verified_outputs: Vec<String>,
    pub missions: Vec<MissionSummary>,
}

impl SuperProblem {
    pub fn missions(&self) -> &[FinalizedMission] {
        &self.missions
    }

    pub fn mission(&self, namespace: &str) -> Option<&FinalizedMission> {
        self.missions.iter().find(|m| m.namespace() == namespace)
    }

    pub fn shared_variables(&self) -> &[SharedVariable] {
        &self.shared
    }

    /// Promoted design variables followed by every mission's own.
    pub fn design_variables(&self) -> Vec<DesignVariable> {
        let mut all = self.design_vars.clone();
        for mission in &self.missions {
            all.extend(mission.design_variables().iter().cloned());
        }
        all
    }

    pub fn fixed_parameters(&self) -> Vec<FixedParameter> {
        let mut all = self.fixed.clone();
        for mission in &self.missions {
            all.extend(mission.fixed_parameters().iter().cloned());
        }
        all
    }

    pub fn constraints(&self) -> Vec<ConstraintRecord> {
        self.missions
            .iter()
            .flat_map(|m| m.constraints().iter().cloned())
            .collect()
    }

    pub fn objective(&self) -> &ObjectiveRecord {
        &self.objective
    }

    pub fn aggregator(&self) -> &ObjectiveAggregator {
        &self.aggregator
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn verified_outputs(&self) -> &[String] {
        &self.verified_outputs
    }

    /// Write shared values, then every mission's fixed values and initial guess.
    pub fn seed(&self, case: &mut Case) {
        for variable in &self.shared {
            case.set_scalar(variable.name.clone(), variable.value);
        }
        for mission in &self.missions {
            mission.seed(case);
        }
    }

    /// Run every mission's sizing stage against the values in `case`.
    pub fn evaluate_sizing(&self, case: &mut Case) -> Result<(), SuperProblemError> {
        for mission in &self.missions {
            mission.evaluate_sizing(case, &self.promoted)?;
        }
        Ok(())
    }

    /// Check that each verified output holds exactly the same value in every
    /// mission. Returns the agreed values.
    pub fn verify_shared_outputs(
        &self,
        reader: &impl CaseReader,
    ) -> Result<Vec<(String, f64)>, SuperProblemError> {
        let Some((first, rest)) = self.missions.split_first() else {
            return Ok(Vec::new());
        };
        let mut agreed = Vec::with_capacity(self.verified_outputs.len());
        for output in &self.verified_outputs {
            let reference_path = first.path(output);
            let reference_value = reader
                .scalar(&reference_path)
                .ok_or_else(|| SuperProblemError::MissingCaseValue(reference_path.clone()))?;
            for mission in rest {
                let path = mission.path(output);
                let value = reader
                    .scalar(&path)
                    .ok_or_else(|| SuperProblemError::MissingCaseValue(path.clone()))?;
                if value != reference_value {
                    return Err(SuperProblemError::SharedOutputDivergence {
                        output: output.clone(),
                        reference_mission: first.namespace().to_string(),
                        reference_value,
                        mission: mission.namespace().to_string(),
                        value,
                    });
                }
            }
            agreed.push((output.clone(), reference_value));
        }
        Ok(agreed)
    }

    /// `Σ weight_i * terminal_i` read from `reader`.
    pub fn compound_objective(&self, reader: &impl CaseReader) -> Result<f64, SuperProblemError> {
        if let Some(missing) = self
            .aggregator
            .terms()
            .iter()
            .find(|t| reader.terminal(&t.source).is_none())
        {
            return Err(SuperProblemError::MissingCaseValue(missing.source.clone()));
        }
        self.aggregator
            .evaluate(reader)
            .ok_or_else(|| SuperProblemError::MissingCaseValue(self.aggregator.output().to_string()))
    }

    /// Seed `case`, size every mission, run `driver`, then verify shared outputs
    /// and evaluate the compound objective on the result.
    pub fn solve<D: Driver>(
        &self,
        driver: &mut D,
        case: &mut Case,
    ) -> Result<SolveReport, SuperProblemError> {
        self.seed(case);
        self.evaluate_sizing(case)?;
        let outcome = driver
            .run(self, case)
            .map_err(|e| SuperProblemError::Driver(Box::new(e)))?;
        match &outcome {
            DriverOutcome::Converged { iterations } => {
                info!("driver converged after {iterations} iteration(s)")
            }
            DriverOutcome::DidNotConverge { iterations, reason } => {
                warn!("driver stopped after {iterations} iteration(s) without converging: {reason}")
            }
        }
        let shared_outputs = self.verify_shared_outputs(case)?;
        let objective = self.compound_objective(case)?;
        info!("{} = {objective}", self.aggregator.output());
        Ok(SolveReport {
            outcome,
            objective,
            shared_outputs,
        })
    }

    pub fn summary(&self) -> SuperProblemSummary {
        SuperProblemSummary {
            shared: self.shared.clone(),
            design_variables: self.design_vars.clone(),
            fixed_parameters: self.fixed.clone(),
            objective: self.objective.clone(),
            expression: self.aggregator.expression(),
            sense: self.sense,
            weights: self.weights.clone(),
            verified_outputs: self.verified_outputs.clone(),
            missions: self.missions.iter().map(FinalizedMission::summary).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_fewer_than_missions_become_uniform() {
        assert_eq!(resolve_weights(3, &[1.0]).unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(resolve_weights(2, &[]).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn weights_exact_count_kept() {
        assert_eq!(resolve_weights(2, &[2.0, 1.2]).unwrap(), vec![2.0, 1.2]);
    }

    #[test]
    fn too_many_weights_rejected() {
        let err = resolve_weights(2, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            SuperProblemError::WeightCountMismatch {
                weights: 3,
                missions: 2
            }
        ));
    }
}
