//! A single mission: pre-mission sizing, one trajectory, and a post-mission stage.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use composer_core::{OptionValue, Options};
use composer_phase::{
    BuildError, Location, Phase, PhaseBuilder, PhaseError, PhaseLinker, SubsystemContributor,
    TimeOptions, Trajectory, TrajectoryError,
};
use log::{debug, info};
use thiserror::Error;

use crate::finalized::{FinalizedMission, qualify};
use crate::post::{NoPostMission, PostMission};
use crate::sizing::{SizingError, SizingStage};
use crate::variables::{
    ConstraintKind, ConstraintRecord, Connection, DesignVariable, FixedParameter, ObjectiveRecord,
};

/// How a trajectory parameter receives its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSource {
    /// Sizing output with exactly the parameter's name.
    Sizing,
    /// Named sizing output (e.g. `mass` feeding parameter `m`).
    Connected(String),
    /// Held constant at the given value.
    Fixed(f64),
    /// Left free for the optimizer.
    Design,
}

/// Parameter shared by every phase of the trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryParameter {
    pub name: String,
    pub options: Options,
    pub source: ParameterSource,
}

impl TrajectoryParameter {
    pub fn sized(name: impl Into<String>, options: Options) -> Self {
        Self::with_source(name, options, ParameterSource::Sizing)
    }

    pub fn connected(name: impl Into<String>, output: impl Into<String>, options: Options) -> Self {
        Self::with_source(name, options, ParameterSource::Connected(output.into()))
    }

    pub fn fixed(name: impl Into<String>, value: f64, options: Options) -> Self {
        Self::with_source(name, options, ParameterSource::Fixed(value))
    }

    pub fn design(name: impl Into<String>, options: Options) -> Self {
        Self::with_source(name, options, ParameterSource::Design)
    }

    fn with_source(name: impl Into<String>, options: Options, source: ParameterSource) -> Self {
        Self {
            name: name.into(),
            options,
            source,
        }
    }
}

/// Blueprint of one phase: its contributors in order plus phase-specific settings.
#[derive(Clone)]
pub struct PhasePlan {
    name: String,
    time: TimeOptions,
    contributors: Vec<Arc<dyn SubsystemContributor>>,
    state_options: Vec<(String, Options)>,
    objective: Option<(String, Location, f64)>,
    initial_guess: Vec<(String, Vec<f64>)>,
}

impl PhasePlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: TimeOptions::default(),
            contributors: Vec::new(),
            state_options: Vec::new(),
            objective: None,
            initial_guess: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(mut self, time: TimeOptions) -> Self {
        self.time = time;
        self
    }

    /// Append a contributor; order matters, later contributors win name collisions.
    pub fn contributor(mut self, contributor: Arc<dyn SubsystemContributor>) -> Self {
        self.contributors.push(contributor);
        self
    }

    pub fn contributors(
        mut self,
        contributors: impl IntoIterator<Item = Arc<dyn SubsystemContributor>>,
    ) -> Self {
        self.contributors.extend(contributors);
        self
    }

    /// Options merged into a contributed state after all contributors ran.
    pub fn state_options(mut self, state: impl Into<String>, options: Options) -> Self {
        self.state_options.push((state.into(), options));
        self
    }

    pub fn objective(mut self, variable: impl Into<String>, loc: Location, reference: f64) -> Self {
        self.objective = Some((variable.into(), loc, reference));
        self
    }

    pub fn guess_time(mut self, t_initial: f64, t_duration: f64) -> Self {
        self.initial_guess
            .push(("t_initial".to_string(), vec![t_initial]));
        self.initial_guess
            .push(("t_duration".to_string(), vec![t_duration]));
        self
    }

    /// Initial and final values of a state guess.
    pub fn guess_state(mut self, state: &str, endpoints: [f64; 2]) -> Self {
        self.initial_guess
            .push((format!("states:{state}"), endpoints.to_vec()));
        self
    }

    pub fn guess_control(mut self, control: &str, endpoints: [f64; 2]) -> Self {
        self.initial_guess
            .push((format!("controls:{control}"), endpoints.to_vec()));
        self
    }
}

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("mission '{mission}' sizing stage declares output '{output}' more than once")]
    DuplicateSizingOutput { mission: String, output: String },
    #[error("mission '{mission}' sets a default for '{input}', which is not a sizing input")]
    UnknownSizingInput { mission: String, input: String },
    #[error("mission '{mission}': {source}")]
    Phase {
        mission: String,
        #[source]
        source: BuildError,
    },
    #[error("mission '{mission}', phase '{phase}': {source}")]
    PhaseOption {
        mission: String,
        phase: String,
        #[source]
        source: PhaseError,
    },
    #[error("mission '{mission}': {source}")]
    Trajectory {
        mission: String,
        #[source]
        source: TrajectoryError,
    },
    #[error(
        "mission '{mission}': trajectory parameter '{parameter}' has no connected source{}",
        .wanted.as_ref().map(|w| format!(" (expected sizing output '{w}')")).unwrap_or_default()
    )]
    UnresolvedParameter {
        mission: String,
        parameter: String,
        wanted: Option<String>,
    },
    #[error("mission '{mission}': {consumer} references unknown trajectory output '{path}'")]
    UnknownTrajectoryOutput {
        mission: String,
        consumer: &'static str,
        path: String,
    },
    #[error("mission '{mission}' declares objectives in both '{first}' and '{second}'")]
    MultipleObjectives {
        mission: String,
        first: String,
        second: String,
    },
    #[error("mission '{mission}' sizing failed: {source}")]
    Sizing {
        mission: String,
        #[source]
        source: SizingError,
    },
}

/// Unassembled mission. Nothing is validated until [`MissionProblem::assemble`].
pub struct MissionProblem {
    name: String,
    sizing: Box<dyn SizingStage>,
    input_defaults: BTreeMap<String, f64>,
    phases: Vec<PhasePlan>,
    links: Vec<(String, String, Vec<String>)>,
    parameters: Vec<TrajectoryParameter>,
    post_mission: Box<dyn PostMission>,
    design_vars: Vec<DesignVariable>,
    terminal_output: Option<String>,
}

impl MissionProblem {
    pub fn new(name: impl Into<String>, sizing: Box<dyn SizingStage>) -> Self {
        Self {
            name: name.into(),
            sizing,
            input_defaults: BTreeMap::new(),
            phases: Vec::new(),
            links: Vec::new(),
            parameters: Vec::new(),
            post_mission: Box::new(NoPostMission),
            design_vars: Vec::new(),
            terminal_output: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Override the default of a sizing input.
    pub fn input_default(mut self, input: impl Into<String>, value: f64) -> Self {
        self.input_defaults.insert(input.into(), value);
        self
    }

    pub fn phase(mut self, plan: PhasePlan) -> Self {
        self.phases.push(plan);
        self
    }

    /// Request continuity of `variables` (or `*`) from `earlier` into `later`.
    pub fn link(mut self, earlier: &str, later: &str, variables: &[&str]) -> Self {
        self.links.push((
            earlier.to_string(),
            later.to_string(),
            variables.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn parameter(mut self, parameter: TrajectoryParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn post_mission(mut self, stage: Box<dyn PostMission>) -> Self {
        self.post_mission = stage;
        self
    }

    /// Problem-level design variable, typically a sizing input.
    pub fn design_var(mut self, variable: DesignVariable) -> Self {
        self.design_vars.push(variable);
        self
    }

    /// Trajectory output whose last node represents the mission result (e.g. `traj.descent.states:r`).
    pub fn terminal_output(mut self, path: impl Into<String>) -> Self {
        self.terminal_output = Some(path.into());
        self
    }

    /// Assemble as a standalone problem with unqualified names.
    pub fn assemble(self) -> Result<FinalizedMission, MissionError> {
        self.assemble_in("")
    }

    /// Assemble with every name qualified by `namespace`.
    pub fn assemble_in(self, namespace: &str) -> Result<FinalizedMission, MissionError> {
        let mission = if namespace.is_empty() {
            self.name.clone()
        } else {
            namespace.to_string()
        };
        let path = |rel: &str| qualify(namespace, rel);

        // (a) pre-mission sizing
        let sizing_inputs = self.sizing.inputs();
        let sizing_outputs = self.sizing.outputs();
        let mut output_names = BTreeSet::new();
        for output in &sizing_outputs {
            if !output_names.insert(output.name.clone()) {
                return Err(MissionError::DuplicateSizingOutput {
                    mission,
                    output: output.name.clone(),
                });
            }
        }
        if let Some(input) = self
            .input_defaults
            .keys()
            .find(|name| !sizing_inputs.iter().any(|q| &q.name == *name))
        {
            return Err(MissionError::UnknownSizingInput {
                mission,
                input: input.clone(),
            });
        }

        // (b) phases
        let trajectory_err = |mission: &str, source| MissionError::Trajectory {
            mission: mission.to_string(),
            source,
        };
        let mut trajectory = Trajectory::new();
        let mut initial_guess = BTreeMap::new();
        let mut objective: Option<ObjectiveRecord> = None;
        for plan in &self.phases {
            let mut builder = PhaseBuilder::new();
            for contributor in &plan.contributors {
                builder.register(contributor.as_ref());
            }
            let mut phase = builder
                .build(Phase::new(plan.name.clone()).with_time_options(plan.time.clone()))
                .map_err(|source| MissionError::Phase {
                    mission: mission.clone(),
                    source,
                })?;
            let phase_err = |source| MissionError::PhaseOption {
                mission: mission.clone(),
                phase: plan.name.clone(),
                source,
            };
            for (state, options) in &plan.state_options {
                phase
                    .set_state_options(state, options.clone())
                    .map_err(phase_err)?;
            }
            if let Some((variable, loc, reference)) = &plan.objective {
                phase
                    .add_objective(variable, *loc, *reference)
                    .map_err(phase_err)?;
                let name = path(&format!("traj.{}.{}", plan.name, variable));
                if let Some(first) = &objective {
                    return Err(MissionError::MultipleObjectives {
                        mission,
                        first: first.name.clone(),
                        second: name,
                    });
                }
                objective = Some(ObjectiveRecord {
                    name,
                    loc: Some(*loc),
                    reference: Some(*reference),
                    scaler: 1.0,
                });
            }
            for (rel, values) in &plan.initial_guess {
                initial_guess.insert(path(&format!("traj.{}.{rel}", plan.name)), values.clone());
            }
            info!(
                "[{mission}] phase '{}' assembled: {} states, {} controls, {} boundary / {} path constraints",
                phase.name(),
                phase.states().len(),
                phase.controls().len(),
                phase.boundary_constraints().len(),
                phase.path_constraints().len()
            );
            trajectory
                .add_phase(phase)
                .map_err(|source| trajectory_err(&mission, source))?;
        }
        for parameter in &self.parameters {
            trajectory
                .add_parameter(&parameter.name, parameter.options.clone())
                .map_err(|source| trajectory_err(&mission, source))?;
        }

        // (c) linkages
        for (earlier, later, variables) in &self.links {
            let names: Vec<&str> = variables.iter().map(String::as_str).collect();
            PhaseLinker::link(&mut trajectory, (earlier, later), &names)
                .map_err(|source| trajectory_err(&mission, source))?;
        }

        // (d) pre-mission outputs → trajectory parameters
        let mut connections = Vec::new();
        let mut fixed = Vec::new();
        let mut design = Vec::new();
        for parameter in &self.parameters {
            let target = path(&format!("traj.parameters:{}", parameter.name));
            let units = text(&parameter.options, "units");
            match &parameter.source {
                ParameterSource::Sizing | ParameterSource::Connected(_) => {
                    let wanted = match &parameter.source {
                        ParameterSource::Connected(output) => output.as_str(),
                        _ => parameter.name.as_str(),
                    };
                    if !output_names.contains(wanted) {
                        return Err(MissionError::UnresolvedParameter {
                            mission,
                            parameter: parameter.name.clone(),
                            wanted: Some(wanted.to_string()),
                        });
                    }
                    debug!("[{mission}] connect {wanted} -> {target}");
                    connections.push(Connection {
                        source: path(wanted),
                        target,
                    });
                }
                ParameterSource::Fixed(value) => fixed.push(FixedParameter {
                    name: target,
                    value: *value,
                    units,
                }),
                ParameterSource::Design => {
                    design.push(DesignVariable::from_options(target, &parameter.options))
                }
            }
        }
        for phase in trajectory.phases() {
            for (name, options) in phase.parameters() {
                if trajectory.parameters().contains_key(name) {
                    continue;
                }
                let target = path(&format!("traj.{}.parameters:{name}", phase.name()));
                if options.get("opt").and_then(OptionValue::as_bool) == Some(true) {
                    design.push(DesignVariable::from_options(target, options));
                } else if output_names.contains(name) {
                    debug!("[{mission}] connect {name} -> {target}");
                    connections.push(Connection {
                        source: path(name),
                        target,
                    });
                } else if let Some(value) = options.get("val").and_then(OptionValue::as_f64) {
                    fixed.push(FixedParameter {
                        name: target,
                        value,
                        units: text(options, "units"),
                    });
                } else {
                    return Err(MissionError::UnresolvedParameter {
                        mission,
                        parameter: format!("{}.{name}", phase.name()),
                        wanted: None,
                    });
                }
            }
        }

        // (e) post-mission inputs and the terminal output must exist
        let outputs = trajectory_outputs(&trajectory);
        let post_inputs = self.post_mission.inputs();
        for input in &post_inputs {
            if !outputs.contains(input) {
                return Err(MissionError::UnknownTrajectoryOutput {
                    mission,
                    consumer: "post-mission stage",
                    path: input.clone(),
                });
            }
        }
        if let Some(terminal) = &self.terminal_output {
            if !outputs.contains(terminal) {
                return Err(MissionError::UnknownTrajectoryOutput {
                    mission,
                    consumer: "terminal output",
                    path: terminal.clone(),
                });
            }
        }

        let mut design_vars: Vec<DesignVariable> = self
            .design_vars
            .iter()
            .map(|dv| dv.renamed(path(&dv.name)))
            .collect();
        for phase in trajectory.phases() {
            let base = format!("traj.{}", phase.name());
            let time = phase.time();
            if !time.fix_initial {
                design_vars.push(
                    DesignVariable::new(path(&format!("{base}.t_initial"))).units(&time.units),
                );
            }
            let mut duration = DesignVariable::new(path(&format!("{base}.t_duration")))
                .bounds(time.duration_bounds.0, time.duration_bounds.1)
                .units(&time.units);
            duration.reference = Some(time.duration_ref);
            design_vars.push(duration);
            for (name, options) in phase.states() {
                design_vars.push(DesignVariable::from_options(
                    path(&format!("{base}.states:{name}")),
                    options,
                ));
            }
            for (name, options) in phase.controls() {
                if options.get("opt").and_then(OptionValue::as_bool) != Some(false) {
                    design_vars.push(DesignVariable::from_options(
                        path(&format!("{base}.controls:{name}")),
                        options,
                    ));
                }
            }
        }
        design_vars.extend(design);

        let design_names: BTreeSet<&str> = self.design_vars.iter().map(|d| d.name.as_str()).collect();
        for input in &sizing_inputs {
            if design_names.contains(input.name.as_str()) {
                continue;
            }
            fixed.push(FixedParameter {
                name: path(&input.name),
                value: self
                    .input_defaults
                    .get(&input.name)
                    .copied()
                    .unwrap_or(input.default),
                units: input.units.clone(),
            });
        }

        let constraints = constraint_records(&trajectory, namespace);
        trajectory.finalize();
        info!(
            "[{mission}] assembled: {} design variables, {} fixed parameters, {} constraints, {} connections",
            design_vars.len(),
            fixed.len(),
            constraints.len(),
            connections.len()
        );

        Ok(FinalizedMission {
            namespace: namespace.to_string(),
            name: self.name,
            trajectory,
            sizing: self.sizing,
            sizing_inputs,
            sizing_outputs,
            input_defaults: self.input_defaults,
            connections,
            design_vars,
            fixed,
            constraints,
            objective,
            initial_guess,
            terminal_output: self.terminal_output.map(|t| path(&t)),
            post_inputs: post_inputs.iter().map(|p| path(p)).collect(),
        })
    }
}

/// Every name a post-mission stage or the super-problem may read from a trajectory.
fn trajectory_outputs(trajectory: &Trajectory) -> BTreeSet<String> {
    let mut outputs = BTreeSet::new();
    for phase in trajectory.phases() {
        let base = format!("traj.{}", phase.name());
        outputs.insert(format!("{base}.t_initial"));
        outputs.insert(format!("{base}.t_duration"));
        outputs.extend(phase.states().keys().map(|s| format!("{base}.states:{s}")));
        outputs.extend(phase.controls().keys().map(|c| format!("{base}.controls:{c}")));
    }
    outputs.extend(
        trajectory
            .parameters()
            .keys()
            .map(|p| format!("traj.parameters:{p}")),
    );
    outputs
}

fn constraint_records(trajectory: &Trajectory, namespace: &str) -> Vec<ConstraintRecord> {
    let mut records = Vec::new();
    for phase in trajectory.phases() {
        let base = format!("traj.{}", phase.name());
        for (name, options) in phase.boundary_constraints() {
            let loc = phase.boundary_location(name).unwrap_or(Location::Final);
            records.push(ConstraintRecord {
                name: qualify(namespace, &format!("{base}.{loc}_boundary_constraints:{name}")),
                kind: ConstraintKind::Boundary { loc },
                options: options.clone(),
            });
        }
        for (name, options) in phase.path_constraints() {
            records.push(ConstraintRecord {
                name: qualify(namespace, &format!("{base}.path_constraints:{name}")),
                kind: ConstraintKind::Path,
                options: options.clone(),
            });
        }
    }
    for linkage in trajectory.linkages() {
        records.push(ConstraintRecord {
            name: qualify(
                namespace,
                &format!(
                    "traj.linkages.{}:{}_final|{}:{}_initial",
                    linkage.earlier, linkage.variable, linkage.later, linkage.variable
                ),
            ),
            kind: ConstraintKind::Linkage,
            options: Options::new(),
        });
    }
    records
}

fn text(options: &Options, key: &str) -> Option<String> {
    options
        .get(key)
        .and_then(OptionValue::as_str)
        .map(str::to_string)
}
