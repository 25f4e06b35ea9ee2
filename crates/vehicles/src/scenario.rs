//! Scenario file → super-problem.

use std::sync::Arc;

use composer_config::{
    MissionConfig, ObjectiveSenseConfig, ScenarioConfig, SharedVariableConfig, SubsystemConfig,
};
use composer_mission::{
    DesignVariable, MissionSpec, ObjectiveSense, SharedVariable, SuperProblem,
    SuperProblemAssembler, SuperProblemError,
};
use composer_phase::DeclaredSubsystem;
use log::debug;
use thiserror::Error;

use crate::{CannonballMission, ExtraSubsystem, MinTimeClimbMission, VehicleSettings};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("shared variable '{name}' has lower bound {lower} above upper bound {upper}")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
    #[error(transparent)]
    Assembly(#[from] SuperProblemError),
}

/// Construction settings derived from the scenario's sizing, physics, and subsystem tables.
pub fn vehicle_settings(config: &ScenarioConfig) -> VehicleSettings {
    config.subsystems.iter().fold(
        VehicleSettings::new(config.sizing.price_per_kg, config.physics),
        |settings, subsystem| {
            settings.with_extra(ExtraSubsystem {
                phases: subsystem.phases.clone(),
                contributor: Arc::new(declared_subsystem(subsystem)),
            })
        },
    )
}

pub fn declared_subsystem(config: &SubsystemConfig) -> DeclaredSubsystem {
    DeclaredSubsystem {
        name: config.name.clone(),
        states: config.states.clone(),
        controls: config.controls.clone(),
        phase_controls: config.phase_controls.clone(),
        constraints: config.constraints.clone(),
        parameters: config.parameters.clone(),
    }
}

/// One factory per configured mission, in file order.
pub fn mission_specs(config: &ScenarioConfig) -> Vec<Box<dyn MissionSpec>> {
    let settings = vehicle_settings(config);
    config
        .missions
        .iter()
        .map(|mission| -> Box<dyn MissionSpec> {
            match mission {
                MissionConfig::Cannonball { ke_max_j } => {
                    Box::new(CannonballMission::new(*ke_max_j, settings.clone()))
                }
                MissionConfig::MinTimeClimb { height_m } => {
                    Box::new(MinTimeClimbMission::new(*height_m, settings.clone()))
                }
            }
        })
        .collect()
}

fn shared_variable(config: &SharedVariableConfig) -> Result<SharedVariable, ScenarioError> {
    let design = match &config.design {
        Some(bounds) => {
            if let (Some(lower), Some(upper)) = (bounds.lower, bounds.upper) {
                if lower > upper {
                    return Err(ScenarioError::InvalidBounds {
                        name: config.name.clone(),
                        lower,
                        upper,
                    });
                }
            }
            Some(DesignVariable {
                name: config.name.clone(),
                lower: bounds.lower,
                upper: bounds.upper,
                ref0: bounds.ref0,
                reference: bounds.reference,
                units: config.units.clone(),
            })
        }
        None => None,
    };
    Ok(SharedVariable {
        name: config.name.clone(),
        value: config.value,
        units: config.units.clone(),
        design,
    })
}

/// Assemble the scenario. `weights` replaces the configured weights when given.
pub fn build_super_problem(
    config: &ScenarioConfig,
    weights: Option<&[f64]>,
) -> Result<SuperProblem, ScenarioError> {
    let sense = match config.objective.sense {
        ObjectiveSenseConfig::Minimize => ObjectiveSense::Minimize,
        ObjectiveSenseConfig::Maximize => ObjectiveSense::Maximize,
    };
    let mut assembler = SuperProblemAssembler::new()
        .prefix(config.prefix.clone())
        .objective(config.objective.output.clone(), sense);
    for shared in &config.shared {
        assembler = assembler.shared(shared_variable(shared)?);
    }

    let specs = mission_specs(config);
    let weights = weights.unwrap_or(&config.weights);
    debug!(
        "scenario: {} mission(s), {} weight(s), {} shared variable(s)",
        specs.len(),
        weights.len(),
        config.shared.len()
    );
    Ok(assembler.assemble(&specs, weights)?)
}
