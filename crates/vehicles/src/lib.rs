//! Reference missions built on the composition layer, plus the glue that turns a
//! scenario file into a super-problem.

pub mod cannonball;
pub mod climb;
pub mod scenario;

use std::sync::Arc;

use composer_config::PhysicsConfig;
use composer_phase::SubsystemContributor;

pub use cannonball::{
    BallisticFlight, BallisticRates, BallisticState, CannonballMission, CannonballSizing,
    MuzzleEnergyLimit, cannonball_mission,
};
pub use climb::{
    Aerodynamics, AltitudeEnvelope, ClimbForces, ClimbRates, ClimbState, FlightDynamics,
    MinTimeClimbMission, Propulsion, TerminalConditions, min_time_climb_mission,
};
pub use scenario::{
    ScenarioError, build_super_problem, declared_subsystem, mission_specs, vehicle_settings,
};

/// Contributor appended to the phases it names (all phases when empty).
#[derive(Clone)]
pub struct ExtraSubsystem {
    pub phases: Vec<String>,
    pub contributor: Arc<dyn SubsystemContributor>,
}

impl ExtraSubsystem {
    pub fn applies_to(&self, phase: &str) -> bool {
        self.phases.is_empty() || self.phases.iter().any(|p| p == phase)
    }
}

/// Construction-time settings shared by every reference mission.
#[derive(Clone)]
pub struct VehicleSettings {
    pub price_per_kg: f64,
    pub physics: PhysicsConfig,
    pub extras: Vec<ExtraSubsystem>,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self::new(10.0, PhysicsConfig::default())
    }
}

impl VehicleSettings {
    pub fn new(price_per_kg: f64, physics: PhysicsConfig) -> Self {
        Self {
            price_per_kg,
            physics,
            extras: Vec::new(),
        }
    }

    pub fn with_extra(mut self, extra: ExtraSubsystem) -> Self {
        self.extras.push(extra);
        self
    }

    pub(crate) fn extras_for(&self, phase: &str) -> Vec<Arc<dyn SubsystemContributor>> {
        self.extras
            .iter()
            .filter(|e| e.applies_to(phase))
            .map(|e| Arc::clone(&e.contributor))
            .collect()
    }
}
