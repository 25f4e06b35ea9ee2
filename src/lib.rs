//! Composition layer for multi-mission trajectory optimization problems.
//!
//! Physics subsystems contribute states, controls, constraints, and parameters
//! to phases; phases are linked into trajectories; a pre-mission sizing stage,
//! a trajectory, and a post-mission stage form a mission; and N missions are
//! combined into one super-problem with shared sizing inputs and a weighted
//! objective. Front-ends (the CLI, tests) go through this crate.

pub use composer_config as config;
pub use composer_export as export;
pub use composer_mission as mission;
pub use composer_phase as phase;
pub use composer_vehicles as vehicles;

pub use composer_core::{
    Case, CaseReader, CaseRecorder, OptionValue, Options, constants, options, units,
};
