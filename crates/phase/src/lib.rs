//! Phase assembly: subsystem contributions merged into phase registries, phases linked into trajectories.

pub mod builder;
pub mod contributor;
pub mod phase;
pub mod trajectory;

pub use builder::{BuildError, PhaseBuilder, RegistrationFailure};
pub use contributor::{
    ConstraintType, Contributions, ControlQuery, DeclaredSubsystem, SubsystemContributor,
};
pub use phase::{Location, Phase, PhaseError, PhaseObjective, TIME, TimeOptions, VariableKind};
pub use trajectory::{ALL_STATES, Linkage, PhaseLinker, Trajectory, TrajectoryError};
