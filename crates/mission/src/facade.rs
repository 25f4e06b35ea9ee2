pub use crate::driver::{Driver, DriverOutcome, SolveReport};
pub use crate::finalized::{FinalizedMission, MissionSummary, qualify};
pub use crate::objective::{ObjectiveAggregator, ObjectiveSense, ObjectiveTerm};
pub use crate::post::{ConsumedOutputs, NoPostMission, PostMission};
pub use crate::problem::{
    MissionError, MissionProblem, ParameterSource, PhasePlan, TrajectoryParameter,
};
pub use crate::sizing::{NoSizing, Quantity, SizingError, SizingStage, require};
pub use crate::super_problem::{
    MissionSpec, SharedVariable, SuperProblem, SuperProblemAssembler, SuperProblemError,
    SuperProblemSummary, resolve_weights,
};
pub use crate::variables::{
    ConstraintKind, ConstraintRecord, Connection, DesignVariable, FixedParameter, ObjectiveRecord,
};
