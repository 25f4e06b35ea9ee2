//! Post-mission stage: consumes trajectory outputs after the flight.

use std::fmt;

/// Declares which trajectory outputs (e.g. `traj.descent.states:r`) the stage reads.
pub trait PostMission: fmt::Debug {
    fn inputs(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Empty post-mission stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPostMission;

impl PostMission for NoPostMission {}

/// Post-mission stage that only reads a fixed list of trajectory outputs.
#[derive(Debug, Clone, Default)]
pub struct ConsumedOutputs(pub Vec<String>);

impl PostMission for ConsumedOutputs {
    fn inputs(&self) -> Vec<String> {
        self.0.clone()
    }
}
