//! Boundary to the external iterative solver.

use serde::Serialize;

use crate::super_problem::SuperProblem;
use composer_core::Case;

/// How a driver run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DriverOutcome {
    Converged { iterations: usize },
    DidNotConverge { iterations: usize, reason: String },
}

impl DriverOutcome {
    pub fn converged(&self) -> bool {
        matches!(self, DriverOutcome::Converged { .. })
    }
}

/// External optimizer. Receives the finalized problem and a seeded case, and
/// writes the solution back into that case. One blocking call.
pub trait Driver {
    type Error: std::error::Error + Send + Sync + 'static;

    fn run(&mut self, problem: &SuperProblem, case: &mut Case) -> Result<DriverOutcome, Self::Error>;
}

/// Result of [`SuperProblem::solve`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    pub outcome: DriverOutcome,
    pub objective: f64,
    pub shared_outputs: Vec<(String, f64)>,
}
