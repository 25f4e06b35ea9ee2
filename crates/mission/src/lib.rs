//! Mission assembly crate: sizing, trajectory, and post-mission stages combined into
//! finalized problems, and finalized problems combined into one weighted super-problem.

pub mod driver;
pub mod finalized;
pub mod objective;
pub mod post;
pub mod problem;
pub mod sizing;
pub mod super_problem;
pub mod variables;

pub use facade::*;

mod facade;
