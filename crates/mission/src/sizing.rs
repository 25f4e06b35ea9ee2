//! Pre-mission sizing stage: turns design inputs into the quantities a trajectory consumes.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Named scalar quantity with its default value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub name: String,
    pub units: Option<String>,
    pub default: f64,
}

impl Quantity {
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            units: None,
            default,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SizingError {
    #[error("sizing input '{0}' was not supplied")]
    MissingInput(String),
    #[error("sizing input '{name}' = {value} is invalid: {reason}")]
    InvalidInput {
        name: String,
        value: f64,
        reason: &'static str,
    },
}

/// Stage run once before the trajectory; its outputs feed trajectory parameters.
pub trait SizingStage: fmt::Debug {
    fn inputs(&self) -> Vec<Quantity>;

    fn outputs(&self) -> Vec<Quantity>;

    /// Evaluate every output from a complete set of inputs.
    fn compute(&self, inputs: &BTreeMap<String, f64>) -> Result<BTreeMap<String, f64>, SizingError>;
}

/// Sizing stage for missions with nothing to size.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSizing;

impl SizingStage for NoSizing {
    fn inputs(&self) -> Vec<Quantity> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<Quantity> {
        Vec::new()
    }

    fn compute(
        &self,
        _inputs: &BTreeMap<String, f64>,
    ) -> Result<BTreeMap<String, f64>, SizingError> {
        Ok(BTreeMap::new())
    }
}

/// Fetch a required input, for use inside [`SizingStage::compute`].
pub fn require(inputs: &BTreeMap<String, f64>, name: &str) -> Result<f64, SizingError> {
    inputs
        .get(name)
        .copied()
        .ok_or_else(|| SizingError::MissingInput(name.to_string()))
}
