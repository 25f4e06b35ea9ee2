//! Records making up a finalized problem: design variables, fixed parameters,
//! connections, constraints, and the objective.

use composer_core::{OptionValue, Options};
use composer_phase::Location;
use serde::Serialize;

/// An optimizable variable exposed to the solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignVariable {
    pub name: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub ref0: Option<f64>,
    #[serde(rename = "ref")]
    pub reference: Option<f64>,
    pub units: Option<String>,
}

impl DesignVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: None,
            upper: None,
            ref0: None,
            reference: None,
            units: None,
        }
    }

    /// Non-finite bounds are treated as absent.
    pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower = finite(lower);
        self.upper = finite(upper);
        self
    }

    pub fn scaling(mut self, ref0: f64, reference: f64) -> Self {
        self.ref0 = Some(ref0);
        self.reference = Some(reference);
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Read bounds, scaling, and units from a contribution's options.
    pub fn from_options(name: impl Into<String>, options: &Options) -> Self {
        let number = |key: &str| options.get(key).and_then(OptionValue::as_f64);
        Self {
            name: name.into(),
            lower: number("lower"),
            upper: number("upper"),
            ref0: number("ref0"),
            reference: number("ref"),
            units: options
                .get("units")
                .and_then(OptionValue::as_str)
                .map(str::to_string),
        }
    }

    /// Same variable under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// A parameter held constant during the solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedParameter {
    pub name: String,
    pub value: f64,
    pub units: Option<String>,
}

/// Value flow from a producing output to a consuming input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Boundary { loc: Location },
    Path,
    Linkage,
}

/// One constraint of the finalized problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintRecord {
    pub name: String,
    pub kind: ConstraintKind,
    pub options: Options,
}

/// The scalar a solver minimizes, scaled by `scaler` (negative to maximize).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveRecord {
    pub name: String,
    pub loc: Option<Location>,
    #[serde(rename = "ref")]
    pub reference: Option<f64>,
    pub scaler: f64,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
