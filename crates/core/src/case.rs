//! Flat name → values store used to seed a problem and to read back a solution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Values keyed by fully-qualified variable path (e.g. `group_0.traj.descent.states:r`).
///
/// Scalars are stored as one-element vectors; trajectory variables hold one
/// value per node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    values: BTreeMap<String, Vec<f64>>,
}

impl Case {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a vector of values, replacing any previous entry.
    pub fn set_val(&mut self, path: impl Into<String>, values: Vec<f64>) {
        self.values.insert(path.into(), values);
    }

    /// Store a scalar value, replacing any previous entry.
    pub fn set_scalar(&mut self, path: impl Into<String>, value: f64) {
        self.values.insert(path.into(), vec![value]);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Read side of a solution store, queried by variable path after a solve.
pub trait CaseReader {
    fn values(&self, path: &str) -> Option<&[f64]>;

    /// First value at `path`; the natural reading for scalars.
    fn scalar(&self, path: &str) -> Option<f64> {
        self.values(path).and_then(|v| v.first().copied())
    }

    /// Last value at `path`; the terminal node of a trajectory variable.
    fn terminal(&self, path: &str) -> Option<f64> {
        self.values(path).and_then(|v| v.last().copied())
    }
}

impl CaseReader for Case {
    fn values(&self, path: &str) -> Option<&[f64]> {
        self.values.get(path).map(Vec::as_slice)
    }
}

/// Write side of an optional persistence layer. Implementations decide the schema.
pub trait CaseRecorder {
    type Error: std::error::Error + Send + Sync + 'static;

    fn record(&mut self, label: &str, case: &Case) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_terminal_read_opposite_ends() {
        let mut case = Case::new();
        case.set_val("traj.descent.states:r", vec![100.0, 150.0, 200.0]);
        assert_eq!(case.scalar("traj.descent.states:r"), Some(100.0));
        assert_eq!(case.terminal("traj.descent.states:r"), Some(200.0));
        assert_eq!(case.terminal("missing"), None);
    }
}
