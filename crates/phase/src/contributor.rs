//! Capability contract implemented by every physics subsystem that contributes to a phase.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use composer_core::Options;

/// Variable name → options, as returned by each contributor query.
pub type Contributions = BTreeMap<String, Options>;

/// How a contributor's control query wants to be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlQuery {
    /// `controls(None)`: the same controls in every phase.
    #[default]
    PhaseIndependent,
    /// `controls(Some(phase_name))`: controls may vary per phase.
    PhaseAware,
}

/// Constraint dispatch tag carried under the `type` option key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    Boundary,
    Path,
}

impl ConstraintType {
    /// Option key holding the tag.
    pub const KEY: &'static str = "type";

    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintType::Boundary => "boundary",
            ConstraintType::Path => "path",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boundary" => Ok(ConstraintType::Boundary),
            "path" => Ok(ConstraintType::Path),
            other => Err(other.to_string()),
        }
    }
}

/// A physics module that declares states, controls, constraints, and parameters for a phase.
///
/// Contributors know nothing about one another. The [`PhaseBuilder`](crate::PhaseBuilder)
/// calls them in registration order and later contributors overwrite earlier
/// ones on a name collision.
pub trait SubsystemContributor {
    /// Name used when reporting registration failures.
    fn name(&self) -> &str;

    fn states(&self) -> Contributions {
        Contributions::new()
    }

    /// Whether [`controls`](Self::controls) consumes the phase name.
    fn control_query(&self) -> ControlQuery {
        ControlQuery::PhaseIndependent
    }

    /// `phase` is `Some` only for contributors declaring [`ControlQuery::PhaseAware`].
    fn controls(&self, _phase: Option<&str>) -> Contributions {
        Contributions::new()
    }

    /// Every entry must carry a `type` option valued `boundary` or `path`.
    fn constraints(&self) -> Contributions {
        Contributions::new()
    }

    fn parameters(&self) -> Contributions {
        Contributions::new()
    }
}

/// A contributor whose contributions are plain data, typically loaded from a scenario file.
#[derive(Debug, Clone, Default)]
pub struct DeclaredSubsystem {
    pub name: String,
    pub states: Contributions,
    pub controls: Contributions,
    /// Controls by phase name, layered over `controls` for that phase.
    pub phase_controls: BTreeMap<String, Contributions>,
    pub constraints: Contributions,
    pub parameters: Contributions,
}

impl DeclaredSubsystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn state(mut self, name: impl Into<String>, options: Options) -> Self {
        self.states.insert(name.into(), options);
        self
    }

    pub fn control(mut self, name: impl Into<String>, options: Options) -> Self {
        self.controls.insert(name.into(), options);
        self
    }

    pub fn phase_control(
        mut self,
        phase: impl Into<String>,
        name: impl Into<String>,
        options: Options,
    ) -> Self {
        self.phase_controls
            .entry(phase.into())
            .or_default()
            .insert(name.into(), options);
        self
    }

    pub fn constraint(mut self, name: impl Into<String>, options: Options) -> Self {
        self.constraints.insert(name.into(), options);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, options: Options) -> Self {
        self.parameters.insert(name.into(), options);
        self
    }
}

impl SubsystemContributor for DeclaredSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn states(&self) -> Contributions {
        self.states.clone()
    }

    fn control_query(&self) -> ControlQuery {
        if self.phase_controls.is_empty() {
            ControlQuery::PhaseIndependent
        } else {
            ControlQuery::PhaseAware
        }
    }

    fn controls(&self, phase: Option<&str>) -> Contributions {
        let mut controls = self.controls.clone();
        if let Some(per_phase) = phase.and_then(|p| self.phase_controls.get(p)) {
            controls.extend(per_phase.clone());
        }
        controls
    }

    fn constraints(&self) -> Contributions {
        self.constraints.clone()
    }

    fn parameters(&self) -> Contributions {
        self.parameters.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_core::options;

    #[test]
    fn declared_subsystem_becomes_phase_aware_with_phase_controls() {
        let plain = DeclaredSubsystem::new("aero").control("alpha", options! { "units" => "deg" });
        assert_eq!(plain.control_query(), ControlQuery::PhaseIndependent);

        let aware = plain.phase_control("cruise", "alpha", options! { "upper" => 4.0 });
        assert_eq!(aware.control_query(), ControlQuery::PhaseAware);
        let cruise = aware.controls(Some("cruise"));
        assert_eq!(cruise["alpha"].get("upper").and_then(|v| v.as_f64()), Some(4.0));
        assert!(cruise["alpha"].get("units").is_none());
        let climb = aware.controls(Some("climb"));
        assert!(climb["alpha"].contains_key("units"));
    }

    #[test]
    fn constraint_tags_parse_exhaustively() {
        assert_eq!("boundary".parse::<ConstraintType>(), Ok(ConstraintType::Boundary));
        assert_eq!("path".parse::<ConstraintType>(), Ok(ConstraintType::Path));
        assert_eq!("terminal".parse::<ConstraintType>(), Err("terminal".to_string()));
    }
}
