//! Merges the contributions of an ordered set of subsystems into one phase.

use std::fmt::Write as _;

use composer_core::OptionValue;
use log::debug;
use thiserror::Error;

use crate::contributor::{ConstraintType, ControlQuery, SubsystemContributor};
use crate::phase::{Phase, PhaseError};

/// A rejected contribution: which contributor, which variable, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationFailure {
    pub contributor: String,
    pub variable: String,
    pub reason: PhaseError,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "contributor '{contributor}' declares constraint '{constraint}' in phase '{phase}' with unknown type {found}; expected 'boundary' or 'path'"
    )]
    UnknownConstraintType {
        phase: String,
        contributor: String,
        constraint: String,
        found: String,
    },
    #[error("phase '{phase}' rejected {} contribution(s):{}", .failures.len(), render(.failures))]
    Registration {
        phase: String,
        failures: Vec<RegistrationFailure>,
    },
}

fn render(failures: &[RegistrationFailure]) -> String {
    let mut out = String::new();
    for failure in failures {
        let _ = write!(
            out,
            "\n  - contributor '{}', variable '{}': {}",
            failure.contributor, failure.variable, failure.reason
        );
    }
    out
}

struct Registered<'a> {
    contributor: &'a dyn SubsystemContributor,
    controls: ControlQuery,
}

/// Ordered list of contributors for one phase. The control query style of each
/// contributor is captured when it is registered.
#[derive(Default)]
pub struct PhaseBuilder<'a> {
    entries: Vec<Registered<'a>>,
}

impl<'a> PhaseBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, contributor: &'a dyn SubsystemContributor) -> &mut Self {
        self.entries.push(Registered {
            contributor,
            controls: contributor.control_query(),
        });
        self
    }

    pub fn with(mut self, contributor: &'a dyn SubsystemContributor) -> Self {
        self.register(contributor);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register every contribution into `phase`, in contributor order.
    ///
    /// Same-name contributions from a later contributor replace earlier ones.
    /// Option and definition failures are collected across all contributors and
    /// reported together; an unknown constraint type aborts immediately.
    pub fn build(&self, mut phase: Phase) -> Result<Phase, BuildError> {
        let phase_name = phase.name().to_string();
        let mut failures = Vec::new();

        for entry in &self.entries {
            let contributor = entry.contributor;
            let who = contributor.name();
            let mut record = |variable: &str, result: Result<(), PhaseError>| {
                if let Err(reason) = result {
                    failures.push(RegistrationFailure {
                        contributor: who.to_string(),
                        variable: variable.to_string(),
                        reason,
                    });
                }
            };

            for (name, options) in contributor.states() {
                debug!("[{phase_name}] {who}: state '{name}'");
                record(&name, phase.add_state(&name, options));
            }

            let controls = match entry.controls {
                ControlQuery::PhaseAware => contributor.controls(Some(phase_name.as_str())),
                ControlQuery::PhaseIndependent => contributor.controls(None),
            };
            for (name, options) in controls {
                debug!("[{phase_name}] {who}: control '{name}'");
                record(&name, phase.add_control(&name, options));
            }

            for (name, options) in contributor.parameters() {
                debug!("[{phase_name}] {who}: parameter '{name}'");
                record(&name, phase.add_parameter(&name, options));
            }

            for (name, mut options) in contributor.constraints() {
                let tag = options.remove(ConstraintType::KEY);
                let kind = match tag.as_ref().and_then(OptionValue::as_str) {
                    Some(text) => text.parse::<ConstraintType>().ok(),
                    None => None,
                };
                let result = match kind {
                    Some(ConstraintType::Boundary) => phase.add_boundary_constraint(&name, options),
                    Some(ConstraintType::Path) => phase.add_path_constraint(&name, options),
                    None => {
                        return Err(BuildError::UnknownConstraintType {
                            phase: phase_name,
                            contributor: who.to_string(),
                            constraint: name,
                            found: tag.map_or_else(|| "(missing)".to_string(), |v| v.to_string()),
                        });
                    }
                };
                debug!("[{phase_name}] {who}: constraint '{name}'");
                record(&name, result);
            }
        }

        if failures.is_empty() {
            Ok(phase)
        } else {
            Err(BuildError::Registration {
                phase: phase_name,
                failures,
            })
        }
    }
}
