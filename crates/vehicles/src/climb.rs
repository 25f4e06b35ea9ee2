//! Minimum-time climb of a jet aircraft to a target altitude, split into
//! subsystems: flight dynamics, propulsion, aerodynamics, terminal conditions
//! and an altitude envelope.

use std::sync::Arc;

use composer_core::{Options, options};
use composer_mission::{MissionProblem, MissionSpec, NoSizing, PhasePlan};
use composer_phase::{Contributions, ControlQuery, Location, SubsystemContributor, TIME, TimeOptions};

use crate::VehicleSettings;

/// Name of the single climb phase.
pub const CLIMB_PHASE: &str = "phase0";
/// Phase name in which [`Aerodynamics`] narrows the angle-of-attack range.
pub const CRUISE_PHASE: &str = "cruise";

/// Aircraft state seen by the flight dynamics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimbState {
    pub v: f64,
    pub gam: f64,
    pub m: f64,
    /// Angle of attack (rad).
    pub alpha: f64,
}

/// Forces acting on the aircraft (N).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimbForces {
    pub thrust: f64,
    pub lift: f64,
    pub drag: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimbRates {
    pub r_dot: f64,
    pub h_dot: f64,
    pub v_dot: f64,
    pub gam_dot: f64,
}

/// Point-mass longitudinal dynamics. Contributes r, h, v, gam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightDynamics {
    pub gravity: f64,
    pub height: f64,
}

impl FlightDynamics {
    pub fn new(gravity: f64, height: f64) -> Self {
        Self { gravity, height }
    }

    pub fn rates(&self, state: ClimbState, forces: ClimbForces) -> ClimbRates {
        let ClimbState { v, gam, m, alpha } = state;
        let ClimbForces { thrust, lift, drag } = forces;
        ClimbRates {
            r_dot: v * gam.cos(),
            h_dot: v * gam.sin(),
            v_dot: (thrust * alpha.cos() - drag) / m - self.gravity * gam.sin(),
            gam_dot: (thrust * alpha.sin() + lift) / (m * v) - self.gravity * gam.cos() / v,
        }
    }
}

impl SubsystemContributor for FlightDynamics {
    fn name(&self) -> &str {
        "flight_dynamics"
    }

    fn states(&self) -> Contributions {
        Contributions::from([
            (
                "r".to_string(),
                options! {
                    "fix_initial" => true, "lower" => 0.0, "upper" => 1.0e6,
                    "ref" => 1.0e3, "defect_ref" => 1.0e3, "units" => "m",
                    "rate_source" => "flight_dynamics.r_dot",
                },
            ),
            (
                "h".to_string(),
                options! {
                    "fix_initial" => true, "lower" => 1.0, "upper" => self.height,
                    "ref" => self.height, "defect_ref" => self.height, "units" => "m",
                    "rate_source" => "flight_dynamics.h_dot", "targets" => ["h"],
                },
            ),
            (
                "v".to_string(),
                options! {
                    "fix_initial" => true, "lower" => 10.0,
                    "ref" => 1.0e2, "defect_ref" => 1.0e2, "units" => "m/s",
                    "rate_source" => "flight_dynamics.v_dot", "targets" => ["v"],
                },
            ),
            (
                "gam".to_string(),
                options! {
                    "fix_initial" => true, "lower" => -1.5, "upper" => 1.5,
                    "ref" => 1.0, "defect_ref" => 1.0, "units" => "rad",
                    "rate_source" => "flight_dynamics.gam_dot", "targets" => ["gam"],
                },
            ),
        ])
    }
}

/// Engine model. Contributes the mass state and the engine parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propulsion {
    pub gravity: f64,
    pub isp: f64,
    pub throttle: f64,
}

impl Propulsion {
    pub fn new(gravity: f64) -> Self {
        Self {
            gravity,
            isp: 1600.0,
            throttle: 1.0,
        }
    }

    /// Mass flow (kg/s, negative while burning) at full-throttle thrust `max_thrust`.
    pub fn mass_rate(&self, max_thrust: f64) -> f64 {
        -self.throttle * max_thrust / (self.gravity * self.isp)
    }
}

impl SubsystemContributor for Propulsion {
    fn name(&self) -> &str {
        "prop"
    }

    fn states(&self) -> Contributions {
        Contributions::from([(
            "m".to_string(),
            options! {
                "fix_initial" => true, "lower" => 10.0, "upper" => 1.0e5,
                "ref" => 10_000.0, "defect_ref" => 10_000.0, "units" => "kg",
                "rate_source" => "prop.m_dot", "targets" => ["m"],
            },
        )])
    }

    fn parameters(&self) -> Contributions {
        Contributions::from([
            (
                "Isp".to_string(),
                options! { "val" => self.isp, "units" => "s", "opt" => false, "targets" => ["Isp"] },
            ),
            (
                "throttle".to_string(),
                options! { "val" => self.throttle, "opt" => false, "targets" => ["throttle"] },
            ),
        ])
    }
}

/// Aerodynamic model. Angle-of-attack limits depend on the phase it is queried for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aerodynamics {
    pub reference_area: f64,
    pub alpha_max_deg: f64,
    pub cruise_alpha_max_deg: f64,
}

impl Default for Aerodynamics {
    fn default() -> Self {
        Self {
            reference_area: 49.2386,
            alpha_max_deg: 8.0,
            cruise_alpha_max_deg: 4.0,
        }
    }
}

impl Aerodynamics {
    fn alpha(&self, limit: f64) -> Options {
        options! {
            "units" => "deg", "lower" => -limit, "upper" => limit, "scaler" => 1.0,
            "rate_continuity" => true, "rate_continuity_scaler" => 100.0,
            "rate2_continuity" => false, "targets" => ["alpha"],
        }
    }
}

impl SubsystemContributor for Aerodynamics {
    fn name(&self) -> &str {
        "aero"
    }

    fn control_query(&self) -> ControlQuery {
        ControlQuery::PhaseAware
    }

    fn controls(&self, phase: Option<&str>) -> Contributions {
        let limit = match phase {
            Some(CRUISE_PHASE) => self.cruise_alpha_max_deg,
            _ => self.alpha_max_deg,
        };
        Contributions::from([("alpha".to_string(), self.alpha(limit))])
    }

    fn constraints(&self) -> Contributions {
        Contributions::from([
            (
                "aero.mach".to_string(),
                options! { "type" => "path", "lower" => 0.1, "upper" => 1.8 },
            ),
            (
                "alpha".to_string(),
                options! {
                    "type" => "path",
                    "lower" => -self.alpha_max_deg,
                    "upper" => self.alpha_max_deg,
                },
            ),
        ])
    }

    fn parameters(&self) -> Contributions {
        Contributions::from([(
            "S".to_string(),
            options! {
                "val" => self.reference_area, "units" => "m**2", "opt" => false, "targets" => ["S"],
            },
        )])
    }
}

/// Conditions at the end of the climb: target altitude, Mach 1, level flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalConditions {
    pub height: f64,
}

impl SubsystemContributor for TerminalConditions {
    fn name(&self) -> &str {
        "terminal_conditions"
    }

    fn constraints(&self) -> Contributions {
        Contributions::from([
            (
                "h".to_string(),
                options! {
                    "type" => "boundary", "loc" => "final",
                    "equals" => self.height, "scaler" => 1.0e-3,
                },
            ),
            (
                "aero.mach".to_string(),
                options! { "type" => "boundary", "loc" => "final", "equals" => 1.0 },
            ),
            (
                "gam".to_string(),
                options! { "type" => "boundary", "loc" => "final", "equals" => 0.0 },
            ),
        ])
    }
}

/// Altitude band and flight-time limits along the climb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeEnvelope {
    pub height: f64,
}

impl SubsystemContributor for AltitudeEnvelope {
    fn name(&self) -> &str {
        "altitude_envelope"
    }

    fn constraints(&self) -> Contributions {
        Contributions::from([
            (
                "h".to_string(),
                options! { "type" => "path", "lower" => 100.0, "upper" => self.height, "ref" => self.height },
            ),
            (
                TIME.to_string(),
                options! { "type" => "path", "lower" => 0.0, "upper" => 400.0 },
            ),
            (
                format!("{TIME}_phase"),
                options! { "type" => "path", "lower" => 0.0, "upper" => 400.0 },
            ),
        ])
    }
}

/// Minimum-time climb from 100 m to `height` metres, ending level at Mach 1.
pub fn min_time_climb_mission(height: f64, settings: &VehicleSettings) -> MissionProblem {
    let gravity = settings.physics.gravity_m_s2;
    let phase = PhasePlan::new(CLIMB_PHASE)
        .time(TimeOptions {
            fix_initial: true,
            duration_bounds: (50.0, 400.0),
            duration_ref: 100.0,
            ..TimeOptions::default()
        })
        .contributor(Arc::new(FlightDynamics::new(gravity, height)))
        .contributor(Arc::new(Propulsion::new(gravity)))
        .contributor(Arc::new(Aerodynamics::default()))
        .contributor(Arc::new(TerminalConditions { height }))
        .contributor(Arc::new(AltitudeEnvelope { height }))
        .contributors(settings.extras_for(CLIMB_PHASE))
        .objective(TIME, Location::Final, 1.0)
        .guess_time(0.0, 350.0)
        .guess_state("r", [0.0, 111_319.54])
        .guess_state("h", [100.0, height])
        .guess_state("v", [135.964, 283.159])
        .guess_state("gam", [0.0, 0.0])
        .guess_state("m", [19_030.468, 16_841.431])
        .guess_control("alpha", [0.0, 0.0]);

    MissionProblem::new(format!("min_time_climb(h={height})"), Box::new(NoSizing))
        .phase(phase)
        .terminal_output(format!("traj.{CLIMB_PHASE}.t_duration"))
}

/// Factory for [`min_time_climb_mission`].
#[derive(Clone)]
pub struct MinTimeClimbMission {
    pub height: f64,
    pub settings: VehicleSettings,
}

impl MinTimeClimbMission {
    pub fn new(height: f64, settings: VehicleSettings) -> Self {
        Self { height, settings }
    }
}

impl MissionSpec for MinTimeClimbMission {
    fn build(&self) -> MissionProblem {
        min_time_climb_mission(self.height, &self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn alpha_limits_narrow_in_cruise() {
        let aero = Aerodynamics::default();
        let climb = aero.controls(Some(CLIMB_PHASE));
        let cruise = aero.controls(Some(CRUISE_PHASE));
        assert_eq!(climb["alpha"].get("upper").and_then(|v| v.as_f64()), Some(8.0));
        assert_eq!(cruise["alpha"].get("upper").and_then(|v| v.as_f64()), Some(4.0));
    }

    #[test]
    fn level_flight_with_balanced_forces_holds_speed() {
        let dynamics = FlightDynamics::new(9.80665, 20e3);
        let m = 10_000.0;
        let state = ClimbState { v: 200.0, gam: 0.0, m, alpha: 0.0 };
        let forces = ClimbForces { thrust: 5_000.0, lift: m * 9.80665, drag: 5_000.0 };
        let rates = dynamics.rates(state, forces);
        assert_relative_eq!(rates.v_dot, 0.0);
        assert_relative_eq!(rates.gam_dot, 0.0, epsilon = 1e-12);
        assert_relative_eq!(rates.r_dot, 200.0);
    }

    #[test]
    fn mass_flow_follows_rocket_equation() {
        let prop = Propulsion::new(9.80665);
        assert_relative_eq!(prop.mass_rate(9.80665 * 1600.0), -1.0);
    }
}
