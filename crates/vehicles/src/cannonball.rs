//! Ballistic cannonball fired from the ground: a two-phase (ascent, descent)
//! trajectory whose ball is sized from its radius and material density.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use composer_core::units::{deg_to_rad, g_cm3_to_kg_m3};
use composer_core::{Options, options};
use composer_mission::{
    ConsumedOutputs, DesignVariable, MissionProblem, MissionSpec, PhasePlan, Quantity,
    SizingError, SizingStage, TrajectoryParameter, require,
};
use composer_phase::{ALL_STATES, Contributions, SubsystemContributor, TIME, TimeOptions};

use crate::VehicleSettings;

/// Default material density (iron), g/cm³.
pub const DEFAULT_DENSITY_G_CM3: f64 = 7.87;
/// Drag coefficient of a sphere.
pub const SPHERE_CD: f64 = 0.5;

/// Output whose final node is the downrange distance flown.
pub const RANGE_OUTPUT: &str = "traj.descent.states:r";

/// Sizes a solid sphere: mass, frontal area, and price from radius and density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CannonballSizing {
    pub price_per_kg: f64,
}

impl CannonballSizing {
    pub fn new(price_per_kg: f64) -> Self {
        Self { price_per_kg }
    }
}

impl SizingStage for CannonballSizing {
    fn inputs(&self) -> Vec<Quantity> {
        vec![
            Quantity::new("radius", 1.0).with_units("m"),
            Quantity::new("density", g_cm3_to_kg_m3(DEFAULT_DENSITY_G_CM3)).with_units("kg/m**3"),
        ]
    }

    fn outputs(&self) -> Vec<Quantity> {
        vec![
            Quantity::new("mass", 0.0).with_units("kg"),
            Quantity::new("S", 0.0).with_units("m**2"),
            Quantity::new("price", 0.0).with_units("USD"),
        ]
    }

    fn compute(&self, inputs: &BTreeMap<String, f64>) -> Result<BTreeMap<String, f64>, SizingError> {
        let radius = positive(inputs, "radius")?;
        let density = positive(inputs, "density")?;

        let mass = 4.0 / 3.0 * density * PI * radius.powi(3);
        let area = PI * radius.powi(2);
        Ok(BTreeMap::from([
            ("mass".to_string(), mass),
            ("S".to_string(), area),
            ("price".to_string(), mass * self.price_per_kg),
        ]))
    }
}

fn positive(inputs: &BTreeMap<String, f64>, name: &str) -> Result<f64, SizingError> {
    let value = require(inputs, name)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SizingError::InvalidInput {
            name: name.to_string(),
            value,
            reason: "must be finite and positive",
        })
    }
}

/// Point-mass state of the ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticState {
    pub v: f64,
    pub gam: f64,
}

/// Time derivatives of the ballistic states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticRates {
    pub r_dot: f64,
    pub h_dot: f64,
    pub v_dot: f64,
    pub gam_dot: f64,
}

/// Point-mass flight under gravity and drag. Contributes the r/h/gam/v states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticFlight {
    pub gravity: f64,
}

impl BallisticFlight {
    pub fn new(gravity: f64) -> Self {
        Self { gravity }
    }

    /// Equations of motion at air density `rho` (kg/m³) for a ball of mass `m`,
    /// reference area `s`, and drag coefficient `cd`.
    pub fn rates(&self, state: BallisticState, rho: f64, m: f64, s: f64, cd: f64) -> BallisticRates {
        let BallisticState { v, gam } = state;
        let drag = 0.5 * rho * v * v * s * cd;
        BallisticRates {
            r_dot: v * gam.cos(),
            h_dot: v * gam.sin(),
            v_dot: -drag / m - self.gravity * gam.sin(),
            gam_dot: -self.gravity * gam.cos() / v,
        }
    }

    /// Kinetic energy (J).
    pub fn kinetic_energy(m: f64, v: f64) -> f64 {
        0.5 * m * v * v
    }
}

impl SubsystemContributor for BallisticFlight {
    fn name(&self) -> &str {
        "ballistic_flight"
    }

    fn states(&self) -> Contributions {
        Contributions::from([
            state("r", "m", "eom.r_dot", ["r"]),
            state("h", "m", "eom.h_dot", ["h"]),
            state("gam", "rad", "eom.gam_dot", ["gam"]),
            state("v", "m/s", "eom.v_dot", ["v"]),
        ])
    }

    fn parameters(&self) -> Contributions {
        Contributions::from([
            ("CD".to_string(), options! { "units" => "unitless", "targets" => ["CD"] }),
            ("m".to_string(), options! { "units" => "kg", "targets" => ["m"] }),
            ("S".to_string(), options! { "units" => "m**2", "targets" => ["S"] }),
        ])
    }
}

fn state<const N: usize>(
    name: &str,
    units: &str,
    rate_source: &str,
    targets: [&str; N],
) -> (String, Options) {
    (
        name.to_string(),
        options! {
            "units" => units,
            "rate_source" => rate_source,
            "targets" => targets,
            "fix_initial" => false,
            "fix_final" => false,
        },
    )
}

/// Caps the muzzle energy at the start of the flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuzzleEnergyLimit {
    pub ke_max: f64,
}

impl MuzzleEnergyLimit {
    pub fn new(ke_max: f64) -> Self {
        Self { ke_max }
    }
}

impl SubsystemContributor for MuzzleEnergyLimit {
    fn name(&self) -> &str {
        "muzzle_energy_limit"
    }

    fn constraints(&self) -> Contributions {
        Contributions::from([(
            "ke".to_string(),
            options! {
                "type" => "boundary",
                "loc" => "initial",
                "upper" => self.ke_max,
                "lower" => 0.0,
                "ref" => 100_000.0,
            },
        )])
    }
}

fn endpoint_options(is_ascent: bool) -> [(&'static str, Options); 4] {
    [
        ("r", options! { "fix_initial" => is_ascent, "fix_final" => false }),
        ("h", options! { "fix_initial" => is_ascent, "fix_final" => !is_ascent }),
        ("gam", options! { "fix_initial" => false, "fix_final" => is_ascent }),
        ("v", options! { "fix_initial" => false, "fix_final" => false }),
    ]
}

/// A cannonball mission capped at `ke_max` joules of muzzle energy.
pub fn cannonball_mission(ke_max: f64, settings: &VehicleSettings) -> MissionProblem {
    let flight: Arc<dyn SubsystemContributor> =
        Arc::new(BallisticFlight::new(settings.physics.gravity_m_s2));
    let energy: Arc<dyn SubsystemContributor> = Arc::new(MuzzleEnergyLimit::new(ke_max));

    let mut ascent = PhasePlan::new("ascent")
        .time(TimeOptions {
            fix_initial: true,
            duration_bounds: (1.0, 100.0),
            duration_ref: 100.0,
            ..TimeOptions::default()
        })
        .contributor(Arc::clone(&flight))
        .contributor(energy)
        .contributors(settings.extras_for("ascent"))
        .guess_time(0.0, 10.0)
        .guess_state("r", [0.0, 100.0])
        .guess_state("h", [0.0, 100.0])
        .guess_state("v", [200.0, 150.0])
        .guess_state("gam", [deg_to_rad(25.0), 0.0]);
    for (name, options) in endpoint_options(true) {
        ascent = ascent.state_options(name, options);
    }

    let mut descent = PhasePlan::new("descent")
        .time(TimeOptions {
            duration_bounds: (0.5, 100.0),
            duration_ref: 100.0,
            ..TimeOptions::default()
        })
        .contributor(flight)
        .contributors(settings.extras_for("descent"))
        .guess_time(10.0, 10.0)
        .guess_state("r", [100.0, 200.0])
        .guess_state("h", [100.0, 0.0])
        .guess_state("v", [150.0, 200.0])
        .guess_state("gam", [0.0, deg_to_rad(-45.0)]);
    for (name, options) in endpoint_options(false) {
        descent = descent.state_options(name, options);
    }

    MissionProblem::new(
        format!("cannonball(ke_max={ke_max})"),
        Box::new(CannonballSizing::new(settings.price_per_kg)),
    )
    .input_default("density", g_cm3_to_kg_m3(DEFAULT_DENSITY_G_CM3))
    .phase(ascent)
    .phase(descent)
    .link("ascent", "descent", &[TIME, ALL_STATES])
    .parameter(TrajectoryParameter::fixed(
        "CD",
        SPHERE_CD,
        options! { "units" => "unitless", "val" => SPHERE_CD, "opt" => false },
    ))
    .parameter(TrajectoryParameter::connected(
        "m",
        "mass",
        options! { "units" => "kg", "opt" => false },
    ))
    .parameter(TrajectoryParameter::sized("S", options! { "units" => "m**2", "opt" => false }))
    .parameter(TrajectoryParameter::sized(
        "price",
        options! { "units" => "USD", "opt" => false, "static_target" => true },
    ))
    .design_var(
        DesignVariable::new("radius")
            .bounds(0.01, 0.10)
            .scaling(0.01, 0.10)
            .units("m"),
    )
    .post_mission(Box::new(ConsumedOutputs(vec![RANGE_OUTPUT.to_string()])))
    .terminal_output(RANGE_OUTPUT)
}

/// Factory for [`cannonball_mission`].
#[derive(Clone)]
pub struct CannonballMission {
    pub ke_max: f64,
    pub settings: VehicleSettings,
}

impl CannonballMission {
    pub fn new(ke_max: f64, settings: VehicleSettings) -> Self {
        Self { ke_max, settings }
    }
}

impl MissionSpec for CannonballMission {
    fn build(&self) -> MissionProblem {
        cannonball_mission(self.ke_max, &self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sizing_matches_solid_sphere() {
        let sizing = CannonballSizing::new(10.0);
        let inputs = BTreeMap::from([
            ("radius".to_string(), 0.05),
            ("density".to_string(), 7870.0),
        ]);
        let out = sizing.compute(&inputs).unwrap();
        let mass = 4.0 / 3.0 * 7870.0 * PI * 0.05_f64.powi(3);
        assert_relative_eq!(out["mass"], mass, max_relative = 1e-12);
        assert_relative_eq!(out["S"], PI * 0.0025, max_relative = 1e-12);
        assert_relative_eq!(out["price"], mass * 10.0, max_relative = 1e-12);
    }

    #[test]
    fn sizing_rejects_non_positive_radius() {
        let sizing = CannonballSizing::new(10.0);
        let inputs = BTreeMap::from([("radius".to_string(), 0.0), ("density".to_string(), 1.0)]);
        assert!(matches!(
            sizing.compute(&inputs),
            Err(SizingError::InvalidInput { .. })
        ));
        let missing = BTreeMap::from([("radius".to_string(), 0.1)]);
        assert_eq!(
            sizing.compute(&missing),
            Err(SizingError::MissingInput("density".to_string()))
        );
    }

    #[test]
    fn vacuum_flight_at_apex_only_falls() {
        let flight = BallisticFlight::new(9.80665);
        let rates = flight.rates(BallisticState { v: 100.0, gam: 0.0 }, 0.0, 1.0, 0.01, 0.5);
        assert_relative_eq!(rates.r_dot, 100.0);
        assert_relative_eq!(rates.h_dot, 0.0);
        assert_relative_eq!(rates.v_dot, 0.0);
        assert_relative_eq!(rates.gam_dot, -0.0980665, max_relative = 1e-12);
    }
}
