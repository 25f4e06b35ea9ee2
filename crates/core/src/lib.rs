//! Core option values, solution cases, and shared primitives for the trajectory composer workspace.

pub mod case;
pub mod options;

pub use case::{Case, CaseReader, CaseRecorder};
pub use options::{OptionValue, Options};

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Kilograms per cubic metre in one gram per cubic centimetre.
    pub const KG_M3_PER_G_CM3: f64 = 1_000.0;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::KG_M3_PER_G_CM3;

    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }

    /// Convert grams per cubic centimetre to kilograms per cubic metre.
    #[inline]
    pub fn g_cm3_to_kg_m3(v: f64) -> f64 {
        v * KG_M3_PER_G_CM3
    }
}
