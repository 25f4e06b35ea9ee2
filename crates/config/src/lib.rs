//! Configuration models and loaders for multi-mission scenarios.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use composer_core::Options;
use composer_core::constants::G0;
use serde::Deserialize;
use thiserror::Error;

/// Top-level scenario: the missions to fly, how they are weighted, and what they share.
#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioConfig {
    /// Namespace prefix; mission `i` lives under `<prefix>_<i>`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub shared: Vec<SharedVariableConfig>,
    pub missions: Vec<MissionConfig>,
    /// Per-mission weights. Fewer weights than missions means uniform weighting.
    #[serde(default)]
    pub weights: Vec<f64>,
    #[serde(default)]
    pub objective: ObjectiveConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Extra declared subsystems appended to the phases of every mission.
    #[serde(default)]
    pub subsystems: Vec<SubsystemConfig>,
}

/// A sizing input promoted to the super-problem and consumed by every mission.
#[derive(Debug, Deserialize, Clone)]
pub struct SharedVariableConfig {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub units: Option<String>,
    /// Present when the variable is optimizable; absent means fixed at `value`.
    #[serde(default)]
    pub design: Option<DesignBoundsConfig>,
}

/// Bounds and scaling of an optimizable variable.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DesignBoundsConfig {
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
    #[serde(default)]
    pub ref0: Option<f64>,
    #[serde(default, rename = "ref")]
    pub reference: Option<f64>,
}

/// One mission of the scenario.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind")]
pub enum MissionConfig {
    /// Two-phase ballistic ascent/descent with a muzzle-energy cap.
    #[serde(rename = "cannonball")]
    Cannonball { ke_max_j: f64 },
    /// Single-phase minimum-time climb to a target altitude.
    #[serde(rename = "min_time_climb")]
    MinTimeClimb { height_m: f64 },
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveSenseConfig {
    Minimize,
    #[default]
    Maximize,
}

/// Compound objective settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ObjectiveConfig {
    #[serde(default)]
    pub sense: ObjectiveSenseConfig,
    #[serde(default = "default_objective_output")]
    pub output: String,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            sense: ObjectiveSenseConfig::default(),
            output: default_objective_output(),
        }
    }
}

/// Pre-mission sizing coefficients.
#[derive(Debug, Deserialize, Clone)]
pub struct SizingConfig {
    #[serde(default = "default_price_per_kg")]
    pub price_per_kg: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            price_per_kg: default_price_per_kg(),
        }
    }
}

/// Physical constants handed to physics contributors at construction time.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    #[serde(default = "default_gravity")]
    pub gravity_m_s2: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_m_s2: default_gravity(),
        }
    }
}

/// A subsystem declared entirely in configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SubsystemConfig {
    pub name: String,
    #[serde(default)]
    pub states: BTreeMap<String, Options>,
    #[serde(default)]
    pub controls: BTreeMap<String, Options>,
    /// Controls keyed by phase name; declaring any makes the subsystem phase-aware.
    #[serde(default)]
    pub phase_controls: BTreeMap<String, BTreeMap<String, Options>>,
    /// Constraint options must carry `type: boundary` or `type: path`.
    #[serde(default)]
    pub constraints: BTreeMap<String, Options>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Options>,
    /// Phases receiving this subsystem; empty means every phase.
    #[serde(default)]
    pub phases: Vec<String>,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("scenario declares no missions")]
    NoMissions,
    #[error("no scenario files found in {0}")]
    Empty(PathBuf),
}

/// Load a single scenario from a YAML or TOML file.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioConfig, ConfigError> {
    let path = path.as_ref();
    let scenario: ScenarioConfig = if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)?
    } else {
        let reader = File::open(path)?;
        serde_yaml::from_reader(reader)?
    };
    validate(scenario)
}

/// Load every `.toml` scenario in a directory, sorted by file name.
pub fn load_scenarios<P: AsRef<Path>>(path: P) -> Result<Vec<ScenarioConfig>, ConfigError> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Ok(vec![load_scenario(path)?]);
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    if entries.is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }
    entries.sort();
    entries.iter().map(load_scenario).collect()
}

fn validate(scenario: ScenarioConfig) -> Result<ScenarioConfig, ConfigError> {
    if scenario.missions.is_empty() {
        return Err(ConfigError::NoMissions);
    }
    Ok(scenario)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn default_prefix() -> String {
    "group".to_string()
}

fn default_objective_output() -> String {
    "compound_range".to_string()
}

fn default_price_per_kg() -> f64 {
    10.0
}

fn default_gravity() -> f64 {
    G0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let yaml = "missions:\n  - kind: cannonball\n    ke_max_j: 400000.0\n";
        let scenario: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.prefix, "group");
        assert!(scenario.weights.is_empty());
        assert_eq!(scenario.objective.sense, ObjectiveSenseConfig::Maximize);
        assert_eq!(scenario.objective.output, "compound_range");
        assert_eq!(scenario.sizing.price_per_kg, 10.0);
        assert_eq!(scenario.physics.gravity_m_s2, G0);
    }

    #[test]
    fn declared_subsystem_options_keep_their_types() {
        let toml = r#"
[[missions]]
kind = "min_time_climb"
height_m = 20000.0

[[subsystems]]
name = "trim"

[subsystems.states.q]
units = "rad/s"
fix_initial = true
targets = ["eom.q"]

[subsystems.phase_controls.cruise.delta]
upper = 0.1
"#;
        let scenario: ScenarioConfig = toml::from_str(toml).unwrap();
        let trim = &scenario.subsystems[0];
        assert!(trim.phases.is_empty());
        let q = &trim.states["q"];
        assert_eq!(q["units"].as_str(), Some("rad/s"));
        assert_eq!(q["fix_initial"].as_bool(), Some(true));
        assert_eq!(q["targets"].as_names().map(<[String]>::len), Some(1));
        assert_eq!(
            trim.phase_controls["cruise"]["delta"]["upper"].as_f64(),
            Some(0.1)
        );
    }

    #[test]
    fn extension_selects_the_parser() {
        assert!(is_toml(Path::new("climb.toml")));
        assert!(!is_toml(Path::new("cannonball.yaml")));
        assert!(!is_toml(Path::new("scenario")));
    }
}
