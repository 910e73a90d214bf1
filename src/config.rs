use crate::attitude::AttitudeConfig;
use crate::disturbances::DisturbanceConfig;
use crate::environment::{CentralBody, EnvironmentConfig, StructureConfig};
use crate::integrator::Scheme;
use crate::scheduler::SchedulerConfig;
use crate::time::TimeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub initial_position_i_m: [f64; 3],
    pub initial_velocity_i_m_s: [f64; 3],
}

impl Default for OrbitConfig {
    fn default() -> Self {
        // 500 km circular equatorial orbit
        Self {
            initial_position_i_m: [6_878_137.0, 0.0, 0.0],
            initial_velocity_i_m_s: [0.0, 7_612.6, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    pub scheme: Scheme,
    pub initial_step_s: f64,
    pub tolerance: f64,
    pub min_step_s: f64,
    pub max_step_s: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::DormandPrince5,
            initial_step_s: 1.0,
            tolerance: 1e-6,
            min_step_s: 1e-4,
            max_step_s: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub directory: Option<PathBuf>,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            file_name: "spacetwin.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub time: TimeConfig,
    pub central_body: CentralBody,
    pub scheduler: SchedulerConfig,
    pub structure: StructureConfig,
    pub environment: EnvironmentConfig,
    pub disturbances: DisturbanceConfig,
    pub orbit: OrbitConfig,
    pub attitude: AttitudeConfig,
    pub integrator: IntegratorConfig,
    pub logging: LoggingConfig,
    /// Where this configuration was read from; archived with the logs.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;
        config.source_path = Some(path.to_path_buf());
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let time = &self.time;
        positive("time.step_s", time.step_s)?;
        positive("time.attitude_update_interval_s", time.attitude_update_interval_s)?;
        positive("time.orbit_update_interval_s", time.orbit_update_interval_s)?;
        positive("time.component_update_interval_s", time.component_update_interval_s)?;
        positive("time.log_output_interval_s", time.log_output_interval_s)?;
        if !(time.end_time_s.is_finite() && time.end_time_s >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "time.end_time_s",
                reason: "must be finite and non-negative",
            });
        }

        check_integrator(
            &self.integrator,
            [
                "integrator.initial_step_s",
                "integrator.tolerance",
                "integrator.min_step_s",
                "integrator.max_step_s",
            ],
        )?;
        check_integrator(
            &self.attitude.integrator,
            [
                "attitude.integrator.initial_step_s",
                "attitude.integrator.tolerance",
                "attitude.integrator.min_step_s",
                "attitude.integrator.max_step_s",
            ],
        )?;

        positive("structure.mass_kg", self.structure.mass_kg)?;
        for inertia in self.structure.inertia_diagonal_b_kgm2 {
            positive("structure.inertia_diagonal_b_kgm2", inertia)?;
        }
        let quaternion = self.attitude.initial_quaternion_i2b;
        if !(quaternion.iter().all(|q| q.is_finite()) && quaternion.iter().any(|q| *q != 0.0)) {
            return Err(ConfigError::Invalid {
                field: "attitude.initial_quaternion_i2b",
                reason: "must be finite and non-zero",
            });
        }
        if !self.attitude.initial_angular_velocity_b_rad_s.iter().all(|w| w.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "attitude.initial_angular_velocity_b_rad_s",
                reason: "must be finite",
            });
        }
        positive(
            "environment.central_body_gravity_constant_m3_s2",
            self.environment.central_body_gravity_constant_m3_s2,
        )?;

        let position = self.orbit.initial_position_i_m;
        if position.iter().all(|p| *p == 0.0) {
            return Err(ConfigError::Invalid {
                field: "orbit.initial_position_i_m",
                reason: "spacecraft cannot start at the center of the central body",
            });
        }

        Ok(())
    }
}

/// Field names in the order initial step, tolerance, minimum step, maximum step.
fn check_integrator(integrator: &IntegratorConfig, fields: [&'static str; 4]) -> Result<(), ConfigError> {
    positive(fields[0], integrator.initial_step_s)?;
    positive(fields[1], integrator.tolerance)?;
    positive(fields[2], integrator.min_step_s)?;
    positive(fields[3], integrator.max_step_s)?;
    if integrator.min_step_s > integrator.max_step_s {
        return Err(ConfigError::Invalid {
            field: fields[2],
            reason: "must not exceed the maximum step",
        });
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be positive and finite",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{
                "central_body": "moon",
                "time": { "step_s": 0.5, "end_time_s": 10.0 },
                "disturbances": { "air_drag": { "enabled": false } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.central_body.name(), "MOON");
        assert_eq!(config.time.step_s, 0.5);
        assert_eq!(config.time.orbit_update_interval_s, 1.0);
        assert!(!config.disturbances.air_drag.enabled);
        assert_eq!(config.disturbances.air_drag.drag_coefficient, 2.2);
        assert_eq!(config.integrator.scheme, Scheme::DormandPrince5);
        assert!(config.source_path.is_none());
    }

    #[test]
    fn test_scheme_names() {
        let config =
            SimulationConfig::from_json_str(r#"{ "integrator": { "scheme": "bogacki_shampine32" } }"#).unwrap();
        assert_eq!(config.integrator.scheme, Scheme::BogackiShampine32);
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let result = SimulationConfig::from_json_str(r#"{ "time": { "step_s": 0.0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid { field: "time.step_s", .. })));
    }

    #[test]
    fn test_rejects_inverted_step_limits() {
        let result =
            SimulationConfig::from_json_str(r#"{ "integrator": { "min_step_s": 10.0, "max_step_s": 1.0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid { field: "integrator.min_step_s", .. })));
    }

    #[test]
    fn test_attitude_section() {
        let config = SimulationConfig::from_json_str(
            r#"{ "attitude": { "initial_angular_velocity_b_rad_s": [0.0, 0.0, 0.01] } }"#,
        )
        .unwrap();
        assert_eq!(config.attitude.initial_angular_velocity_b_rad_s, [0.0, 0.0, 0.01]);
        assert_eq!(config.attitude.initial_quaternion_i2b, [0.0, 0.0, 0.0, 1.0]);

        let result = SimulationConfig::from_json_str(r#"{ "attitude": { "initial_quaternion_i2b": [0, 0, 0, 0] } }"#);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "attitude.initial_quaternion_i2b", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_inertia() {
        let result = SimulationConfig::from_json_str(r#"{ "structure": { "inertia_diagonal_b_kgm2": [1.0, 0.0, 1.0] } }"#);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "structure.inertia_diagonal_b_kgm2", .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(SimulationConfig::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
    }
}
