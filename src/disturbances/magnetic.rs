use super::{Disturbance, ForceTorqueModel};
use crate::environment::{LocalEnvironment, SpacecraftDynamics};
use crate::logger::{vector_header, vector_value, Loggable};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

const NANO_TESLA_TO_TESLA: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagneticDisturbanceConfig {
    pub enabled: bool,
}

impl Default for MagneticDisturbanceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Torque from the spacecraft's residual magnetic dipole in the local field.
#[derive(Debug, Clone)]
pub struct MagneticDisturbance {
    enabled: bool,
    residual_moment_b_am2: Vector3<f64>,
    torque_b_nm: Vector3<f64>,
}

impl MagneticDisturbance {
    pub fn new(config: &MagneticDisturbanceConfig, residual_moment_b_am2: &Vector3<f64>) -> Self {
        Self {
            enabled: config.enabled,
            residual_moment_b_am2: *residual_moment_b_am2,
            torque_b_nm: Vector3::zeros(),
        }
    }
}

impl Disturbance for MagneticDisturbance {
    fn name(&self) -> &'static str {
        "magnetic_disturbance"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, environment: &LocalEnvironment, _dynamics: &SpacecraftDynamics) {
        let field_b_t = environment.magnetic_field_b_nt * NANO_TESLA_TO_TESLA;
        self.torque_b_nm = self.residual_moment_b_am2.cross(&field_b_t);
    }

    fn as_loggable(&self) -> &dyn Loggable {
        self
    }
}

impl ForceTorqueModel for MagneticDisturbance {
    fn force_b_n(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn torque_b_nm(&self) -> Vector3<f64> {
        self.torque_b_nm
    }
}

impl Loggable for MagneticDisturbance {
    fn log_header(&self) -> String {
        vector_header("magnetic_torque", "b", "Nm")
    }

    fn log_value(&self) -> String {
        vector_value(&self.torque_b_nm)
    }
}
