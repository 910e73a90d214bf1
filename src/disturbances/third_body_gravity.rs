use super::{AccelerationModel, Disturbance};
use crate::environment::{LocalEnvironment, SpacecraftDynamics};
use crate::logger::{vector_header, vector_value, Loggable};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThirdBodyGravityConfig {
    pub enabled: bool,
    /// Bodies to include, summed in this order.
    pub bodies: Vec<String>,
}

impl Default for ThirdBodyGravityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bodies: vec!["SUN".to_string(), "MOON".to_string()],
        }
    }
}

/// Tidal acceleration from bodies other than the central body.
#[derive(Debug, Clone)]
pub struct ThirdBodyGravity {
    enabled: bool,
    bodies: Vec<String>,
    acceleration_i_m_s2: Vector3<f64>,
}

impl ThirdBodyGravity {
    pub fn new(config: &ThirdBodyGravityConfig) -> Self {
        Self {
            enabled: config.enabled,
            bodies: config.bodies.iter().map(|b| b.trim().to_ascii_uppercase()).collect(),
            acceleration_i_m_s2: Vector3::zeros(),
        }
    }

    /// `mu * (d / |d|^3 - s / |s|^3)` with `s` the body seen from the central
    /// body and `d` the body seen from the spacecraft.
    pub fn calc_acceleration_i_m_s2(
        position_from_center_i_m: &Vector3<f64>,
        position_from_sc_i_m: &Vector3<f64>,
        gravity_constant_m3_s2: f64,
    ) -> Vector3<f64> {
        let s_norm = position_from_center_i_m.norm();
        let d_norm = position_from_sc_i_m.norm();
        if s_norm <= 0.0 || d_norm <= 0.0 {
            return Vector3::zeros();
        }
        let s3 = s_norm * s_norm * s_norm;
        let d3 = d_norm * d_norm * d_norm;
        gravity_constant_m3_s2 * (position_from_sc_i_m / d3 - position_from_center_i_m / s3)
    }
}

impl Disturbance for ThirdBodyGravity {
    fn name(&self) -> &'static str {
        "third_body_gravity"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, environment: &LocalEnvironment, _dynamics: &SpacecraftDynamics) {
        self.acceleration_i_m_s2 = Vector3::zeros();

        for name in &self.bodies {
            let Some(body) = environment.third_bodies.iter().find(|b| b.name.eq_ignore_ascii_case(name)) else {
                debug!("Third body {} not present in environment", name);
                continue;
            };
            self.acceleration_i_m_s2 += Self::calc_acceleration_i_m_s2(
                &body.position_i_m,
                &body.position_from_sc_i_m,
                body.gravity_constant_m3_s2,
            );
        }
    }

    fn as_loggable(&self) -> &dyn Loggable {
        self
    }
}

impl AccelerationModel for ThirdBodyGravity {
    fn acceleration_i_m_s2(&self) -> Vector3<f64> {
        self.acceleration_i_m_s2
    }
}

impl Loggable for ThirdBodyGravity {
    fn log_header(&self) -> String {
        vector_header("third_body_acceleration", "i", "m/s2")
    }

    fn log_value(&self) -> String {
        vector_value(&self.acceleration_i_m_s2)
    }
}
