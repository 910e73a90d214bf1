use super::{Disturbance, ForceTorqueModel};
use crate::environment::{LocalEnvironment, SpacecraftDynamics};
use crate::logger::{vector_header, vector_value, Loggable};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirDragConfig {
    pub enabled: bool,
    pub area_m2: f64,
    pub drag_coefficient: f64,
    pub center_of_pressure_b_m: [f64; 3],
}

impl Default for AirDragConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            area_m2: 1.0,
            drag_coefficient: 2.2,
            center_of_pressure_b_m: [0.0, 0.03, 0.0],
        }
    }
}

/// Atmospheric drag against the inertial velocity. Atmosphere co-rotation is ignored.
#[derive(Debug, Clone)]
pub struct AirDrag {
    enabled: bool,
    area_m2: f64,
    drag_coefficient: f64,
    lever_arm_b_m: Vector3<f64>,
    force_b_n: Vector3<f64>,
    torque_b_nm: Vector3<f64>,
}

impl AirDrag {
    pub fn new(config: &AirDragConfig, center_of_gravity_b_m: &Vector3<f64>) -> Self {
        Self {
            enabled: config.enabled,
            area_m2: config.area_m2,
            drag_coefficient: config.drag_coefficient,
            lever_arm_b_m: Vector3::from(config.center_of_pressure_b_m) - center_of_gravity_b_m,
            force_b_n: Vector3::zeros(),
            torque_b_nm: Vector3::zeros(),
        }
    }
}

impl Disturbance for AirDrag {
    fn name(&self) -> &'static str {
        "air_drag"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, environment: &LocalEnvironment, dynamics: &SpacecraftDynamics) {
        let velocity_b_m_s = dynamics.inertial_to_body(&dynamics.velocity_i_m_s);
        let coefficient = 0.5
            * environment.air_density_kg_m3
            * self.drag_coefficient
            * self.area_m2
            * velocity_b_m_s.norm();

        self.force_b_n = -coefficient * velocity_b_m_s;
        self.torque_b_nm = self.lever_arm_b_m.cross(&self.force_b_n);
    }

    fn as_loggable(&self) -> &dyn Loggable {
        self
    }
}

impl ForceTorqueModel for AirDrag {
    fn force_b_n(&self) -> Vector3<f64> {
        self.force_b_n
    }

    fn torque_b_nm(&self) -> Vector3<f64> {
        self.torque_b_nm
    }
}

impl Loggable for AirDrag {
    fn log_header(&self) -> String {
        vector_header("air_drag_torque", "b", "Nm") + &vector_header("air_drag_force", "b", "N")
    }

    fn log_value(&self) -> String {
        vector_value(&self.torque_b_nm) + &vector_value(&self.force_b_n)
    }
}
