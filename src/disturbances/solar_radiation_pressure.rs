use super::{Disturbance, ForceTorqueModel};
use crate::environment::{LocalEnvironment, SpacecraftDynamics};
use crate::logger::{vector_header, vector_value, Loggable};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarRadiationPressureConfig {
    pub enabled: bool,
    pub area_m2: f64,
    pub reflectivity_coefficient: f64,
    pub center_of_pressure_b_m: [f64; 3],
}

impl Default for SolarRadiationPressureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            area_m2: 1.0,
            reflectivity_coefficient: 1.3,
            center_of_pressure_b_m: [0.02, 0.0, 0.0],
        }
    }
}

/// Cannonball solar radiation pressure acting at a fixed center of pressure.
#[derive(Debug, Clone)]
pub struct SolarRadiationPressure {
    enabled: bool,
    area_m2: f64,
    reflectivity_coefficient: f64,
    lever_arm_b_m: Vector3<f64>,
    force_b_n: Vector3<f64>,
    torque_b_nm: Vector3<f64>,
}

impl SolarRadiationPressure {
    pub fn new(config: &SolarRadiationPressureConfig, center_of_gravity_b_m: &Vector3<f64>) -> Self {
        Self {
            enabled: config.enabled,
            area_m2: config.area_m2,
            reflectivity_coefficient: config.reflectivity_coefficient,
            lever_arm_b_m: Vector3::from(config.center_of_pressure_b_m) - center_of_gravity_b_m,
            force_b_n: Vector3::zeros(),
            torque_b_nm: Vector3::zeros(),
        }
    }
}

impl Disturbance for SolarRadiationPressure {
    fn name(&self) -> &'static str {
        "solar_radiation_pressure"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, environment: &LocalEnvironment, dynamics: &SpacecraftDynamics) {
        let sun_direction_b = dynamics.inertial_to_body(&environment.sun_direction_i);
        let magnitude_n = environment.solar_pressure_n_m2
            * self.reflectivity_coefficient
            * self.area_m2
            * environment.illumination;

        // Pressure pushes away from the sun.
        self.force_b_n = -magnitude_n * sun_direction_b;
        self.torque_b_nm = self.lever_arm_b_m.cross(&self.force_b_n);
    }

    fn as_loggable(&self) -> &dyn Loggable {
        self
    }
}

impl ForceTorqueModel for SolarRadiationPressure {
    fn force_b_n(&self) -> Vector3<f64> {
        self.force_b_n
    }

    fn torque_b_nm(&self) -> Vector3<f64> {
        self.torque_b_nm
    }
}

impl Loggable for SolarRadiationPressure {
    fn log_header(&self) -> String {
        vector_header("srp_torque", "b", "Nm") + &vector_header("srp_force", "b", "N")
    }

    fn log_value(&self) -> String {
        vector_value(&self.torque_b_nm) + &vector_value(&self.force_b_n)
    }
}
