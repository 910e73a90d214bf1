use super::{Disturbance, ForceTorqueModel};
use crate::environment::{LocalEnvironment, SpacecraftDynamics};
use crate::logger::{vector_header, vector_value, Loggable};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityGradientConfig {
    pub enabled: bool,
}

impl Default for GravityGradientConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Torque from the central body's gravity varying across the spacecraft.
#[derive(Debug, Clone)]
pub struct GravityGradient {
    enabled: bool,
    torque_b_nm: Vector3<f64>,
}

impl GravityGradient {
    pub fn new(config: &GravityGradientConfig) -> Self {
        Self {
            enabled: config.enabled,
            torque_b_nm: Vector3::zeros(),
        }
    }

    /// `3 mu / r^3 * (r_b x I r_b)` with `r_b` the unit nadir-opposite vector in the body frame.
    pub fn calc_torque_b_nm(
        gravity_constant_m3_s2: f64,
        position_b_m: &Vector3<f64>,
        inertia_b_kgm2: &nalgebra::Matrix3<f64>,
    ) -> Vector3<f64> {
        let r = position_b_m.norm();
        if r <= 0.0 {
            return Vector3::zeros();
        }
        let unit = position_b_m / r;
        let coefficient = 3.0 * gravity_constant_m3_s2 / (r * r * r);
        coefficient * unit.cross(&(inertia_b_kgm2 * unit))
    }
}

impl Disturbance for GravityGradient {
    fn name(&self) -> &'static str {
        "gravity_gradient"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, environment: &LocalEnvironment, dynamics: &SpacecraftDynamics) {
        let position_b_m = dynamics.inertial_to_body(&dynamics.position_i_m);
        self.torque_b_nm = Self::calc_torque_b_nm(
            environment.central_body_gravity_constant_m3_s2,
            &position_b_m,
            &dynamics.inertia_tensor_b_kgm2,
        );
    }

    fn as_loggable(&self) -> &dyn Loggable {
        self
    }
}

impl ForceTorqueModel for GravityGradient {
    fn force_b_n(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn torque_b_nm(&self) -> Vector3<f64> {
        self.torque_b_nm
    }
}

impl Loggable for GravityGradient {
    fn log_header(&self) -> String {
        vector_header("gravity_gradient_torque", "b", "Nm")
    }

    fn log_value(&self) -> String {
        vector_value(&self.torque_b_nm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    #[test]
    fn test_no_torque_along_principal_axis() {
        let inertia = Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0));
        let torque = GravityGradient::calc_torque_b_nm(3.986e14, &Vector3::new(7.0e6, 0.0, 0.0), &inertia);
        assert_eq!(torque, Vector3::zeros());
    }

    #[test]
    fn test_symmetric_body_feels_no_torque() {
        let inertia = Matrix3::identity() * 2.0;
        let torque = GravityGradient::calc_torque_b_nm(3.986e14, &Vector3::new(4.0e6, 4.0e6, 1.0e6), &inertia);
        assert!(torque.norm() < 1e-20);
    }

    #[test]
    fn test_off_axis_torque() {
        let inertia = Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0));
        let r = 7.0e6;
        let position = Vector3::new(r, r, 0.0) / 2.0_f64.sqrt();
        let torque = GravityGradient::calc_torque_b_nm(3.986e14, &position, &inertia);

        // u = (1,1,0)/sqrt2, I u = (1,2,0)/sqrt2, u x I u = (0,0,0.5)
        let expected_z = 3.0 * 3.986e14 / (r * r * r) * 0.5;
        assert!((torque.z - expected_z).abs() < expected_z * 1e-12);
        assert!(torque.x.abs() < 1e-20 && torque.y.abs() < 1e-20);
    }
}
