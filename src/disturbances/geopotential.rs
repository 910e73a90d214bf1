use super::{AccelerationModel, Disturbance};
use crate::environment::{LocalEnvironment, SpacecraftDynamics, EARTH_EQUATORIAL_RADIUS_M};
use crate::logger::{vector_header, vector_value, Loggable};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const EARTH_J2: f64 = 1.082_626_68e-3;
const MAX_DEGREE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeopotentialConfig {
    pub enabled: bool,
    /// 0 or 1 disables the harmonics; 2 adds the J2 zonal term.
    pub degree: u32,
    pub j2: f64,
    pub reference_radius_m: f64,
}

impl Default for GeopotentialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            degree: 2,
            j2: EARTH_J2,
            reference_radius_m: EARTH_EQUATORIAL_RADIUS_M,
        }
    }
}

/// Non-spherical gravity of the central body, truncated at the J2 zonal term.
///
/// J2 is axisymmetric about the rotation axis, so the acceleration can be
/// evaluated directly in the inertial frame without a body-fixed rotation.
#[derive(Debug, Clone)]
pub struct Geopotential {
    enabled: bool,
    degree: u32,
    j2: f64,
    reference_radius_m: f64,
    acceleration_i_m_s2: Vector3<f64>,
}

impl Geopotential {
    pub fn new(config: &GeopotentialConfig) -> Self {
        let degree = if config.degree > MAX_DEGREE {
            warn!(
                requested = config.degree,
                limit = MAX_DEGREE,
                "Geopotential degree too large; truncating"
            );
            MAX_DEGREE
        } else if config.degree <= 1 {
            0
        } else {
            config.degree
        };

        Self {
            enabled: config.enabled,
            degree,
            j2: config.j2,
            reference_radius_m: config.reference_radius_m,
            acceleration_i_m_s2: Vector3::zeros(),
        }
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn calc_j2_acceleration_i_m_s2(
        position_i_m: &Vector3<f64>,
        gravity_constant_m3_s2: f64,
        j2: f64,
        reference_radius_m: f64,
    ) -> Vector3<f64> {
        let r2 = position_i_m.norm_squared();
        if r2 <= 0.0 {
            return Vector3::zeros();
        }
        let r = r2.sqrt();
        let z2_over_r2 = position_i_m.z * position_i_m.z / r2;
        let factor = -1.5 * j2 * gravity_constant_m3_s2 * reference_radius_m * reference_radius_m / (r2 * r2 * r);

        Vector3::new(
            factor * position_i_m.x * (1.0 - 5.0 * z2_over_r2),
            factor * position_i_m.y * (1.0 - 5.0 * z2_over_r2),
            factor * position_i_m.z * (3.0 - 5.0 * z2_over_r2),
        )
    }
}

impl Disturbance for Geopotential {
    fn name(&self) -> &'static str {
        "geopotential"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, environment: &LocalEnvironment, dynamics: &SpacecraftDynamics) {
        if self.degree < 2 {
            self.acceleration_i_m_s2 = Vector3::zeros();
            return;
        }
        self.acceleration_i_m_s2 = Self::calc_j2_acceleration_i_m_s2(
            &dynamics.position_i_m,
            environment.central_body_gravity_constant_m3_s2,
            self.j2,
            self.reference_radius_m,
        );
    }

    fn as_loggable(&self) -> &dyn Loggable {
        self
    }
}

impl AccelerationModel for Geopotential {
    fn acceleration_i_m_s2(&self) -> Vector3<f64> {
        self.acceleration_i_m_s2
    }
}

impl Loggable for Geopotential {
    fn log_header(&self) -> String {
        vector_header("geopotential_acceleration", "i", "m/s2")
    }

    fn log_value(&self) -> String {
        vector_value(&self.acceleration_i_m_s2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EARTH_GRAVITY_CONSTANT_M3_S2;
    use approx::assert_relative_eq;

    #[test]
    fn test_equatorial_j2_points_inward() {
        let r = 7.0e6;
        let acc = Geopotential::calc_j2_acceleration_i_m_s2(
            &Vector3::new(r, 0.0, 0.0),
            EARTH_GRAVITY_CONSTANT_M3_S2,
            EARTH_J2,
            EARTH_EQUATORIAL_RADIUS_M,
        );
        let expected = -1.5 * EARTH_J2 * EARTH_GRAVITY_CONSTANT_M3_S2 * EARTH_EQUATORIAL_RADIUS_M.powi(2) / r.powi(4);

        assert_relative_eq!(acc.x, expected, max_relative = 1e-12);
        assert_eq!(acc.z, 0.0);
    }

    #[test]
    fn test_polar_j2_points_outward() {
        let acc = Geopotential::calc_j2_acceleration_i_m_s2(
            &Vector3::new(0.0, 0.0, 7.0e6),
            EARTH_GRAVITY_CONSTANT_M3_S2,
            EARTH_J2,
            EARTH_EQUATORIAL_RADIUS_M,
        );
        assert!(acc.z > 0.0);
    }

    #[test]
    fn test_degree_handling() {
        let low = Geopotential::new(&GeopotentialConfig { degree: 1, ..GeopotentialConfig::default() });
        let high = Geopotential::new(&GeopotentialConfig { degree: 8, ..GeopotentialConfig::default() });
        assert_eq!(low.degree(), 0);
        assert_eq!(high.degree(), 2);
    }
}
