//! Environment and dynamics snapshots read by the disturbance models.
//!
//! Small stand-ins for the full environment and
//! dynamics stack: they carry exactly the quantities the models consume,
//! in SI units unless the field name says otherwise.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

pub const EARTH_GRAVITY_CONSTANT_M3_S2: f64 = 3.986_004_418e14;
pub const EARTH_EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;
pub const SOLAR_PRESSURE_AT_1AU_N_M2: f64 = 4.56e-6;

/// Name of the body the spacecraft orbits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CentralBody(String);

impl From<String> for CentralBody {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<CentralBody> for String {
    fn from(body: CentralBody) -> Self {
        body.0
    }
}

impl CentralBody {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_ascii_uppercase())
    }

    pub fn earth() -> Self {
        Self::new("EARTH")
    }

    pub fn is_earth(&self) -> bool {
        self.0 == "EARTH"
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for CentralBody {
    fn default() -> Self {
        Self::earth()
    }
}

impl core::fmt::Display for CentralBody {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mass properties and fixed geometry of the spacecraft.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacecraftStructure {
    pub mass_kg: f64,
    pub inertia_tensor_b_kgm2: Matrix3<f64>,
    pub center_of_gravity_b_m: Vector3<f64>,
    pub residual_magnetic_moment_b_am2: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub mass_kg: f64,
    pub inertia_diagonal_b_kgm2: [f64; 3],
    pub center_of_gravity_b_m: [f64; 3],
    pub residual_magnetic_moment_b_am2: [f64; 3],
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            mass_kg: 50.0,
            inertia_diagonal_b_kgm2: [2.0, 2.5, 3.0],
            center_of_gravity_b_m: [0.0; 3],
            residual_magnetic_moment_b_am2: [0.01, 0.0, 0.0],
        }
    }
}

impl SpacecraftStructure {
    pub fn from_config(config: &StructureConfig) -> Self {
        Self {
            mass_kg: config.mass_kg,
            inertia_tensor_b_kgm2: Matrix3::from_diagonal(&Vector3::from(config.inertia_diagonal_b_kgm2)),
            center_of_gravity_b_m: Vector3::from(config.center_of_gravity_b_m),
            residual_magnetic_moment_b_am2: Vector3::from(config.residual_magnetic_moment_b_am2),
        }
    }
}

impl Default for SpacecraftStructure {
    fn default() -> Self {
        Self::from_config(&StructureConfig::default())
    }
}

/// Kinematic state of the spacecraft at the current step.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacecraftDynamics {
    pub position_i_m: Vector3<f64>,
    pub velocity_i_m_s: Vector3<f64>,
    /// Rotation taking inertial-frame vectors into the body frame.
    pub attitude_i2b: UnitQuaternion<f64>,
    pub angular_velocity_b_rad_s: Vector3<f64>,
    pub inertia_tensor_b_kgm2: Matrix3<f64>,
    pub mass_kg: f64,
}

impl SpacecraftDynamics {
    pub fn new(structure: &SpacecraftStructure, position_i_m: Vector3<f64>, velocity_i_m_s: Vector3<f64>) -> Self {
        Self {
            position_i_m,
            velocity_i_m_s,
            attitude_i2b: UnitQuaternion::identity(),
            angular_velocity_b_rad_s: Vector3::zeros(),
            inertia_tensor_b_kgm2: structure.inertia_tensor_b_kgm2,
            mass_kg: structure.mass_kg,
        }
    }

    pub fn inertial_to_body(&self, vector_i: &Vector3<f64>) -> Vector3<f64> {
        self.attitude_i2b.transform_vector(vector_i)
    }

    pub fn altitude_m(&self, reference_radius_m: f64) -> f64 {
        self.position_i_m.norm() - reference_radius_m
    }
}

/// A gravitating body other than the central body.
#[derive(Debug, Clone, PartialEq)]
pub struct ThirdBody {
    pub name: String,
    pub gravity_constant_m3_s2: f64,
    /// Position relative to the central body.
    pub position_i_m: Vector3<f64>,
    /// Position relative to the spacecraft, refreshed every update.
    pub position_from_sc_i_m: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdBodyConfig {
    pub name: String,
    pub gravity_constant_m3_s2: f64,
    pub position_i_m: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub central_body_gravity_constant_m3_s2: f64,
    pub central_body_radius_m: f64,
    pub solar_pressure_n_m2: f64,
    pub sun_direction_i: [f64; 3],
    pub illumination: f64,
    pub magnetic_field_b_nt: [f64; 3],
    /// Exponential atmosphere: density at the reference altitude and scale height.
    pub atmosphere_reference_density_kg_m3: f64,
    pub atmosphere_reference_altitude_m: f64,
    pub atmosphere_scale_height_m: f64,
    pub third_bodies: Vec<ThirdBodyConfig>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            central_body_gravity_constant_m3_s2: EARTH_GRAVITY_CONSTANT_M3_S2,
            central_body_radius_m: EARTH_EQUATORIAL_RADIUS_M,
            solar_pressure_n_m2: SOLAR_PRESSURE_AT_1AU_N_M2,
            sun_direction_i: [1.0, 0.0, 0.0],
            illumination: 1.0,
            magnetic_field_b_nt: [20_000.0, 0.0, -30_000.0],
            // Vallado table entry for 500 km
            atmosphere_reference_density_kg_m3: 6.967e-13,
            atmosphere_reference_altitude_m: 500_000.0,
            atmosphere_scale_height_m: 63_822.0,
            third_bodies: vec![
                ThirdBodyConfig {
                    name: "MOON".to_string(),
                    gravity_constant_m3_s2: 4.902_800_066e12,
                    position_i_m: [-3.84e8, 0.0, 0.0],
                },
                ThirdBodyConfig {
                    name: "SUN".to_string(),
                    gravity_constant_m3_s2: 1.327_124_400_18e20,
                    position_i_m: [1.496e11, 0.0, 0.0],
                },
            ],
        }
    }
}

/// Environment as seen by the spacecraft at the current step.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEnvironment {
    pub central_body_gravity_constant_m3_s2: f64,
    pub central_body_radius_m: f64,
    pub solar_pressure_n_m2: f64,
    pub sun_direction_i: Vector3<f64>,
    /// 1.0 in full sun, 0.0 in umbra.
    pub illumination: f64,
    pub magnetic_field_b_nt: Vector3<f64>,
    pub air_density_kg_m3: f64,
    pub third_bodies: Vec<ThirdBody>,
    atmosphere_reference_density_kg_m3: f64,
    atmosphere_reference_altitude_m: f64,
    atmosphere_scale_height_m: f64,
}

impl LocalEnvironment {
    pub fn from_config(config: &EnvironmentConfig) -> Self {
        let sun_direction = Vector3::from(config.sun_direction_i);
        Self {
            central_body_gravity_constant_m3_s2: config.central_body_gravity_constant_m3_s2,
            central_body_radius_m: config.central_body_radius_m,
            solar_pressure_n_m2: config.solar_pressure_n_m2,
            sun_direction_i: sun_direction.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::x),
            illumination: config.illumination.clamp(0.0, 1.0),
            magnetic_field_b_nt: Vector3::from(config.magnetic_field_b_nt),
            air_density_kg_m3: 0.0,
            third_bodies: config
                .third_bodies
                .iter()
                .map(|body| ThirdBody {
                    name: body.name.clone(),
                    gravity_constant_m3_s2: body.gravity_constant_m3_s2,
                    position_i_m: Vector3::from(body.position_i_m),
                    position_from_sc_i_m: Vector3::from(body.position_i_m),
                })
                .collect(),
            atmosphere_reference_density_kg_m3: config.atmosphere_reference_density_kg_m3,
            atmosphere_reference_altitude_m: config.atmosphere_reference_altitude_m,
            atmosphere_scale_height_m: config.atmosphere_scale_height_m,
        }
    }

    /// Refresh the position-dependent quantities for the current dynamics.
    pub fn update(&mut self, dynamics: &SpacecraftDynamics) {
        let altitude_m = dynamics.altitude_m(self.central_body_radius_m);
        self.air_density_kg_m3 = self.density_at(altitude_m);

        for body in &mut self.third_bodies {
            body.position_from_sc_i_m = body.position_i_m - dynamics.position_i_m;
        }
    }

    pub fn density_at(&self, altitude_m: f64) -> f64 {
        if altitude_m < 0.0 || self.atmosphere_scale_height_m <= 0.0 {
            return 0.0;
        }
        let exponent = -(altitude_m - self.atmosphere_reference_altitude_m) / self.atmosphere_scale_height_m;
        self.atmosphere_reference_density_kg_m3 * exponent.exp()
    }
}

impl Default for LocalEnvironment {
    fn default() -> Self {
        Self::from_config(&EnvironmentConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_central_body_normalisation() {
        assert!(CentralBody::new(" earth ").is_earth());
        assert!(!CentralBody::new("MOON").is_earth());
        assert_eq!(CentralBody::new("mars").to_string(), "MARS");
    }

    #[test]
    fn test_density_decays_with_altitude() {
        let env = LocalEnvironment::default();
        let low = env.density_at(400_000.0);
        let reference = env.density_at(500_000.0);
        let high = env.density_at(600_000.0);

        assert_relative_eq!(reference, 6.967e-13, max_relative = 1e-12);
        assert!(low > reference && reference > high);
        assert_eq!(env.density_at(-1.0), 0.0);
    }

    #[test]
    fn test_update_refreshes_third_body_offsets() {
        let mut env = LocalEnvironment::default();
        let structure = SpacecraftStructure::default();
        let dynamics = SpacecraftDynamics::new(
            &structure,
            Vector3::new(7.0e6, 0.0, 0.0),
            Vector3::new(0.0, 7.5e3, 0.0),
        );

        env.update(&dynamics);

        let moon = &env.third_bodies[0];
        assert_relative_eq!(moon.position_from_sc_i_m.x, -3.84e8 - 7.0e6);
        assert!(env.air_density_kg_m3 > 0.0);
    }
}
