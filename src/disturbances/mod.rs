//! Disturbance models and the aggregator that sums them.
//!
//! Force/torque models act in the body frame and depend on attitude; they
//! are summed when the attitude is due for propagation. Acceleration models
//! act in the inertial frame and depend only on position; they are summed
//! when the orbit is due. Summation order is registration order.

pub mod air_drag;
pub mod geopotential;
pub mod gravity_gradient;
pub mod magnetic;
pub mod solar_radiation_pressure;
pub mod third_body_gravity;

pub use air_drag::{AirDrag, AirDragConfig};
pub use geopotential::{Geopotential, GeopotentialConfig};
pub use gravity_gradient::{GravityGradient, GravityGradientConfig};
pub use magnetic::{MagneticDisturbance, MagneticDisturbanceConfig};
pub use solar_radiation_pressure::{SolarRadiationPressure, SolarRadiationPressureConfig};
pub use third_body_gravity::{ThirdBodyGravity, ThirdBodyGravityConfig};

use crate::environment::{CentralBody, LocalEnvironment, SpacecraftDynamics, SpacecraftStructure};
use crate::logger::{LogSink, Loggable};
use crate::scheduler::RegistryError;
use crate::time::TimeAuthority;
use heapless::Vec;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MAX_DISTURBANCES: usize = 16;

/// Common surface of every disturbance model.
pub trait Disturbance {
    fn name(&self) -> &'static str;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);

    /// Recompute the model outputs. Callers go through [`Disturbance::update_if_enabled`].
    fn update(&mut self, environment: &LocalEnvironment, dynamics: &SpacecraftDynamics);

    fn as_loggable(&self) -> &dyn Loggable;

    /// A disabled model keeps its last outputs, which are zero if it was never enabled.
    fn update_if_enabled(&mut self, environment: &LocalEnvironment, dynamics: &SpacecraftDynamics) {
        if self.is_enabled() {
            self.update(environment, dynamics);
        }
    }
}

/// Contributor of body-frame force and torque.
pub trait ForceTorqueModel: Disturbance {
    fn force_b_n(&self) -> Vector3<f64>;
    fn torque_b_nm(&self) -> Vector3<f64>;
}

/// Contributor of inertial-frame acceleration.
pub trait AccelerationModel: Disturbance {
    fn acceleration_i_m_s2(&self) -> Vector3<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DisturbanceConfig {
    pub gravity_gradient: GravityGradientConfig,
    pub solar_radiation_pressure: SolarRadiationPressureConfig,
    pub third_body_gravity: ThirdBodyGravityConfig,
    pub air_drag: AirDragConfig,
    pub magnetic_disturbance: MagneticDisturbanceConfig,
    pub geopotential: GeopotentialConfig,
}

/// Setup-phase registry. [`DisturbancesBuilder::build`] closes it.
pub struct DisturbancesBuilder {
    force_torque_models: Vec<Box<dyn ForceTorqueModel>, MAX_DISTURBANCES>,
    acceleration_models: Vec<Box<dyn AccelerationModel>, MAX_DISTURBANCES>,
    config_path: Option<PathBuf>,
}

impl DisturbancesBuilder {
    pub fn new() -> Self {
        Self {
            force_torque_models: Vec::new(),
            acceleration_models: Vec::new(),
            config_path: None,
        }
    }

    pub fn config_path(mut self, path: &Path) -> Self {
        self.config_path = Some(path.to_path_buf());
        self
    }

    pub fn add_force_torque_model(&mut self, model: Box<dyn ForceTorqueModel>) -> Result<(), RegistryError> {
        self.force_torque_models.push(model).map_err(|rejected| {
            warn!("Disturbance registry full; dropping {}", rejected.name());
            RegistryError::Full
        })
    }

    pub fn add_acceleration_model(&mut self, model: Box<dyn AccelerationModel>) -> Result<(), RegistryError> {
        self.acceleration_models.push(model).map_err(|rejected| {
            warn!("Disturbance registry full; dropping {}", rejected.name());
            RegistryError::Full
        })
    }

    pub fn build(self) -> Disturbances {
        debug!(
            force_torque = self.force_torque_models.len(),
            acceleration = self.acceleration_models.len(),
            "Disturbance registries built"
        );
        Disturbances {
            force_torque_models: self.force_torque_models,
            acceleration_models: self.acceleration_models,
            total_force_b_n: Vector3::zeros(),
            total_torque_b_nm: Vector3::zeros(),
            total_acceleration_i_m_s2: Vector3::zeros(),
            config_path: self.config_path,
        }
    }
}

impl Default for DisturbancesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns every disturbance model and the running totals of their outputs.
pub struct Disturbances {
    force_torque_models: Vec<Box<dyn ForceTorqueModel>, MAX_DISTURBANCES>,
    acceleration_models: Vec<Box<dyn AccelerationModel>, MAX_DISTURBANCES>,
    total_force_b_n: Vector3<f64>,
    total_torque_b_nm: Vector3<f64>,
    total_acceleration_i_m_s2: Vector3<f64>,
    config_path: Option<PathBuf>,
}

impl Disturbances {
    pub fn builder() -> DisturbancesBuilder {
        DisturbancesBuilder::new()
    }

    /// Construct the standard model set for `central_body`.
    ///
    /// Air drag, magnetic residual torque and geopotential only exist for
    /// Earth. For any other central body they are not constructed at all and
    /// a warning is emitted.
    pub fn from_config(
        config: &DisturbanceConfig,
        central_body: &CentralBody,
        structure: &SpacecraftStructure,
        config_path: Option<&Path>,
    ) -> Result<Self, RegistryError> {
        let mut builder = DisturbancesBuilder::new();
        if let Some(path) = config_path {
            builder = builder.config_path(path);
        }
        let cg = &structure.center_of_gravity_b_m;

        builder.add_force_torque_model(Box::new(GravityGradient::new(&config.gravity_gradient)))?;
        builder.add_force_torque_model(Box::new(SolarRadiationPressure::new(
            &config.solar_radiation_pressure,
            cg,
        )))?;
        builder.add_acceleration_model(Box::new(ThirdBodyGravity::new(&config.third_body_gravity)))?;

        if !central_body.is_earth() {
            // TODO: add drag/field/harmonics sets for other central bodies once their environment models exist
            warn!(
                central_body = %central_body,
                "Earth-only disturbances omitted: air drag, magnetic residual torque, geopotential"
            );
            return Ok(builder.build());
        }

        builder.add_force_torque_model(Box::new(AirDrag::new(&config.air_drag, cg)))?;
        builder.add_force_torque_model(Box::new(MagneticDisturbance::new(
            &config.magnetic_disturbance,
            &structure.residual_magnetic_moment_b_am2,
        )))?;
        builder.add_acceleration_model(Box::new(Geopotential::new(&config.geopotential)))?;

        Ok(builder.build())
    }

    /// Recompute the totals whose propagate flag is set; leave the others untouched.
    pub fn update(
        &mut self,
        environment: &LocalEnvironment,
        dynamics: &SpacecraftDynamics,
        time: &impl TimeAuthority,
    ) {
        if time.attitude_propagate_due() {
            self.total_force_b_n = Vector3::zeros();
            self.total_torque_b_nm = Vector3::zeros();
            for model in self.force_torque_models.iter_mut() {
                model.update_if_enabled(environment, dynamics);
                self.total_torque_b_nm += model.torque_b_nm();
                self.total_force_b_n += model.force_b_n();
            }
        }

        if time.orbit_propagate_due() {
            self.total_acceleration_i_m_s2 = Vector3::zeros();
            for model in self.acceleration_models.iter_mut() {
                model.update_if_enabled(environment, dynamics);
                self.total_acceleration_i_m_s2 += model.acceleration_i_m_s2();
            }
        }
    }

    /// Register every model with `sink` and archive the configuration source.
    pub fn log_setup(&self, sink: &mut dyn LogSink) {
        for loggable in self.loggables() {
            sink.add_log_list(loggable);
        }
        match self.config_path.as_deref() {
            Some(path) => sink.copy_file_to_log_directory(path),
            None => debug!("No disturbance configuration file to archive"),
        }
    }

    /// Every model, force/torque kind first, in registration order.
    pub fn loggables(&self) -> impl Iterator<Item = &dyn Loggable> + '_ {
        self.force_torque_models
            .iter()
            .map(|m| m.as_loggable())
            .chain(self.acceleration_models.iter().map(|m| m.as_loggable()))
    }

    pub fn total_force_b_n(&self) -> Vector3<f64> {
        self.total_force_b_n
    }

    pub fn total_torque_b_nm(&self) -> Vector3<f64> {
        self.total_torque_b_nm
    }

    pub fn total_acceleration_i_m_s2(&self) -> Vector3<f64> {
        self.total_acceleration_i_m_s2
    }

    pub fn force_torque_models(&self) -> impl Iterator<Item = &dyn ForceTorqueModel> + '_ {
        self.force_torque_models.iter().map(|m| &**m)
    }

    pub fn acceleration_models(&self) -> impl Iterator<Item = &dyn AccelerationModel> + '_ {
        self.acceleration_models.iter().map(|m| &**m)
    }

    pub fn model_names(&self) -> std::vec::Vec<&'static str> {
        self.force_torque_models
            .iter()
            .map(|m| m.name())
            .chain(self.acceleration_models.iter().map(|m| m.name()))
            .collect()
    }

    /// Enable or disable every model with the given name. Returns how many matched.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> usize {
        let mut matched = 0;
        for model in self.force_torque_models.iter_mut().filter(|m| m.name() == name) {
            model.set_enabled(enabled);
            matched += 1;
        }
        for model in self.acceleration_models.iter_mut().filter(|m| m.name() == name) {
            model.set_enabled(enabled);
            matched += 1;
        }
        matched
    }

    /// Name and enable flag of every model, force/torque models first.
    pub fn enable_flags(&self) -> std::vec::Vec<(&'static str, bool)> {
        self.force_torque_models
            .iter()
            .map(|m| (m.name(), m.is_enabled()))
            .chain(self.acceleration_models.iter().map(|m| (m.name(), m.is_enabled())))
            .collect()
    }

    /// Reapply flags taken with [`Disturbances::enable_flags`] from an
    /// aggregator built the same way. Entries whose name does not match the
    /// model at the same position are skipped.
    pub fn restore_enable_flags(&mut self, flags: &[(&'static str, bool)]) {
        let (force_torque_flags, acceleration_flags) = flags.split_at(self.force_torque_models.len().min(flags.len()));
        for (model, (name, enabled)) in self.force_torque_models.iter_mut().zip(force_torque_flags) {
            restore_flag(&mut **model, name, *enabled);
        }
        for (model, (name, enabled)) in self.acceleration_models.iter_mut().zip(acceleration_flags) {
            restore_flag(&mut **model, name, *enabled);
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

fn restore_flag<M: Disturbance + ?Sized>(model: &mut M, name: &str, enabled: bool) {
    if model.name() == name {
        model.set_enabled(enabled);
    } else {
        warn!("Enable flag for {} does not match model {}", name, model.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flags {
        attitude: bool,
        orbit: bool,
    }

    impl TimeAuthority for Flags {
        fn attitude_propagate_due(&self) -> bool {
            self.attitude
        }

        fn orbit_propagate_due(&self) -> bool {
            self.orbit
        }

        fn component_update_due(&self) -> bool {
            false
        }
    }

    fn snapshot() -> (LocalEnvironment, SpacecraftDynamics) {
        let structure = SpacecraftStructure::default();
        let mut dynamics = SpacecraftDynamics::new(
            &structure,
            Vector3::new(6.0e6, 2.0e6, 1.0e6),
            Vector3::new(-1.0e3, 7.0e3, 1.0e3),
        );
        dynamics.attitude_i2b = nalgebra::UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        let mut environment = LocalEnvironment::default();
        environment.update(&dynamics);
        (environment, dynamics)
    }

    #[test]
    fn test_earth_model_set() {
        let disturbances = Disturbances::from_config(
            &DisturbanceConfig::default(),
            &CentralBody::earth(),
            &SpacecraftStructure::default(),
            None,
        )
        .unwrap();

        assert_eq!(
            disturbances.model_names(),
            vec![
                "gravity_gradient",
                "solar_radiation_pressure",
                "air_drag",
                "magnetic_disturbance",
                "third_body_gravity",
                "geopotential",
            ]
        );
    }

    #[test]
    fn test_flags_gate_each_total() {
        let (environment, dynamics) = snapshot();
        let mut disturbances = Disturbances::from_config(
            &DisturbanceConfig::default(),
            &CentralBody::earth(),
            &SpacecraftStructure::default(),
            None,
        )
        .unwrap();

        disturbances.update(&environment, &dynamics, &Flags { attitude: true, orbit: false });
        assert!(disturbances.total_torque_b_nm().norm() > 0.0);
        assert_eq!(disturbances.total_acceleration_i_m_s2(), Vector3::zeros());

        disturbances.update(&environment, &dynamics, &Flags { attitude: false, orbit: true });
        assert!(disturbances.total_acceleration_i_m_s2().norm() > 0.0);
    }

    #[test]
    fn test_enable_flags_carry_to_rebuilt_aggregator() {
        let build = || {
            Disturbances::from_config(
                &DisturbanceConfig::default(),
                &CentralBody::earth(),
                &SpacecraftStructure::default(),
                None,
            )
            .unwrap()
        };
        let mut first = build();
        first.set_enabled("air_drag", false);
        first.set_enabled("geopotential", false);

        let mut second = build();
        second.restore_enable_flags(&first.enable_flags());

        assert_eq!(second.enable_flags(), first.enable_flags());
        assert!(second.enable_flags().contains(&("air_drag", false)));
        assert!(second.enable_flags().contains(&("gravity_gradient", true)));
    }

    #[test]
    fn test_set_enabled_by_name() {
        let mut disturbances = Disturbances::from_config(
            &DisturbanceConfig::default(),
            &CentralBody::earth(),
            &SpacecraftStructure::default(),
            None,
        )
        .unwrap();

        assert_eq!(disturbances.set_enabled("air_drag", false), 1);
        assert_eq!(disturbances.set_enabled("no_such_model", false), 0);
        assert!(!disturbances.force_torque_models().find(|m| m.name() == "air_drag").unwrap().is_enabled());
    }
}
