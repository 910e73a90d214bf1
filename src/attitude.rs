//! Rigid-body attitude propagation.
//!
//! Euler's equations with the aggregated disturbance torque, coupled with
//! the kinematics of the inertial-to-body quaternion, integrated by the same
//! embedded Runge-Kutta driver as the orbit.

use crate::config::IntegratorConfig;
use crate::integrator::{EmbeddedRungeKutta, IntegratorError, Ode, Scheme, StepLimits};
use nalgebra::{Matrix3, Quaternion, SVector, UnitQuaternion, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AttitudeError {
    #[error("inertia tensor is singular")]
    SingularInertia,
    #[error("initial attitude quaternion has no direction")]
    DegenerateQuaternion,
    #[error(transparent)]
    Integrator(#[from] IntegratorError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttitudeConfig {
    /// Components in `[x, y, z, w]` order.
    pub initial_quaternion_i2b: [f64; 4],
    pub initial_angular_velocity_b_rad_s: [f64; 3],
    pub integrator: IntegratorConfig,
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            initial_quaternion_i2b: [0.0, 0.0, 0.0, 1.0],
            initial_angular_velocity_b_rad_s: [0.0; 3],
            integrator: IntegratorConfig {
                scheme: Scheme::DormandPrince5,
                initial_step_s: 0.1,
                tolerance: 1e-10,
                min_step_s: 1e-5,
                max_step_s: 1.0,
            },
        }
    }
}

impl AttitudeConfig {
    pub fn initial_attitude_i2b(&self) -> Result<UnitQuaternion<f64>, AttitudeError> {
        let coords = Vector4::from(self.initial_quaternion_i2b);
        UnitQuaternion::try_new(Quaternion::from(coords), f64::EPSILON).ok_or(AttitudeError::DegenerateQuaternion)
    }
}

/// Rigid-body rotation under a torque held constant over one propagation.
///
/// State layout is `[q_i2b (x, y, z, w); angular_velocity_b_rad_s]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeOde {
    inertia_b_kgm2: Matrix3<f64>,
    inverse_inertia_b: Matrix3<f64>,
    pub torque_b_nm: Vector3<f64>,
}

impl AttitudeOde {
    pub fn new(inertia_b_kgm2: Matrix3<f64>) -> Result<Self, AttitudeError> {
        let inverse_inertia_b = inertia_b_kgm2.try_inverse().ok_or(AttitudeError::SingularInertia)?;
        Ok(Self {
            inertia_b_kgm2,
            inverse_inertia_b,
            torque_b_nm: Vector3::zeros(),
        })
    }
}

impl Ode<7> for AttitudeOde {
    fn derivative(&self, _time: f64, state: &SVector<f64, 7>) -> SVector<f64, 7> {
        let quaternion = Quaternion::from(state.fixed_rows::<4>(0).into_owned());
        let omega = state.fixed_rows::<3>(4).into_owned();

        let angular_momentum = self.inertia_b_kgm2 * omega;
        let angular_acceleration = self.inverse_inertia_b * (self.torque_b_nm - omega.cross(&angular_momentum));

        // q_i2b maps inertial vectors into the body frame, so it evolves as
        // dq/dt = -1/2 (0, omega) * q
        let rate = Quaternion::from_parts(0.0, omega) * quaternion * -0.5;

        let mut derivative = SVector::<f64, 7>::zeros();
        derivative.fixed_rows_mut::<4>(0).copy_from(&rate.coords);
        derivative.fixed_rows_mut::<3>(4).copy_from(&angular_acceleration);
        derivative
    }
}

pub struct AttitudePropagator {
    integrator: EmbeddedRungeKutta<7, AttitudeOde>,
    tolerance: f64,
    initial_step_s: f64,
    total_steps: u64,
}

impl AttitudePropagator {
    pub fn new(
        config: &IntegratorConfig,
        inertia_b_kgm2: Matrix3<f64>,
        attitude_i2b: UnitQuaternion<f64>,
        angular_velocity_b_rad_s: Vector3<f64>,
    ) -> Result<Self, AttitudeError> {
        let limits = StepLimits::new(config.min_step_s, config.max_step_s)?;
        let initial_step_s = config.initial_step_s.clamp(limits.min_s, limits.max_s);
        let mut integrator =
            EmbeddedRungeKutta::new(config.scheme.tableau(), initial_step_s, AttitudeOde::new(inertia_b_kgm2)?)?
                .with_limits(limits);
        integrator.set_state(0.0, attitude_state(&attitude_i2b, &angular_velocity_b_rad_s));

        Ok(Self {
            integrator,
            tolerance: config.tolerance,
            initial_step_s,
            total_steps: 0,
        })
    }

    /// Integrate up to `target_s` under a constant body-frame torque.
    ///
    /// The quaternion is renormalized once the target is reached.
    pub fn propagate_to(&mut self, target_s: f64, torque_b_nm: Vector3<f64>) -> Result<(), IntegratorError> {
        self.integrator.ode_mut().torque_b_nm = torque_b_nm;
        let steps = self.integrator.integrate_until(target_s, self.tolerance)?;
        if steps == 0 {
            return Ok(());
        }
        self.total_steps += steps;

        let width_s = self.integrator.step_width_s();
        let state = attitude_state(&self.attitude_i2b(), &self.angular_velocity_b_rad_s());
        self.integrator.set_state(self.integrator.current_time_s(), state);
        self.integrator.set_step_width(width_s)?;
        Ok(())
    }

    pub fn reset(
        &mut self,
        attitude_i2b: UnitQuaternion<f64>,
        angular_velocity_b_rad_s: Vector3<f64>,
    ) -> Result<(), IntegratorError> {
        self.integrator.set_step_width(self.initial_step_s)?;
        self.integrator.set_state(0.0, attitude_state(&attitude_i2b, &angular_velocity_b_rad_s));
        self.total_steps = 0;
        debug!("Attitude propagator reset");
        Ok(())
    }

    pub fn attitude_i2b(&self) -> UnitQuaternion<f64> {
        let coords = self.integrator.state().fixed_rows::<4>(0).into_owned();
        UnitQuaternion::new_normalize(Quaternion::from(coords))
    }

    pub fn angular_velocity_b_rad_s(&self) -> Vector3<f64> {
        self.integrator.state().fixed_rows::<3>(4).into_owned()
    }

    pub fn current_time_s(&self) -> f64 {
        self.integrator.current_time_s()
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn integrator(&self) -> &EmbeddedRungeKutta<7, AttitudeOde> {
        &self.integrator
    }
}

fn attitude_state(attitude_i2b: &UnitQuaternion<f64>, angular_velocity_b_rad_s: &Vector3<f64>) -> SVector<f64, 7> {
    let mut state = SVector::<f64, 7>::zeros();
    state.fixed_rows_mut::<4>(0).copy_from(&attitude_i2b.coords);
    state.fixed_rows_mut::<3>(4).copy_from(angular_velocity_b_rad_s);
    state
}
