//! One simulation case: the clock, the component scheduler, the local
//! environment, the disturbance aggregator and the attitude and orbit
//! propagators driven together one base step at a time.

use crate::attitude::{AttitudeError, AttitudePropagator};
use crate::config::{ConfigError, IntegratorConfig, SimulationConfig};
use crate::disturbances::Disturbances;
use crate::environment::{LocalEnvironment, SpacecraftDynamics, SpacecraftStructure};
use crate::integrator::{EmbeddedRungeKutta, IntegratorError, Ode, StepLimits};
use crate::logger::{scalar_header, scalar_value, vector_header, vector_value, Logger, LoggerError};
use crate::scheduler::{RegistryError, Scheduler};
use crate::time::{SimulationTime, TimeAuthority};
use nalgebra::{SVector, UnitQuaternion, Vector3, Vector6};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Integrator(#[from] IntegratorError),
    #[error(transparent)]
    Attitude(#[from] AttitudeError),
    #[error(transparent)]
    Logger(#[from] LoggerError),
}

/// Point-mass gravity plus a constant perturbing acceleration.
///
/// State layout is `[position_i_m; velocity_i_m_s]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoBodyOde {
    pub gravity_constant_m3_s2: f64,
    pub perturbation_i_m_s2: Vector3<f64>,
}

impl TwoBodyOde {
    pub fn new(gravity_constant_m3_s2: f64) -> Self {
        Self {
            gravity_constant_m3_s2,
            perturbation_i_m_s2: Vector3::zeros(),
        }
    }
}

impl Ode<6> for TwoBodyOde {
    fn derivative(&self, _time: f64, state: &SVector<f64, 6>) -> SVector<f64, 6> {
        let position = state.fixed_rows::<3>(0).into_owned();
        let velocity = state.fixed_rows::<3>(3).into_owned();

        let r = position.norm();
        let acceleration = if r > 0.0 {
            position * (-self.gravity_constant_m3_s2 / (r * r * r)) + self.perturbation_i_m_s2
        } else {
            self.perturbation_i_m_s2
        };

        let mut derivative = Vector6::zeros();
        derivative.fixed_rows_mut::<3>(0).copy_from(&velocity);
        derivative.fixed_rows_mut::<3>(3).copy_from(&acceleration);
        derivative
    }
}

/// Adaptive orbit integration up to externally imposed time boundaries.
pub struct OrbitPropagator {
    integrator: EmbeddedRungeKutta<6, TwoBodyOde>,
    tolerance: f64,
    initial_step_s: f64,
    total_steps: u64,
}

impl OrbitPropagator {
    pub fn new(
        config: &IntegratorConfig,
        gravity_constant_m3_s2: f64,
        position_i_m: Vector3<f64>,
        velocity_i_m_s: Vector3<f64>,
    ) -> Result<Self, IntegratorError> {
        let limits = StepLimits::new(config.min_step_s, config.max_step_s)?;
        let initial_step_s = config.initial_step_s.clamp(limits.min_s, limits.max_s);
        let mut integrator =
            EmbeddedRungeKutta::new(config.scheme.tableau(), initial_step_s, TwoBodyOde::new(gravity_constant_m3_s2))?
                .with_limits(limits);
        integrator.set_state(0.0, state_vector(&position_i_m, &velocity_i_m_s));

        Ok(Self {
            integrator,
            tolerance: config.tolerance,
            initial_step_s,
            total_steps: 0,
        })
    }

    /// Integrate up to `target_s` under a constant perturbing acceleration.
    pub fn propagate_to(&mut self, target_s: f64, perturbation_i_m_s2: Vector3<f64>) -> Result<(), IntegratorError> {
        self.integrator.ode_mut().perturbation_i_m_s2 = perturbation_i_m_s2;
        self.total_steps += self.integrator.integrate_until(target_s, self.tolerance)?;
        Ok(())
    }

    /// Restart from a new state at time zero with the configured initial step.
    pub fn reset(&mut self, position_i_m: Vector3<f64>, velocity_i_m_s: Vector3<f64>) -> Result<(), IntegratorError> {
        self.integrator.set_step_width(self.initial_step_s)?;
        self.integrator.set_state(0.0, state_vector(&position_i_m, &velocity_i_m_s));
        self.total_steps = 0;
        Ok(())
    }

    pub fn position_i_m(&self) -> Vector3<f64> {
        self.integrator.state().fixed_rows::<3>(0).into_owned()
    }

    pub fn velocity_i_m_s(&self) -> Vector3<f64> {
        self.integrator.state().fixed_rows::<3>(3).into_owned()
    }

    pub fn current_time_s(&self) -> f64 {
        self.integrator.current_time_s()
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn integrator(&self) -> &EmbeddedRungeKutta<6, TwoBodyOde> {
        &self.integrator
    }
}

fn state_vector(position_i_m: &Vector3<f64>, velocity_i_m_s: &Vector3<f64>) -> SVector<f64, 6> {
    let mut state = Vector6::zeros();
    state.fixed_rows_mut::<3>(0).copy_from(position_i_m);
    state.fixed_rows_mut::<3>(3).copy_from(velocity_i_m_s);
    state
}

/// End-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub elapsed_s: f64,
    pub component_ticks: u64,
    pub orbit_steps: u64,
    pub attitude_steps: u64,
    pub final_step_width_s: f64,
    pub final_local_error: f64,
    pub position_i_m: [f64; 3],
    pub velocity_i_m_s: [f64; 3],
    /// `[x, y, z, w]`
    pub attitude_i2b: [f64; 4],
    pub angular_velocity_b_rad_s: [f64; 3],
    pub total_force_b_n: [f64; 3],
    pub total_torque_b_nm: [f64; 3],
    pub total_acceleration_i_m_s2: [f64; 3],
    /// Rows logged during this trial.
    pub log_rows: usize,
}

pub struct SimulationCase {
    config: SimulationConfig,
    time: SimulationTime,
    scheduler: Scheduler,
    structure: SpacecraftStructure,
    environment: LocalEnvironment,
    dynamics: SpacecraftDynamics,
    disturbances: Disturbances,
    attitude: AttitudePropagator,
    orbit: OrbitPropagator,
    logger: Logger,
}

impl SimulationCase {
    pub fn new(config: &SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let structure = SpacecraftStructure::from_config(&config.structure);
        let dynamics = initial_dynamics(config, &structure)?;
        let mut environment = LocalEnvironment::from_config(&config.environment);
        environment.update(&dynamics);

        let disturbances = Disturbances::from_config(
            &config.disturbances,
            &config.central_body,
            &structure,
            config.source_path.as_deref(),
        )?;

        let attitude = AttitudePropagator::new(
            &config.attitude.integrator,
            structure.inertia_tensor_b_kgm2,
            dynamics.attitude_i2b,
            dynamics.angular_velocity_b_rad_s,
        )?;
        let orbit = OrbitPropagator::new(
            &config.integrator,
            config.environment.central_body_gravity_constant_m3_s2,
            dynamics.position_i_m,
            dynamics.velocity_i_m_s,
        )?;

        let logging = &config.logging;
        let mut logger = match logging.directory.as_deref() {
            Some(directory) => Logger::with_directory(&logging.file_name, directory)?,
            None => Logger::in_memory(&logging.file_name),
        };
        logger.set_enabled(logging.enabled);
        logger.add_header(case_header());
        disturbances.log_setup(&mut logger);
        if logger.is_enabled() {
            logger.write_headers()?;
        }

        info!(
            central_body = %config.central_body,
            scheme = config.integrator.scheme.tableau().name,
            models = disturbances.model_names().len(),
            "Simulation case ready"
        );

        Ok(Self {
            config: config.clone(),
            time: SimulationTime::new(&config.time),
            scheduler: Scheduler::with_config(&config.scheduler),
            structure,
            environment,
            dynamics,
            disturbances,
            attitude,
            orbit,
            logger,
        })
    }

    /// Registration access for the setup phase; the first step seals it.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn disturbances(&self) -> &Disturbances {
        &self.disturbances
    }

    pub fn disturbances_mut(&mut self) -> &mut Disturbances {
        &mut self.disturbances
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn dynamics(&self) -> &SpacecraftDynamics {
        &self.dynamics
    }

    pub fn environment(&self) -> &LocalEnvironment {
        &self.environment
    }

    pub fn attitude(&self) -> &AttitudePropagator {
        &self.attitude
    }

    pub fn orbit(&self) -> &OrbitPropagator {
        &self.orbit
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn is_finished(&self) -> bool {
        self.time.is_finished()
    }

    /// Advance one base step.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        if !self.scheduler.is_sealed() {
            self.scheduler.begin_run();
        }

        self.time.update();
        self.scheduler.advance(&self.time);
        self.environment.update(&self.dynamics);
        self.disturbances.update(&self.environment, &self.dynamics, &self.time);

        // Forces are resolved with the attitude they were computed under
        let force_i_n = self.dynamics.attitude_i2b.inverse_transform_vector(&self.disturbances.total_force_b_n());

        if self.time.attitude_propagate_due() {
            self.attitude.propagate_to(self.time.elapsed_s(), self.disturbances.total_torque_b_nm())?;
            self.dynamics.attitude_i2b = self.attitude.attitude_i2b();
            self.dynamics.angular_velocity_b_rad_s = self.attitude.angular_velocity_b_rad_s();
        }

        if self.time.orbit_propagate_due() {
            let perturbation = self.disturbances.total_acceleration_i_m_s2() + force_i_n / self.structure.mass_kg;

            self.orbit.propagate_to(self.time.elapsed_s(), perturbation)?;
            self.dynamics.position_i_m = self.orbit.position_i_m();
            self.dynamics.velocity_i_m_s = self.orbit.velocity_i_m_s();
        }

        if self.time.log_output_due() && self.logger.is_enabled() {
            let row = self.log_row();
            self.logger.write_row(row)?;
        }

        Ok(())
    }

    /// Step until the end time and report.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        self.scheduler.begin_run();
        while !self.time.is_finished() {
            self.step()?;
        }
        let summary = self.summary();
        info!(
            steps = summary.steps,
            orbit_steps = summary.orbit_steps,
            component_ticks = summary.component_ticks,
            "Simulation case finished"
        );
        Ok(summary)
    }

    /// Restore the initial state for a fresh trial.
    ///
    /// The disturbance models are rebuilt so that no output of the previous
    /// trial leaks into the next one. Their enable flags, including changes
    /// made through [`SimulationCase::disturbances_mut`], carry over. The
    /// component registry is kept and the logger starts a new trial.
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        self.time.reset();
        self.scheduler.reset_counter();

        self.dynamics = initial_dynamics(&self.config, &self.structure)?;
        self.environment = LocalEnvironment::from_config(&self.config.environment);
        self.environment.update(&self.dynamics);

        let flags = self.disturbances.enable_flags();
        self.disturbances = Disturbances::from_config(
            &self.config.disturbances,
            &self.config.central_body,
            &self.structure,
            self.config.source_path.as_deref(),
        )?;
        self.disturbances.restore_enable_flags(&flags);

        self.attitude.reset(self.dynamics.attitude_i2b, self.dynamics.angular_velocity_b_rad_s)?;
        self.orbit.reset(self.dynamics.position_i_m, self.dynamics.velocity_i_m_s)?;
        self.logger.begin_trial()?;

        debug!(trial = self.logger.trial(), "Simulation case reset");
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        let integrator = self.orbit.integrator();
        RunSummary {
            steps: self.time.step_count(),
            elapsed_s: self.time.elapsed_s(),
            component_ticks: self.scheduler.tick_count(),
            orbit_steps: self.orbit.total_steps(),
            attitude_steps: self.attitude.total_steps(),
            final_step_width_s: integrator.step_width_s(),
            final_local_error: integrator.local_truncation_error(),
            position_i_m: self.dynamics.position_i_m.into(),
            velocity_i_m_s: self.dynamics.velocity_i_m_s.into(),
            attitude_i2b: self.dynamics.attitude_i2b.coords.into(),
            angular_velocity_b_rad_s: self.dynamics.angular_velocity_b_rad_s.into(),
            total_force_b_n: self.disturbances.total_force_b_n().into(),
            total_torque_b_nm: self.disturbances.total_torque_b_nm().into(),
            total_acceleration_i_m_s2: self.disturbances.total_acceleration_i_m_s2().into(),
            log_rows: self.logger.trial_rows().len(),
        }
    }

    fn log_row(&self) -> String {
        let mut row = scalar_value(self.time.elapsed_s());
        row.push_str(&vector_value(&self.dynamics.position_i_m));
        row.push_str(&vector_value(&self.dynamics.velocity_i_m_s));
        row.push_str(&quaternion_value(&self.dynamics.attitude_i2b));
        row.push_str(&vector_value(&self.dynamics.angular_velocity_b_rad_s));
        row.push_str(&vector_value(&self.disturbances.total_force_b_n()));
        row.push_str(&vector_value(&self.disturbances.total_torque_b_nm()));
        row.push_str(&vector_value(&self.disturbances.total_acceleration_i_m_s2()));
        for loggable in self.disturbances.loggables() {
            row.push_str(&loggable.log_value());
        }
        row
    }
}

fn case_header() -> String {
    [
        scalar_header("elapsed_time", "s"),
        vector_header("position", "i", "m"),
        vector_header("velocity", "i", "m/s"),
        ["x", "y", "z", "w"]
            .iter()
            .map(|axis| format!("quaternion_i2b_{axis}[-],"))
            .collect::<String>(),
        vector_header("angular_velocity", "b", "rad/s"),
        vector_header("total_force", "b", "N"),
        vector_header("total_torque", "b", "Nm"),
        vector_header("total_acceleration", "i", "m/s2"),
    ]
    .concat()
}

fn quaternion_value(quaternion: &UnitQuaternion<f64>) -> String {
    quaternion.coords.iter().map(|c| scalar_value(*c)).collect()
}

fn initial_dynamics(
    config: &SimulationConfig,
    structure: &SpacecraftStructure,
) -> Result<SpacecraftDynamics, AttitudeError> {
    let mut dynamics = SpacecraftDynamics::new(
        structure,
        Vector3::from(config.orbit.initial_position_i_m),
        Vector3::from(config.orbit.initial_velocity_i_m_s),
    );
    dynamics.attitude_i2b = config.attitude.initial_attitude_i2b()?;
    dynamics.angular_velocity_b_rad_s = Vector3::from(config.attitude.initial_angular_velocity_b_rad_s);
    Ok(dynamics)
}
