//! # Spacecraft Digital Twin Kernel
//!
//! The deterministic, time-stepped core of a spacecraft simulation: a
//! multi-rate component scheduler, a disturbance aggregator and an adaptive
//! embedded Runge-Kutta integrator, driven together by a fixed-step clock.
//!
//! ## Features
//!
//! - **Multi-rate scheduling**: non-owning component registry with prescalers and fast sub-steps
//! - **Disturbance aggregation**: ordered sums of body-frame force/torque and inertial acceleration
//! - **Adaptive integration**: Dormand-Prince, Fehlberg and Bogacki-Shampine embedded pairs
//! - **Rigid-body attitude**: Euler's equations driven by the aggregated disturbance torque
//! - **Deterministic runs**: identical inputs give bit-identical totals and trajectories
//! - **Bounded registries**: fixed-capacity storage for components and disturbance models
//!
//! ## Quick Start
//!
//! ```rust
//! use spacetwin::{SimulationCase, SimulationConfig};
//!
//! let mut config = SimulationConfig::default();
//! config.time.end_time_s = 5.0;
//!
//! let mut case = SimulationCase::new(&config).unwrap();
//! let summary = case.run().unwrap();
//! assert_eq!(summary.steps, 50);
//! ```
//!
//! ## Architecture
//!
//! - [`time`] - Fixed-step clock and propagate flags
//! - [`scheduler`] - Component registry and tick dispatch
//! - [`component`] - Prescaled, power-gated component wrapper
//! - [`disturbances`] - Disturbance models and their aggregator
//! - [`integrator`] - Embedded Runge-Kutta pairs and step control
//! - [`attitude`] - Quaternion and angular velocity propagation
//! - [`environment`] - Environment and dynamics snapshots
//! - [`logger`] - CSV log layout
//! - [`config`] - JSON configuration
//! - [`simulation`] - One simulation case wiring everything together

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]

pub mod attitude;
pub mod component;
pub mod config;
pub mod disturbances;
pub mod environment;
pub mod integrator;
pub mod logger;
pub mod scheduler;
pub mod simulation;
pub mod time;

// Re-export main public types for convenience
pub use attitude::{AttitudeError, AttitudePropagator};
pub use component::{Component, ComponentRoutine, PowerPort};
pub use config::{ConfigError, SimulationConfig};
pub use disturbances::{AccelerationModel, Disturbance, Disturbances, ForceTorqueModel};
pub use integrator::{EmbeddedRungeKutta, IntegratorError, Ode, Scheme, StepLimits};
pub use logger::{LogSink, Loggable, Logger};
pub use scheduler::{RegistryError, Scheduler, Tickable};
pub use simulation::{RunSummary, SimulationCase, SimulationError};
pub use time::{SimulationTime, TimeAuthority};
