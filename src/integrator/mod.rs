//! Adaptive embedded Runge-Kutta integration.
//!
//! [`EmbeddedRungeKutta`] advances an `N`-dimensional state by one step per
//! call to [`EmbeddedRungeKutta::integrate`]. Every call commits the
//! higher-order estimate; the difference between the two embedded estimates
//! is kept as the local truncation error and only informs the next call to
//! [`EmbeddedRungeKutta::control_step_width`]. There is no step rejection.

pub mod tableau;

pub use tableau::{ButcherTableau, Scheme, BOGACKI_SHAMPINE_32, DORMAND_PRINCE_5, RUNGE_KUTTA_FEHLBERG_45};

use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default step limits, relative to the initial step width.
const MIN_STEP_RATIO: f64 = 1e-6;
const MAX_STEP_RATIO: f64 = 1e3;

/// Remaining time below which an integration target counts as reached.
pub const TIME_EPSILON_S: f64 = 1e-9;

/// Right-hand side of `dx/dt = f(t, x)`.
pub trait Ode<const N: usize> {
    fn derivative(&self, time: f64, state: &SVector<f64, N>) -> SVector<f64, N>;
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IntegratorError {
    #[error("malformed coefficient table `{name}`: {reason}")]
    MalformedTableau { name: &'static str, reason: &'static str },
    #[error("step width must be positive and finite, got {0}")]
    InvalidStepWidth(f64),
    #[error("invalid step limits: min {min_s}, max {max_s}")]
    InvalidStepLimits { min_s: f64, max_s: f64 },
}

/// Bounds applied by step-width control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepLimits {
    pub min_s: f64,
    pub max_s: f64,
}

impl StepLimits {
    pub fn new(min_s: f64, max_s: f64) -> Result<Self, IntegratorError> {
        let valid = min_s.is_finite() && max_s.is_finite() && min_s > 0.0 && max_s >= min_s;
        if !valid {
            return Err(IntegratorError::InvalidStepLimits { min_s, max_s });
        }
        Ok(Self { min_s, max_s })
    }

    pub fn relative_to(step_width_s: f64) -> Self {
        Self {
            min_s: step_width_s * MIN_STEP_RATIO,
            max_s: step_width_s * MAX_STEP_RATIO,
        }
    }
}

pub struct EmbeddedRungeKutta<const N: usize, F> {
    tableau: &'static ButcherTableau,
    ode: F,
    limits: StepLimits,

    step_width_s: f64,
    current_time_s: f64,
    current_state: SVector<f64, N>,
    previous_time_s: f64,
    previous_state: SVector<f64, N>,
    previous_slope: SVector<f64, N>,
    slopes: Vec<SVector<f64, N>>,
    local_truncation_error: f64,
    step_count: u64,
}

impl<const N: usize, F: Ode<N>> EmbeddedRungeKutta<N, F> {
    pub fn new(tableau: &'static ButcherTableau, step_width_s: f64, ode: F) -> Result<Self, IntegratorError> {
        tableau.validate()?;
        check_step_width(step_width_s)?;

        Ok(Self {
            tableau,
            ode,
            limits: StepLimits::relative_to(step_width_s),
            step_width_s,
            current_time_s: 0.0,
            current_state: SVector::zeros(),
            previous_time_s: 0.0,
            previous_state: SVector::zeros(),
            previous_slope: SVector::zeros(),
            slopes: vec![SVector::zeros(); tableau.stages()],
            local_truncation_error: 0.0,
            step_count: 0,
        })
    }

    pub fn with_limits(mut self, limits: StepLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Restart from `state` at `time_s`. The step width is kept.
    pub fn set_state(&mut self, time_s: f64, state: SVector<f64, N>) {
        self.current_time_s = time_s;
        self.current_state = state;
        self.previous_time_s = time_s;
        self.previous_state = state;
        self.previous_slope = SVector::zeros();
        self.local_truncation_error = 0.0;
        self.step_count = 0;
    }

    pub fn set_step_width(&mut self, step_width_s: f64) -> Result<(), IntegratorError> {
        check_step_width(step_width_s)?;
        self.step_width_s = step_width_s;
        Ok(())
    }

    /// Advance one step and commit the higher-order estimate.
    pub fn integrate(&mut self) {
        self.calc_slopes();

        let h = self.step_width_s;
        let mut lower = self.current_state;
        let mut higher = self.current_state;
        for (i, slope) in self.slopes.iter().enumerate() {
            lower += slope * (self.tableau.weights[i] * h);
            higher += slope * (self.tableau.higher_order_weights[i] * h);
        }

        self.local_truncation_error = (lower - higher).norm();

        self.previous_time_s = self.current_time_s;
        self.previous_state = self.current_state;
        self.previous_slope = self.slopes[0];

        self.current_state = higher;
        self.current_time_s += h;
        self.step_count += 1;
    }

    /// Rescale the step width towards `tolerance` and return the new width.
    ///
    /// The raw update is `h * (tolerance / error)^(1 / (order + 1))`, clamped
    /// into the step limits. A zero error therefore selects the maximum step.
    /// A negative or non-finite tolerance, or an undefined update, leaves the
    /// step width unchanged.
    pub fn control_step_width(&mut self, tolerance: f64) -> f64 {
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            warn!(
                step_width_s = self.step_width_s,
                tolerance,
                "Invalid tolerance; keeping current step width"
            );
            return self.step_width_s;
        }

        let exponent = 1.0 / f64::from(self.tableau.order + 1);
        let updated = self.step_width_s * (tolerance / self.local_truncation_error).powf(exponent);

        if updated.is_nan() {
            warn!(
                step_width_s = self.step_width_s,
                local_error = self.local_truncation_error,
                tolerance,
                "Step width update undefined; keeping current step width"
            );
            return self.step_width_s;
        }

        if updated < self.limits.min_s {
            warn!(
                step_width_s = self.step_width_s,
                local_error = self.local_truncation_error,
                tolerance,
                min_s = self.limits.min_s,
                "Step width clamped to minimum; tolerance cannot be met"
            );
        } else if updated > self.limits.max_s {
            debug!(max_s = self.limits.max_s, "Step width clamped to maximum");
        }

        self.step_width_s = updated.clamp(self.limits.min_s, self.limits.max_s);
        self.step_width_s
    }

    /// Step with width control until `target_s`, returning the steps taken.
    ///
    /// The last step is shortened to land on the target exactly; the
    /// controlled step width is restored afterwards so the shortened step
    /// does not shrink the first step towards the next target.
    pub fn integrate_until(&mut self, target_s: f64, tolerance: f64) -> Result<u64, IntegratorError> {
        let mut steps = 0;
        loop {
            let remaining_s = target_s - self.current_time_s;
            if remaining_s <= TIME_EPSILON_S {
                break;
            }

            let controlled_s = self.step_width_s;
            if remaining_s < controlled_s {
                self.set_step_width(remaining_s)?;
                self.integrate();
                self.set_step_width(controlled_s)?;
            } else {
                self.integrate();
                self.control_step_width(tolerance);
            }
            steps += 1;
        }
        Ok(steps)
    }

    /// Dense output over the last step, `sigma` in `[0, 1]`.
    ///
    /// Uses cubic Hermite interpolation between the previous and current
    /// states. Before the first step this returns the current state.
    pub fn interpolate(&self, sigma: f64) -> SVector<f64, N> {
        if self.step_count == 0 {
            return self.current_state;
        }

        let s = sigma.clamp(0.0, 1.0);
        let h = self.current_time_s - self.previous_time_s;
        let end_slope = self.ode.derivative(self.current_time_s, &self.current_state);

        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        self.previous_state * h00 + self.previous_slope * (h10 * h) + self.current_state * h01 + end_slope * (h11 * h)
    }

    pub fn state(&self) -> &SVector<f64, N> {
        &self.current_state
    }

    pub fn current_time_s(&self) -> f64 {
        self.current_time_s
    }

    pub fn step_width_s(&self) -> f64 {
        self.step_width_s
    }

    pub fn local_truncation_error(&self) -> f64 {
        self.local_truncation_error
    }

    pub fn order(&self) -> u32 {
        self.tableau.order
    }

    pub fn tableau(&self) -> &'static ButcherTableau {
        self.tableau
    }

    pub fn limits(&self) -> StepLimits {
        self.limits
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn ode(&self) -> &F {
        &self.ode
    }

    pub fn ode_mut(&mut self) -> &mut F {
        &mut self.ode
    }

    fn calc_slopes(&mut self) {
        let h = self.step_width_s;
        let t = self.current_time_s;

        for i in 0..self.slopes.len() {
            let mut stage_state = self.current_state;
            for (j, a) in self.tableau.matrix[i].iter().enumerate() {
                stage_state += self.slopes[j] * (a * h);
            }
            self.slopes[i] = self.ode.derivative(t + self.tableau.nodes[i] * h, &stage_state);
        }
    }
}

fn check_step_width(step_width_s: f64) -> Result<(), IntegratorError> {
    if step_width_s.is_finite() && step_width_s > 0.0 {
        Ok(())
    } else {
        Err(IntegratorError::InvalidStepWidth(step_width_s))
    }
}
