use serde::{Deserialize, Serialize};

/// Source of the per-step propagate/update flags consumed by the kernel.
pub trait TimeAuthority {
    fn attitude_propagate_due(&self) -> bool;
    fn orbit_propagate_due(&self) -> bool;
    fn component_update_due(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub step_s: f64,
    pub end_time_s: f64,
    pub attitude_update_interval_s: f64,
    pub orbit_update_interval_s: f64,
    pub component_update_interval_s: f64,
    pub log_output_interval_s: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            step_s: 0.1,
            end_time_s: 100.0,
            attitude_update_interval_s: 0.1,
            orbit_update_interval_s: 1.0,
            component_update_interval_s: 0.1,
            log_output_interval_s: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PropagateFlags {
    pub attitude: bool,
    pub orbit: bool,
    pub component: bool,
    pub log_output: bool,
}

/// Fixed-step simulation clock.
///
/// Every interval is rounded to a whole number of base steps so that the
/// flags of a run are a pure function of the step counter.
#[derive(Debug, Clone)]
pub struct SimulationTime {
    step_s: f64,
    end_time_s: f64,
    end_steps: u64,
    attitude_interval_steps: u64,
    orbit_interval_steps: u64,
    component_interval_steps: u64,
    log_interval_steps: u64,
    step_count: u64,
    elapsed_s: f64,
    flags: PropagateFlags,
}

impl SimulationTime {
    /// Build a clock from an already validated configuration.
    pub fn new(config: &TimeConfig) -> Self {
        let step_s = config.step_s;
        Self {
            step_s,
            end_time_s: config.end_time_s,
            end_steps: steps_until(config.end_time_s, step_s),
            attitude_interval_steps: interval_in_steps(config.attitude_update_interval_s, step_s),
            orbit_interval_steps: interval_in_steps(config.orbit_update_interval_s, step_s),
            component_interval_steps: interval_in_steps(config.component_update_interval_s, step_s),
            log_interval_steps: interval_in_steps(config.log_output_interval_s, step_s),
            step_count: 0,
            elapsed_s: 0.0,
            flags: PropagateFlags::default(),
        }
    }

    /// Advance one base step and recompute every flag.
    pub fn update(&mut self) {
        self.step_count += 1;
        // Multiplying instead of accumulating keeps elapsed time free of drift.
        self.elapsed_s = self.step_count as f64 * self.step_s;

        let n = self.step_count;
        self.flags = PropagateFlags {
            attitude: n % self.attitude_interval_steps == 0,
            orbit: n % self.orbit_interval_steps == 0,
            component: n % self.component_interval_steps == 0,
            log_output: n % self.log_interval_steps == 0,
        };
    }

    pub fn reset(&mut self) {
        self.step_count = 0;
        self.elapsed_s = 0.0;
        self.flags = PropagateFlags::default();
    }

    /// The end time is counted in whole base steps, like every interval.
    pub fn is_finished(&self) -> bool {
        self.step_count >= self.end_steps
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    pub fn step_s(&self) -> f64 {
        self.step_s
    }

    pub fn end_time_s(&self) -> f64 {
        self.end_time_s
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn end_steps(&self) -> u64 {
        self.end_steps
    }

    pub fn orbit_update_interval_s(&self) -> f64 {
        self.orbit_interval_steps as f64 * self.step_s
    }

    pub fn log_output_due(&self) -> bool {
        self.flags.log_output
    }

    pub fn flags(&self) -> PropagateFlags {
        self.flags
    }
}

impl TimeAuthority for SimulationTime {
    fn attitude_propagate_due(&self) -> bool {
        self.flags.attitude
    }

    fn orbit_propagate_due(&self) -> bool {
        self.flags.orbit
    }

    fn component_update_due(&self) -> bool {
        self.flags.component
    }
}

fn interval_in_steps(interval_s: f64, step_s: f64) -> u64 {
    let ratio = (interval_s / step_s).round();
    if ratio.is_finite() && ratio >= 1.0 {
        ratio as u64
    } else {
        1
    }
}

fn steps_until(end_time_s: f64, step_s: f64) -> u64 {
    let ratio = (end_time_s / step_s).round();
    if ratio.is_finite() && ratio > 0.0 {
        ratio as u64
    } else {
        0
    }
}
