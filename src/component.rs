use crate::scheduler::Tickable;
use serde::{Deserialize, Serialize};

/// On/off switch feeding a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerPort {
    is_on: bool,
}

impl PowerPort {
    pub fn new(is_on: bool) -> Self {
        Self { is_on }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn set_on(&mut self, is_on: bool) {
        self.is_on = is_on;
    }
}

impl Default for PowerPort {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Behaviour of a concrete component emulation.
pub trait ComponentRoutine {
    fn main_routine(&mut self, count: u64);

    fn fast_update(&mut self) {}

    fn power_off_routine(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescalerConfig {
    pub prescaler: u32,
    pub fast_prescaler: u32,
}

impl Default for PrescalerConfig {
    fn default() -> Self {
        Self { prescaler: 1, fast_prescaler: 1 }
    }
}

/// Wraps a routine with its own cadence: it executes on every `prescaler`-th
/// base tick and every `fast_prescaler`-th fast tick.
#[derive(Debug)]
pub struct Component<R> {
    routine: R,
    prescaler: u32,
    fast_prescaler: u32,
    power_port: PowerPort,
    needs_fast_update: bool,
}

impl<R: ComponentRoutine> Component<R> {
    pub fn new(routine: R, prescaler: u32) -> Self {
        Self::with_prescalers(routine, &PrescalerConfig { prescaler, fast_prescaler: 1 })
    }

    pub fn with_prescalers(routine: R, config: &PrescalerConfig) -> Self {
        Self {
            routine,
            prescaler: config.prescaler.max(1),
            fast_prescaler: config.fast_prescaler.max(1),
            power_port: PowerPort::default(),
            needs_fast_update: false,
        }
    }

    pub fn routine(&self) -> &R {
        &self.routine
    }

    pub fn routine_mut(&mut self) -> &mut R {
        &mut self.routine
    }

    pub fn power_port(&self) -> &PowerPort {
        &self.power_port
    }

    pub fn power_port_mut(&mut self) -> &mut PowerPort {
        &mut self.power_port
    }

    pub fn prescaler(&self) -> u32 {
        self.prescaler
    }

    pub fn fast_prescaler(&self) -> u32 {
        self.fast_prescaler
    }
}

impl<R: ComponentRoutine> Tickable for Component<R> {
    fn tick(&mut self, count: u64) {
        if count % u64::from(self.prescaler) != 0 {
            return;
        }
        if self.power_port.is_on() {
            self.routine.main_routine(count);
        } else {
            self.routine.power_off_routine();
        }
    }

    fn fast_tick(&mut self, fast_count: u64) {
        if fast_count % u64::from(self.fast_prescaler) != 0 {
            return;
        }
        if self.power_port.is_on() {
            self.routine.fast_update();
        } else {
            self.routine.power_off_routine();
        }
    }

    fn needs_fast_update(&self) -> bool {
        self.needs_fast_update
    }

    fn set_needs_fast_update(&mut self, needs_fast_update: bool) {
        self.needs_fast_update = needs_fast_update;
    }
}
