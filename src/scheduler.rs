use crate::time::TimeAuthority;
use heapless::Vec;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use thiserror::Error;
use tracing::{debug, warn};

pub const MAX_COMPONENTS: usize = 64;

/// A component driven by the scheduler's base and fast cadences.
pub trait Tickable {
    fn tick(&mut self, count: u64);
    fn fast_tick(&mut self, fast_count: u64);
    fn needs_fast_update(&self) -> bool;
    fn set_needs_fast_update(&mut self, needs_fast_update: bool);
}

pub type SharedTickable = Rc<RefCell<dyn Tickable>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("component is already registered")]
    Duplicate,
    #[error("registry is sealed; components can only be registered during setup")]
    Sealed,
    #[error("component registry is full")]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub fast_steps_per_tick: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { fast_steps_per_tick: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SchedulerStats {
    pub registered: u8,
    pub ticks_delivered: u64,
    pub fast_ticks_delivered: u64,
    pub dropped_pruned: u32,
    pub skipped_busy: u32,
}

/// Multi-rate clock that fans ticks out to registered components.
///
/// The registry keeps non-owning references: the simulation assembly owns the
/// components and a component that has been dropped is skipped and pruned on
/// the next dispatch. Dispatch order is registration order.
pub struct Scheduler {
    components: Vec<Weak<RefCell<dyn Tickable>>, MAX_COMPONENTS>,
    tick_count: u64,
    fast_steps_per_tick: u32,
    sealed: bool,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(&SchedulerConfig::default())
    }

    pub fn with_config(config: &SchedulerConfig) -> Self {
        Self {
            components: Vec::new(),
            tick_count: 0,
            fast_steps_per_tick: config.fast_steps_per_tick.max(1),
            sealed: false,
            stats: SchedulerStats::default(),
        }
    }

    /// Append a component to the dispatch order.
    ///
    /// Duplicates are rejected rather than ticked twice.
    pub fn register_component<T>(&mut self, component: &Rc<RefCell<T>>) -> Result<(), RegistryError>
    where
        T: Tickable + 'static,
    {
        let shared: SharedTickable = component.clone();
        self.register_shared(&shared)
    }

    pub fn register_shared(&mut self, component: &SharedTickable) -> Result<(), RegistryError> {
        if self.sealed {
            warn!("Rejected component registration after run start");
            return Err(RegistryError::Sealed);
        }

        let candidate = Rc::downgrade(component);
        if self.components.iter().any(|c| c.ptr_eq(&candidate)) {
            warn!("Rejected duplicate component registration");
            return Err(RegistryError::Duplicate);
        }

        self.components.push(candidate).map_err(|_| {
            warn!("Component registry full at {} entries", MAX_COMPONENTS);
            RegistryError::Full
        })?;
        self.stats.registered = self.components.len() as u8;
        Ok(())
    }

    /// Remove the first entry referring to `component`. No-op if absent.
    pub fn remove_component<T>(&mut self, component: &Rc<RefCell<T>>) -> bool
    where
        T: Tickable + 'static,
    {
        let shared: SharedTickable = component.clone();
        self.remove_shared(&shared)
    }

    pub fn remove_shared(&mut self, component: &SharedTickable) -> bool {
        let target = Rc::downgrade(component);
        let Some(index) = self.components.iter().position(|c| c.ptr_eq(&target)) else {
            return false;
        };

        // heapless::Vec::remove shifts, preserving the order of the rest
        self.components.remove(index);
        self.stats.registered = self.components.len() as u8;
        true
    }

    /// Close the setup phase. Later registrations are rejected.
    pub fn begin_run(&mut self) {
        self.sealed = true;
        debug!("Scheduler sealed with {} components", self.components.len());
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Tick every component once, then run the fast sub-steps of those that asked for them.
    ///
    /// A component whose cell is already borrowed misses this tick.
    pub fn dispatch(&mut self) {
        let count = self.tick_count;
        let fast_steps = u64::from(self.fast_steps_per_tick);
        let mut dropped = false;

        for entry in &self.components {
            let Some(component) = entry.upgrade() else {
                dropped = true;
                continue;
            };
            let Ok(mut component) = component.try_borrow_mut() else {
                warn!("Component already borrowed; skipping tick {}", count);
                self.stats.skipped_busy += 1;
                continue;
            };

            component.tick(count);
            self.stats.ticks_delivered += 1;

            if component.needs_fast_update() {
                for sub_step in 0..fast_steps {
                    component.fast_tick(count * fast_steps + sub_step);
                    self.stats.fast_ticks_delivered += 1;
                }
            }
        }

        if dropped {
            self.prune_dropped();
        }

        self.tick_count += 1;
    }

    /// Dispatch if the time authority reports a component update boundary.
    pub fn advance(&mut self, time: &impl TimeAuthority) {
        if time.component_update_due() {
            self.dispatch();
        }
    }

    /// Restart the tick count, e.g. between Monte Carlo trials.
    pub fn reset_counter(&mut self) {
        self.tick_count = 0;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn fast_steps_per_tick(&self) -> u32 {
        self.fast_steps_per_tick
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get_stats(&self) -> &SchedulerStats {
        &self.stats
    }

    fn prune_dropped(&mut self) {
        let before = self.components.len();
        self.components.retain(|c| c.strong_count() > 0);
        let pruned = before - self.components.len();

        debug!("Pruned {} dropped components", pruned);
        self.stats.dropped_pruned += pruned as u32;
        self.stats.registered = self.components.len() as u8;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
