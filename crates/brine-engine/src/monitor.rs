//! Output monitors: observers notified by the engine.

use brine_core::{ReactionId, Time};
use brine_space::Environment;
use std::fmt;
use std::sync::{Arc, Weak};

/// Failure reported by an [`OutputMonitor`]. Terminates the simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorError {
    reason: String,
}

impl MonitorError {
    /// Create an error with a description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The description.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for MonitorError {}

/// Observer of a running simulation.
///
/// Called on the engine thread, between steps: once after
/// initialisation, once per completed step, and once when the
/// simulation ends, normally or with an error. Monitors must not block
/// waiting for the simulation they observe.
///
/// The engine holds monitors weakly; dropping the last `Arc` to a
/// monitor unregisters it.
pub trait OutputMonitor<T>: Send + Sync {
    /// The engine finished initialising.
    fn initialized(&self, env: &Environment<T>) -> Result<(), MonitorError>;

    /// `reaction` fired at `time`, completing step number `step`.
    fn step_done(
        &self,
        env: &Environment<T>,
        reaction: ReactionId,
        time: Time,
        step: u64,
    ) -> Result<(), MonitorError>;

    /// The simulation ended at `time` after `step` steps.
    fn finished(&self, env: &Environment<T>, time: Time, step: u64) -> Result<(), MonitorError>;
}

/// Weakly held monitors in registration order.
pub(crate) struct MonitorRegistry<T> {
    monitors: Vec<Weak<dyn OutputMonitor<T>>>,
}

impl<T> Default for MonitorRegistry<T> {
    fn default() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }
}

impl<T> MonitorRegistry<T> {
    pub(crate) fn add(&mut self, monitor: Weak<dyn OutputMonitor<T>>) {
        if !self.monitors.iter().any(|m| m.ptr_eq(&monitor)) {
            self.monitors.push(monitor);
        }
    }

    pub(crate) fn remove(&mut self, monitor: &Weak<dyn OutputMonitor<T>>) -> bool {
        let before = self.monitors.len();
        self.monitors.retain(|m| !m.ptr_eq(monitor));
        self.monitors.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.monitors.iter().filter(|m| m.strong_count() > 0).count()
    }

    /// Call `f` on every live monitor, pruning dropped ones. Stops at
    /// the first error.
    pub(crate) fn notify(
        &mut self,
        mut f: impl FnMut(&dyn OutputMonitor<T>) -> Result<(), MonitorError>,
    ) -> Result<(), MonitorError> {
        self.monitors.retain(|m| m.strong_count() > 0);
        let live: Vec<Arc<dyn OutputMonitor<T>>> =
            self.monitors.iter().filter_map(Weak::upgrade).collect();
        for monitor in live {
            f(monitor.as_ref())?;
        }
        Ok(())
    }
}
