//! Output monitor fixtures.

use std::sync::{Mutex, PoisonError};

use brine_core::{ReactionId, Time};
use brine_engine::{MonitorError, OutputMonitor};
use brine_space::Environment;

/// One callback received by a [`RecordingMonitor`].
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    Initialized { nodes: usize },
    StepDone { reaction: ReactionId, time: Time, step: u64 },
    Finished { time: Time, step: u64 },
}

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events so far.
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.lock().clone()
    }

    /// The `(reaction, time)` of every recorded step.
    pub fn trajectory(&self) -> Vec<(ReactionId, Time)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::StepDone { reaction, time, .. } => Some((*reaction, *time)),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MonitorEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: MonitorEvent) {
        self.lock().push(event);
    }
}

impl<T> OutputMonitor<T> for RecordingMonitor {
    fn initialized(&self, env: &Environment<T>) -> Result<(), MonitorError> {
        self.push(MonitorEvent::Initialized {
            nodes: env.node_count(),
        });
        Ok(())
    }

    fn step_done(
        &self,
        _env: &Environment<T>,
        reaction: ReactionId,
        time: Time,
        step: u64,
    ) -> Result<(), MonitorError> {
        self.push(MonitorEvent::StepDone {
            reaction,
            time,
            step,
        });
        Ok(())
    }

    fn finished(&self, _env: &Environment<T>, time: Time, step: u64) -> Result<(), MonitorError> {
        self.push(MonitorEvent::Finished { time, step });
        Ok(())
    }
}

/// Fails when step `fail_at_step` completes.
#[derive(Debug)]
pub struct FailingMonitor {
    pub fail_at_step: u64,
}

impl<T> OutputMonitor<T> for FailingMonitor {
    fn initialized(&self, _env: &Environment<T>) -> Result<(), MonitorError> {
        Ok(())
    }

    fn step_done(
        &self,
        _env: &Environment<T>,
        _reaction: ReactionId,
        _time: Time,
        step: u64,
    ) -> Result<(), MonitorError> {
        if step == self.fail_at_step {
            return Err(MonitorError::new(format!("injected failure at step {step}")));
        }
        Ok(())
    }

    fn finished(&self, _env: &Environment<T>, _time: Time, _step: u64) -> Result<(), MonitorError> {
        Ok(())
    }
}
