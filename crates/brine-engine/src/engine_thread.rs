//! Engine thread loop and command channel draining.
//!
//! The engine thread owns the [`Engine`] exclusively (moved in at spawn).
//! Controllers talk to it through an unbounded crossbeam channel that is
//! drained between steps, and read its progress from [`Shared`] without
//! taking any lock the loop holds while stepping.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use brine_core::{StepError, Time};
use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, RunGoal, StepOutcome};
use crate::monitor::OutputMonitor;
use crate::status::{Status, StatusCell};

/// A request from a controller to the engine thread.
pub(crate) enum Command<T> {
    Play,
    Pause,
    GoTo(RunGoal),
    Terminate,
    AddMonitor(Weak<dyn OutputMonitor<T>>),
    RemoveMonitor(Weak<dyn OutputMonitor<T>>),
}

/// State published by the engine thread.
pub(crate) struct Shared {
    pub(crate) status: StatusCell,
    step: AtomicU64,
    time_bits: AtomicU64,
    error: Mutex<Option<StepError>>,
}

impl Shared {
    pub(crate) fn new(step: u64, time: Time) -> Self {
        Self {
            status: StatusCell::new(Status::Init),
            step: AtomicU64::new(step),
            time_bits: AtomicU64::new(time.as_f64().to_bits()),
            error: Mutex::new(None),
        }
    }

    pub(crate) fn step(&self) -> u64 {
        self.step.load(Ordering::Acquire)
    }

    pub(crate) fn time(&self) -> Time {
        Time::new(f64::from_bits(self.time_bits.load(Ordering::Acquire)))
    }

    pub(crate) fn error(&self) -> Option<StepError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish<T: 'static>(&self, engine: &Engine<T>) {
        self.step.store(engine.current_step(), Ordering::Release);
        self.time_bits
            .store(engine.time().as_f64().to_bits(), Ordering::Release);
    }

    pub(crate) fn record_error(&self, err: StepError) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

enum Progress {
    Stepped,
    GoalReached,
    Finished,
}

/// Run `f`, turning a panic into [`StepError::Panicked`].
pub(crate) fn guarded<R>(f: impl FnOnce() -> Result<R, StepError>) -> Result<R, StepError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(StepError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// State held by the engine thread's main loop.
pub(crate) struct EngineThreadState<T> {
    engine: Engine<T>,
    commands: Receiver<Command<T>>,
    shared: Arc<Shared>,
    goal: Option<RunGoal>,
}

impl<T: Clone + 'static> EngineThreadState<T> {
    pub(crate) fn new(
        engine: Engine<T>,
        commands: Receiver<Command<T>>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            engine,
            commands,
            shared,
            goal: None,
        }
    }

    /// Main loop. Runs until terminated, finished, failed, or every
    /// controller is gone.
    ///
    /// Consumes self and returns the engine so the controller can recover
    /// it via `JoinHandle<Engine<T>>`.
    pub(crate) fn run(mut self) -> Engine<T> {
        info!("engine thread started");

        if let Err(e) = guarded(|| self.engine.initialize()) {
            return self.shut_down(Some(e));
        }
        self.shared.publish(&self.engine);
        self.transition(Status::Ready);

        let mut failure = None;
        loop {
            let flow = if self.goal.is_some() {
                self.drain_commands()
            } else {
                match self.commands.recv() {
                    Ok(cmd) => self.apply(cmd),
                    Err(_) => Flow::Stop,
                }
            };
            if let Flow::Stop = flow {
                break;
            }
            let Some(goal) = self.goal else {
                continue;
            };
            match self.advance(goal) {
                Ok(Progress::Stepped) => {}
                Ok(Progress::GoalReached) => {
                    self.goal = None;
                    self.transition(Status::Paused);
                }
                Ok(Progress::Finished) => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.shut_down(failure)
    }

    fn advance(&mut self, goal: RunGoal) -> Result<Progress, StepError> {
        let engine = &mut self.engine;
        let progress = guarded(|| {
            if engine.goal_reached(goal)? {
                return Ok(Progress::GoalReached);
            }
            Ok(match engine.step()? {
                StepOutcome::Finished(reason) => {
                    debug!(?reason, "run complete");
                    Progress::Finished
                }
                StepOutcome::Fired { .. } | StepOutcome::Skipped { .. } => Progress::Stepped,
            })
        });
        self.shared.publish(&self.engine);
        progress
    }

    /// Apply every queued command without blocking.
    fn drain_commands(&mut self) -> Flow {
        loop {
            match self.commands.try_recv() {
                Ok(cmd) => {
                    if let Flow::Stop = self.apply(cmd) {
                        return Flow::Stop;
                    }
                }
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => return Flow::Stop,
            }
        }
    }

    fn apply(&mut self, cmd: Command<T>) -> Flow {
        match cmd {
            Command::Play => self.set_goal(RunGoal::Quiescence),
            Command::GoTo(goal) => self.set_goal(goal),
            Command::Pause => {
                if self.goal.take().is_some() {
                    self.transition(Status::Paused);
                } else {
                    debug!("pause ignored, not running");
                }
            }
            Command::Terminate => {
                debug!("terminate requested");
                return Flow::Stop;
            }
            Command::AddMonitor(monitor) => self.engine.add_output_monitor(monitor),
            Command::RemoveMonitor(monitor) => {
                self.engine.remove_output_monitor(&monitor);
            }
        }
        Flow::Continue
    }

    fn set_goal(&mut self, goal: RunGoal) {
        debug!(?goal, "run goal set");
        self.goal = Some(goal);
        self.transition(Status::Running);
    }

    fn transition(&self, next: Status) {
        match self.shared.status.transition(next) {
            Ok(prev) if prev != next => debug!(from = %prev, to = %next, "status changed"),
            Ok(_) => {}
            Err(current) => warn!(from = %current, to = %next, "illegal status transition ignored"),
        }
    }

    fn shut_down(mut self, failure: Option<StepError>) -> Engine<T> {
        if let Some(e) = &failure {
            error!(error = %e, step = self.engine.current_step(), "simulation failed");
            self.shared.record_error(e.clone());
        }
        if let Err(e) = guarded(|| self.engine.finish()) {
            error!(error = %e, "output monitor failed during finish");
            self.shared.record_error(e);
        }
        self.shared.publish(&self.engine);
        self.transition(Status::Terminated);
        info!(
            step = self.engine.current_step(),
            time = %self.engine.time(),
            "engine thread stopped"
        );
        self.engine
    }
}
