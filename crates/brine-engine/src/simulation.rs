//! User-facing [`Simulation`] controller.
//!
//! ```text
//! Controller thread(s)                     Engine thread ("brine-engine")
//!     |                                          |
//!     |--play / pause / go_to_* / terminate----->| drain commands
//!     |   [commands: unbounded]                  | engine.step()
//!     |                                          | publish step, time
//!     |<--status (Mutex + Condvar)---------------| status transitions
//!     |<--step / time (atomics)------------------|
//!     |                                          |
//!     |--join()--------------------------------->| JoinHandle<Engine<T>>
//! ```
//!
//! The engine thread is spawned lazily by the first command that needs
//! it, so a fresh simulation stays in [`Status::Init`] and can still be
//! configured directly.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use brine_core::{StepError, Time};
use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::engine::{Engine, RunGoal};
use crate::engine_thread::{guarded, Command, EngineThreadState, Shared};
use crate::monitor::OutputMonitor;
use crate::status::Status;

// ── Error types ──────────────────────────────────────────────────

/// Errors from the simulation control surface.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlError {
    /// The command is not allowed in the current status.
    IllegalTransition {
        /// Status when the command was issued.
        from: Status,
        /// The rejected command.
        command: &'static str,
    },
    /// The engine thread has exited and cannot take commands.
    EngineGone,
    /// The engine thread could not be spawned.
    SpawnFailed {
        /// The OS error.
        reason: String,
    },
    /// The engine could not be recovered from its thread.
    EngineRecoveryFailed,
    /// The simulation terminated with an execution error.
    Failed(StepError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalTransition { from, command } => {
                write!(f, "cannot {command} a simulation in status {from}")
            }
            Self::EngineGone => write!(f, "engine thread has shut down"),
            Self::SpawnFailed { reason } => {
                write!(f, "failed to spawn engine thread: {reason}")
            }
            Self::EngineRecoveryFailed => write!(f, "engine could not be recovered"),
            Self::Failed(e) => write!(f, "simulation failed: {e}"),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

// ── Launch state ─────────────────────────────────────────────────

enum Launch<T> {
    /// Not spawned yet; the engine is still held here.
    Pending(Engine<T>, crossbeam_channel::Receiver<Command<T>>),
    Running(JoinHandle<Engine<T>>),
    /// Joined, or the spawn failed.
    Done,
}

// ── Simulation ───────────────────────────────────────────────────

/// A simulation driven by a dedicated engine thread.
///
/// Every method takes `&self`, so a `Simulation` can be shared across
/// controller threads behind an `Arc`. Dropping it terminates the
/// engine thread and joins it.
///
/// # Examples
///
/// ```
/// use brine_core::Time;
/// use brine_engine::{Engine, EngineConfig, Simulation, Status};
/// use brine_reaction::{Distribution, Reaction};
/// use brine_space::{Environment, NoLinks};
///
/// let mut env: Environment<f64> = Environment::new(1, NoLinks);
/// let node = env.add_node([0.0].into()).unwrap();
/// let mut engine = Engine::new(env, EngineConfig::default()).unwrap();
/// engine
///     .add_reaction(Reaction::new(node, Distribution::trigger(Time::ZERO).unwrap()))
///     .unwrap();
///
/// let sim = Simulation::new(engine);
/// assert_eq!(sim.status(), Status::Init);
/// sim.run().unwrap();
/// assert_eq!(sim.status(), Status::Terminated);
/// assert_eq!(sim.step(), 1);
/// ```
pub struct Simulation<T> {
    shared: Arc<Shared>,
    commands: Sender<Command<T>>,
    launch: Mutex<Launch<T>>,
}

impl<T: Clone + Send + 'static> Simulation<T> {
    /// Wrap an engine. No thread is spawned until the first command that
    /// advances the simulation.
    pub fn new(engine: Engine<T>) -> Self {
        let shared = Arc::new(Shared::new(engine.current_step(), engine.time()));
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            shared,
            commands: tx,
            launch: Mutex::new(Launch::Pending(engine, rx)),
        }
    }

    fn launch(&self) -> MutexGuard<'_, Launch<T>> {
        self.launch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the engine thread if it is not running yet.
    fn ensure_started(&self) -> Result<(), ControlError> {
        let mut launch = self.launch();
        match std::mem::replace(&mut *launch, Launch::Done) {
            Launch::Pending(engine, rx) => {
                let shared = Arc::clone(&self.shared);
                let spawned = thread::Builder::new()
                    .name("brine-engine".into())
                    .spawn(move || EngineThreadState::new(engine, rx, shared).run());
                match spawned {
                    Ok(handle) => {
                        *launch = Launch::Running(handle);
                        Ok(())
                    }
                    Err(e) => {
                        let _ = self.shared.status.transition(Status::Terminated);
                        Err(ControlError::SpawnFailed {
                            reason: e.to_string(),
                        })
                    }
                }
            }
            running @ Launch::Running(_) => {
                *launch = running;
                Ok(())
            }
            Launch::Done => Err(ControlError::EngineGone),
        }
    }

    fn send(&self, cmd: Command<T>) -> Result<(), ControlError> {
        self.commands.send(cmd).map_err(|_| ControlError::EngineGone)
    }

    fn reject_if(&self, command: &'static str, rejected: &[Status]) -> Result<(), ControlError> {
        let from = self.status();
        if rejected.contains(&from) {
            warn!(command, status = %from, "control command rejected");
            return Err(ControlError::IllegalTransition { from, command });
        }
        Ok(())
    }

    fn start_with(&self, command: &'static str, cmd: Command<T>) -> Result<(), ControlError> {
        self.reject_if(command, &[Status::Terminated])?;
        self.ensure_started()?;
        debug!(command, "control command sent");
        self.send(cmd)
    }

    /// Run until quiescence or a configured end condition.
    pub fn play(&self) -> Result<(), ControlError> {
        self.start_with("play", Command::Play)
    }

    /// Stop advancing after the current step.
    ///
    /// Once the engine thread is launched the request is queued even if
    /// the thread has not published [`Status::Ready`] yet.
    pub fn pause(&self) -> Result<(), ControlError> {
        self.reject_if("pause", &[Status::Terminated])?;
        let launch = self.launch();
        match &*launch {
            Launch::Running(_) => self.send(Command::Pause),
            Launch::Pending(..) | Launch::Done => {
                let from = self.status();
                warn!(command = "pause", status = %from, "control command rejected");
                Err(ControlError::IllegalTransition {
                    from,
                    command: "pause",
                })
            }
        }
    }

    /// Play, then block until the simulation terminates.
    ///
    /// Returns [`ControlError::Failed`] if it terminated with an error.
    pub fn run(&self) -> Result<(), ControlError> {
        self.play()?;
        self.wait_for(Status::Terminated, Duration::MAX);
        match self.error() {
            Some(e) => Err(ControlError::Failed(e)),
            None => Ok(()),
        }
    }

    /// Advance until `step` steps have completed, then pause.
    pub fn go_to_step(&self, step: u64) -> Result<(), ControlError> {
        self.start_with("go_to_step", Command::GoTo(RunGoal::Step(step)))
    }

    /// Advance until the next firing would happen after `time`, then
    /// pause.
    pub fn go_to_time(&self, time: Time) -> Result<(), ControlError> {
        self.start_with("go_to_time", Command::GoTo(RunGoal::Time(time)))
    }

    /// Ask the engine thread to stop. Idempotent.
    ///
    /// A simulation that never started moves straight to
    /// [`Status::Terminated`] without initialising; its monitors still
    /// receive `finished`.
    pub fn terminate(&self) {
        let mut launch = self.launch();
        match &mut *launch {
            Launch::Pending(engine, _) => {
                if let Err(e) = guarded(|| engine.finish()) {
                    warn!(error = %e, "output monitor failed during finish");
                    self.shared.record_error(e);
                }
                let _ = self.shared.status.transition(Status::Terminated);
            }
            Launch::Running(_) => {
                // The thread may already be gone.
                let _ = self.commands.send(Command::Terminate);
            }
            Launch::Done => {}
        }
    }

    /// Register a monitor. The simulation holds it weakly.
    pub fn add_output_monitor<M>(&self, monitor: &Arc<M>) -> Result<(), ControlError>
    where
        M: OutputMonitor<T> + 'static,
    {
        let weak = Arc::downgrade(monitor);
        let weak: Weak<dyn OutputMonitor<T>> = weak;
        let mut launch = self.launch();
        match &mut *launch {
            Launch::Pending(engine, _) => {
                engine.add_output_monitor(weak);
                Ok(())
            }
            Launch::Running(_) => self.send(Command::AddMonitor(weak)),
            Launch::Done => Err(ControlError::EngineGone),
        }
    }

    /// Unregister a monitor.
    pub fn remove_output_monitor<M>(&self, monitor: &Arc<M>) -> Result<(), ControlError>
    where
        M: OutputMonitor<T> + 'static,
    {
        let weak = Arc::downgrade(monitor);
        let weak: Weak<dyn OutputMonitor<T>> = weak;
        let mut launch = self.launch();
        match &mut *launch {
            Launch::Pending(engine, _) => {
                engine.remove_output_monitor(&weak);
                Ok(())
            }
            Launch::Running(_) => self.send(Command::RemoveMonitor(weak)),
            Launch::Done => Err(ControlError::EngineGone),
        }
    }

    /// Terminate, wait for the engine thread, and take the engine back.
    pub fn join(mut self) -> Result<Engine<T>, ControlError> {
        self.terminate();
        let launch = std::mem::replace(
            self.launch.get_mut().unwrap_or_else(PoisonError::into_inner),
            Launch::Done,
        );
        match launch {
            Launch::Pending(engine, _) => Ok(engine),
            Launch::Running(handle) => handle
                .join()
                .map_err(|_| ControlError::EngineRecoveryFailed),
            Launch::Done => Err(ControlError::EngineRecoveryFailed),
        }
    }
}

impl<T> Simulation<T> {
    /// Current status.
    pub fn status(&self) -> Status {
        self.shared.status.get()
    }

    /// Steps completed so far.
    pub fn step(&self) -> u64 {
        self.shared.step()
    }

    /// Current simulated time.
    pub fn time(&self) -> Time {
        self.shared.time()
    }

    /// The error that terminated the simulation, if any.
    pub fn error(&self) -> Option<StepError> {
        self.shared.error()
    }

    /// Block until the status is `target` or terminal, or `timeout`
    /// elapses. Returns the status actually observed.
    pub fn wait_for(&self, target: Status, timeout: Duration) -> Status {
        self.shared.status.wait_for(target, timeout)
    }
}

impl<T> Drop for Simulation<T> {
    fn drop(&mut self) {
        let launch = std::mem::replace(
            self.launch.get_mut().unwrap_or_else(PoisonError::into_inner),
            Launch::Done,
        );
        if let Launch::Running(handle) = launch {
            let _ = self.commands.send(Command::Terminate);
            let _ = handle.join();
        }
    }
}

impl<T: 'static> fmt::Debug for Simulation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("status", &self.status())
            .field("step", &self.step())
            .field("time", &self.time())
            .finish_non_exhaustive()
    }
}
