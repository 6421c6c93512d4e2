//! Simulation status and the condition-variable cell that publishes it.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Lifecycle state of a [`Simulation`](crate::Simulation).
///
/// ```text
/// Init ──► Ready ──► Running ◄──► Paused
///   │        │          │           │
///   └────────┴──────────┴───────────┴──► Terminated
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Built, engine thread not yet initialised.
    Init,
    /// Initialised and waiting for a command.
    Ready,
    /// Firing reactions.
    Running,
    /// Stopped between steps, resumable.
    Paused,
    /// Finished, normally or with an error. Final.
    Terminated,
}

impl Status {
    /// Whether the FSM allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        match (self, next) {
            (_, Terminated) => self != Terminated,
            (Init, Ready) => true,
            (Ready | Paused, Running) => true,
            (Running, Paused) => true,
            _ => false,
        }
    }

    /// `true` for [`Status::Terminated`].
    pub fn is_terminal(self) -> bool {
        self == Status::Terminated
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// A [`Status`] shared between the engine thread and controllers.
///
/// Writers notify every waiter on change. Lock poisoning is ignored: the
/// guarded value is a plain `Copy` enum and is always consistent.
#[derive(Debug)]
pub(crate) struct StatusCell {
    status: Mutex<Status>,
    changed: Condvar,
}

impl StatusCell {
    pub(crate) fn new(status: Status) -> Self {
        Self {
            status: Mutex::new(status),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self) -> Status {
        *self.lock()
    }

    /// Move to `next` if the FSM allows it. Returns the previous status
    /// on success.
    pub(crate) fn transition(&self, next: Status) -> Result<Status, Status> {
        let mut guard = self.lock();
        let prev = *guard;
        if prev == next {
            return Ok(prev);
        }
        if !prev.can_transition_to(next) {
            return Err(prev);
        }
        *guard = next;
        drop(guard);
        self.changed.notify_all();
        Ok(prev)
    }

    /// Block until the status is `target` or terminal, or `timeout`
    /// elapses. Returns the status observed last.
    pub(crate) fn wait_for(&self, target: Status, timeout: Duration) -> Status {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.lock();
        loop {
            if *guard == target || guard.is_terminal() {
                return *guard;
            }
            guard = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return *guard;
                    }
                    self.changed
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .changed
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fsm_edges() {
        use Status::*;
        assert!(Init.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Running));
        assert!(Running.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Running));
        assert!(Init.can_transition_to(Terminated));
        assert!(!Init.can_transition_to(Paused));
        assert!(!Init.can_transition_to(Running));
        assert!(!Terminated.can_transition_to(Running));
        assert!(!Terminated.can_transition_to(Terminated));
        assert!(!Ready.can_transition_to(Paused));
    }

    #[test]
    fn transition_rejects_illegal_edge() {
        let cell = StatusCell::new(Status::Init);
        assert_eq!(cell.transition(Status::Paused), Err(Status::Init));
        assert_eq!(cell.transition(Status::Ready), Ok(Status::Init));
        assert_eq!(cell.get(), Status::Ready);
    }

    #[test]
    fn wait_for_times_out_with_current_status() {
        let cell = StatusCell::new(Status::Ready);
        let seen = cell.wait_for(Status::Paused, Duration::from_millis(10));
        assert_eq!(seen, Status::Ready);
    }

    #[test]
    fn wait_for_wakes_on_change() {
        let cell = Arc::new(StatusCell::new(Status::Ready));
        let writer = Arc::clone(&cell);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.transition(Status::Running).unwrap();
        });
        let seen = cell.wait_for(Status::Running, Duration::from_secs(5));
        assert_eq!(seen, Status::Running);
        handle.join().unwrap();
    }

    #[test]
    fn wait_for_returns_early_on_termination() {
        let cell = StatusCell::new(Status::Terminated);
        let seen = cell.wait_for(Status::Paused, Duration::from_secs(5));
        assert_eq!(seen, Status::Terminated);
    }
}
