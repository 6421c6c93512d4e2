//! The scheduler: Gibson–Bruck next-reaction method over an indexed heap.
//!
//! [`Engine`] owns the environment, every reaction, the queue, the
//! dependency index, and the RNG. Each [`step()`](Engine::step) fires the
//! reaction with the smallest firing time, then recomputes the firing
//! time of exactly the reactions that firing can affect.
//!
//! # Failure
//!
//! Rescheduling is two-phase: every fallible rate read happens before any
//! queue key moves. A failing condition or action therefore leaves every
//! queued firing time as it was.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Weak;
use std::time::Instant;

use brine_core::{
    ConstructionError, Context, NodeId, Position, ReactionError, ReactionId, StepError, Time,
};
use brine_reaction::{construction_error, ActionContext, Reaction, SimRng, StructuralChange};
use brine_space::{Environment, EnvironmentError, Node};
use indexmap::IndexMap;
use rand::SeedableRng;
use tracing::{debug, info, trace};

use crate::config::{ConfigError, EngineConfig};
use crate::dependency_graph::{movement_reach, DependencyIndex, Scope};
use crate::metrics::{EngineMetrics, StepMetrics};
use crate::monitor::{MonitorError, MonitorRegistry, OutputMonitor};
use crate::queue::ReactionQueue;

// Compile-time assertion: an engine can move onto its own thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Engine<f64>>();
    }
};

// ── Outcomes ────────────────────────────────────────────────────

/// Why an engine stopped for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// Nothing is scheduled at a finite time.
    Quiescent,
    /// The next firing is after the configured end time.
    EndTime,
    /// The configured number of steps has completed.
    EndStep,
}

/// Result of a single [`Engine::step`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    /// A reaction fired.
    Fired {
        /// The reaction.
        reaction: ReactionId,
        /// When it fired.
        time: Time,
        /// Number of the completed step, starting at 1.
        step: u64,
    },
    /// The next reaction's guard was false. Time advanced to its firing
    /// time and it was rescheduled, but nothing ran.
    Skipped {
        /// The reaction.
        reaction: ReactionId,
        /// Its firing time.
        time: Time,
    },
    /// Nothing fired; the engine is done.
    Finished(FinishReason),
}

/// Target for [`Engine::run_until`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunGoal {
    /// Until this many steps have completed.
    Step(u64),
    /// Until every reaction scheduled at or before this time has fired.
    Time(Time),
    /// Until the engine finishes.
    Quiescence,
}

/// Result of [`Engine::run_until`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The goal was reached; the engine can continue.
    GoalReached,
    /// The engine finished before or at the goal.
    Finished(FinishReason),
}

// ── Engine ──────────────────────────────────────────────────────

/// A single-threaded next-reaction scheduler.
///
/// Generic over the concentration type `T`. Reactions are added with
/// [`add_reaction`](Self::add_reaction) and live in an arena keyed by
/// [`ReactionId`]; nodes refer to them by id.
///
/// ```
/// use brine_engine::{Engine, EngineConfig, RunGoal, RunOutcome, FinishReason};
/// use brine_reaction::{Distribution, Reaction};
/// use brine_space::{Environment, NoLinks};
/// use brine_core::{Position, Time};
///
/// let mut env: Environment<f64> = Environment::new(2, NoLinks);
/// let node = env.add_node(Position::from([0.0, 0.0])).unwrap();
/// let mut engine = Engine::new(env, EngineConfig::with_seed(42)).unwrap();
/// let id = engine
///     .add_reaction(Reaction::new(node, Distribution::trigger(Time::new(1.0)).unwrap()))
///     .unwrap();
///
/// let outcome = engine.run_until(RunGoal::Quiescence).unwrap();
/// assert_eq!(outcome, RunOutcome::Finished(FinishReason::Quiescent));
/// assert_eq!(engine.current_step(), 1);
/// assert_eq!(engine.reaction(id).unwrap().executions(), 1);
/// ```
pub struct Engine<T> {
    env: Environment<T>,
    reactions: IndexMap<ReactionId, Reaction<T>>,
    queue: ReactionQueue,
    index: DependencyIndex,
    pending: BTreeSet<ReactionId>,
    monitors: MonitorRegistry<T>,
    rng: SimRng,
    config: EngineConfig,
    step: u64,
    next_reaction_id: u64,
    initialized: bool,
    finished: bool,
    metrics: EngineMetrics,
}

impl<T: 'static> Engine<T> {
    /// Create an engine over `env`.
    ///
    /// Validates `config` and seeds the RNG from `config.seed`.
    pub fn new(env: Environment<T>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            env,
            reactions: IndexMap::new(),
            queue: ReactionQueue::new(),
            index: DependencyIndex::new(),
            pending: BTreeSet::new(),
            monitors: MonitorRegistry::default(),
            rng: SimRng::seed_from_u64(config.seed),
            config,
            step: 0,
            next_reaction_id: 0,
            initialized: false,
            finished: false,
            metrics: EngineMetrics::default(),
        })
    }

    // ── Accessors ───────────────────────────────────────────────

    /// The environment.
    pub fn environment(&self) -> &Environment<T> {
        &self.env
    }

    /// Mutable access to the environment, for building a model.
    ///
    /// Changes made here are not tracked as dependencies; add reactions
    /// after the environment is populated.
    pub fn environment_mut(&mut self) -> &mut Environment<T> {
        &mut self.env
    }

    /// The simulation RNG, for building stochastic pieces.
    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    /// Environment and RNG together, as an
    /// [`Incarnation`](brine_reaction::Incarnation) needs them.
    pub fn parts_mut(&mut self) -> (&mut Environment<T>, &mut SimRng) {
        (&mut self.env, &mut self.rng)
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of completed steps.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    /// Current simulated time.
    pub fn time(&self) -> Time {
        self.env.time()
    }

    /// Cumulative metrics.
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// `true` once [`finish`](Self::finish) has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// A reaction by id.
    pub fn reaction(&self, id: ReactionId) -> Option<&Reaction<T>> {
        self.reactions.get(&id)
    }

    /// Ids of live reactions in creation order.
    pub fn reaction_ids(&self) -> impl Iterator<Item = ReactionId> + '_ {
        self.reactions.keys().copied()
    }

    /// Number of live reactions.
    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    /// The queued firing time of a reaction.
    pub fn tau_of(&self, id: ReactionId) -> Option<Time> {
        self.queue.tau_of(id)
    }

    /// The reaction that would fire next, and when.
    ///
    /// Reactions added since the last step have not been refreshed yet,
    /// so their queued time is the one their distribution was built with.
    pub fn peek_next(&self) -> Option<(ReactionId, Time)> {
        self.queue.peek()
    }

    // ── Monitors ────────────────────────────────────────────────

    /// Register a monitor. Held weakly.
    pub fn add_output_monitor(&mut self, monitor: Weak<dyn OutputMonitor<T>>) {
        self.monitors.add(monitor);
    }

    /// Unregister a monitor. Returns `true` if it was registered.
    pub fn remove_output_monitor(&mut self, monitor: &Weak<dyn OutputMonitor<T>>) -> bool {
        self.monitors.remove(monitor)
    }

    /// Number of registered monitors still alive.
    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    // ── Structure ───────────────────────────────────────────────

    /// Schedule a reaction on its node.
    ///
    /// The reaction's firing time is refreshed against the current state
    /// before the next firing is chosen.
    pub fn add_reaction(&mut self, reaction: Reaction<T>) -> Result<ReactionId, ConstructionError> {
        let node = reaction.node();
        let host = self
            .env
            .node_mut(node)
            .ok_or(ConstructionError::UnknownNode { node })?;
        let id = ReactionId(self.next_reaction_id);
        self.next_reaction_id += 1;
        host.add_reaction(id);
        self.index.insert(id, reaction.inbound());
        self.queue.schedule(id, reaction.tau());
        self.reactions.insert(id, reaction);
        self.pending.insert(id);
        debug!(reaction = %id, node = %node, "reaction added");
        Ok(id)
    }

    /// Unschedule a reaction and detach it from its node.
    pub fn remove_reaction(&mut self, id: ReactionId) -> Option<Reaction<T>> {
        let reaction = self.reactions.shift_remove(&id)?;
        self.queue.remove(id);
        self.index.remove(id, reaction.inbound());
        self.pending.remove(&id);
        if let Some(node) = self.env.node_mut(reaction.node()) {
            node.remove_reaction(id);
        }
        debug!(reaction = %id, "reaction removed");
        Some(reaction)
    }

    /// Remove a node and every reaction bound to it.
    pub fn remove_node(&mut self, node: NodeId) -> Result<Node<T>, EnvironmentError> {
        let bound = self
            .env
            .node(node)
            .ok_or(EnvironmentError::UnknownNode { node })?
            .reactions()
            .to_vec();
        for id in bound {
            self.remove_reaction(id);
        }
        self.env.remove_node(node)
    }

    // ── Rescheduling ────────────────────────────────────────────

    /// Phase one: read every target's rate hint. Nothing moves.
    fn rate_hints(
        &self,
        targets: &BTreeSet<ReactionId>,
    ) -> Result<Vec<(ReactionId, f64)>, StepError> {
        let mut hints = Vec::with_capacity(targets.len().max(self.config.max_dependents_hint));
        for &id in targets {
            if let Some(reaction) = self.reactions.get(&id) {
                let hint = reaction
                    .rate_hint(&self.env)
                    .map_err(|reason| StepError::ConditionFailed { reaction: id, reason })?;
                hints.push((id, hint));
            }
        }
        Ok(hints)
    }

    /// Phase two: feed the hints to the distributions and move the queue
    /// keys. Infallible.
    fn apply_hints(&mut self, hints: Vec<(ReactionId, f64)>, fired: Option<ReactionId>) {
        let now = self.env.time();
        for (id, hint) in hints {
            if let Some(reaction) = self.reactions.get_mut(&id) {
                reaction.apply_update(now, fired == Some(id), hint, &self.env, &mut self.rng);
                self.queue.schedule(id, reaction.tau());
            }
        }
    }

    /// Refresh reactions added since the last step.
    fn flush_pending(&mut self) -> Result<(), StepError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let hints = self.rate_hints(&self.pending)?;
        self.pending.clear();
        self.apply_hints(hints, None);
        Ok(())
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Refresh every reaction and notify monitors. Idempotent; called by
    /// the first [`step`](Self::step) if not called before.
    pub fn initialize(&mut self) -> Result<(), StepError> {
        if self.initialized {
            return Ok(());
        }
        // Construction-time changes are covered by the full refresh.
        self.env.take_changes();
        self.flush_pending()?;
        let env = &self.env;
        self.monitors
            .notify(|m| m.initialized(env))
            .map_err(monitor_failed)?;
        self.initialized = true;
        info!(
            nodes = self.env.node_count(),
            reactions = self.reactions.len(),
            seed = self.config.seed,
            "engine initialized"
        );
        Ok(())
    }

    /// Notify monitors that the run is over. Idempotent.
    pub fn finish(&mut self) -> Result<(), StepError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let (time, step) = (self.env.time(), self.step);
        let env = &self.env;
        info!(step, time = %time, "engine finished");
        self.monitors
            .notify(|m| m.finished(env, time, step))
            .map_err(monitor_failed)
    }

    /// The next firing, after initialising and refreshing any reaction
    /// added since the last step.
    pub fn next_event(&mut self) -> Result<Option<(ReactionId, Time)>, StepError> {
        self.initialize()?;
        self.flush_pending()?;
        Ok(self.queue.peek())
    }
}

impl<T: Clone + 'static> Engine<T> {
    /// Copy a node, its concentrations, and every reaction bound to it.
    ///
    /// Each copied reaction gets an independent distribution restarted
    /// at the current time. On failure the copy is removed again.
    pub fn clone_node(
        &mut self,
        source: NodeId,
        position: Option<Position>,
    ) -> Result<NodeId, ConstructionError> {
        let bound = self
            .env
            .node(source)
            .ok_or(ConstructionError::UnknownNode { node: source })?
            .reactions()
            .to_vec();
        let copy = self
            .env
            .clone_node(source, position)
            .map_err(construction_error)?;
        let now = self.env.time();
        let mut cloned = Vec::with_capacity(bound.len());
        for id in bound {
            if let Some(reaction) = self.reactions.get(&id) {
                cloned.push(reaction.clone_onto(copy, now, &mut self.rng));
            }
        }
        for reaction in cloned {
            if let Err(e) = self.add_reaction(reaction) {
                let _ = self.remove_node(copy);
                return Err(e);
            }
        }
        Ok(copy)
    }

    /// Fire the next reaction.
    ///
    /// Returns [`StepOutcome::Finished`] without firing when nothing is
    /// scheduled at a finite time, when the next firing is past the end
    /// time, or when the end step has been reached.
    pub fn step(&mut self) -> Result<StepOutcome, StepError> {
        let started = Instant::now();
        let Some((id, tau)) = self.next_event()? else {
            return Ok(StepOutcome::Finished(FinishReason::Quiescent));
        };
        if !tau.is_finite() {
            return Ok(StepOutcome::Finished(FinishReason::Quiescent));
        }
        if self.config.end_step.is_some_and(|end| self.step >= end) {
            return Ok(StepOutcome::Finished(FinishReason::EndStep));
        }
        if self.config.end_time.is_some_and(|end| tau > end) {
            return Ok(StepOutcome::Finished(FinishReason::EndTime));
        }
        let now = self.env.time();
        if tau < now {
            return Err(StepError::TimeReversal {
                reaction: id,
                tau,
                now,
            });
        }

        let reaction = self
            .reactions
            .get(&id)
            .ok_or(StepError::UnknownReaction { reaction: id })?;
        let node = reaction.node();
        let output_context = reaction.output_context();
        let outbound = reaction.outbound().clone();
        let valid = reaction
            .can_execute(&self.env)
            .map_err(|reason| StepError::ConditionFailed { reaction: id, reason })?;

        if !valid {
            self.env.set_time(tau);
            let hints = match self.rate_hints(&BTreeSet::from([id])) {
                Ok(hints) => hints,
                Err(e) => {
                    self.env.set_time(now);
                    return Err(e);
                }
            };
            self.apply_hints(hints, Some(id));
            self.metrics.record(StepMetrics {
                total_us: started.elapsed().as_micros() as u64,
                refreshed: 1,
                structural_changes: 0,
                skipped: true,
            });
            trace!(reaction = %id, tau = %tau, "guard false, skipped");
            return Ok(StepOutcome::Skipped {
                reaction: id,
                time: tau,
            });
        }

        // 1. Execute.
        let before = self.env.neighbors(node).to_vec();
        self.env.set_time(tau);
        let mut changes = Vec::new();
        if let Some(reaction) = self.reactions.get_mut(&id) {
            let mut ctx =
                ActionContext::new(&mut self.env, &mut self.rng, &mut changes, id, node, tau);
            if let Err(reason) = reaction.execute(&mut ctx) {
                self.env.set_time(now);
                return Err(StepError::ActionFailed { reaction: id, reason });
            }
        }

        // 2. Structural changes.
        let structural_changes = changes.len();
        self.apply_changes(id, changes)?;
        let journal = self.env.take_changes();

        // 3. Collect dependents.
        let mut targets = BTreeSet::new();
        let scope = Scope::new(node, output_context, &before, &self.env);
        for candidate in self.index.candidates(&outbound) {
            if let Some(r) = self.reactions.get(&candidate) {
                if scope.admits(r.node(), r.input_context()) {
                    targets.insert(candidate);
                }
            }
        }
        if !journal.moved.is_empty() {
            let reach = movement_reach(
                journal.moved.iter().copied(),
                journal.neighborhood_changed.iter().copied(),
                &self.env,
            );
            for candidate in self.index.movement_readers() {
                if let Some(r) = self.reactions.get(&candidate) {
                    if r.input_context() == Context::Global || reach.contains(&r.node()) {
                        targets.insert(candidate);
                    }
                }
            }
        }
        for changed in &journal.neighborhood_changed {
            let Some(host) = self.env.node(*changed) else {
                continue;
            };
            for rid in host.reactions() {
                if self
                    .reactions
                    .get(rid)
                    .is_some_and(|r| r.input_context() == Context::Neighborhood)
                {
                    targets.insert(*rid);
                }
            }
        }
        if self.reactions.contains_key(&id) {
            targets.insert(id);
        }
        targets.extend(self.pending.iter().copied());

        // 4. Reschedule, two-phase.
        let hints = self.rate_hints(&targets)?;
        self.pending.clear();
        self.apply_hints(hints, Some(id));

        // 5. Notify.
        self.step += 1;
        let step = self.step;
        let env = &self.env;
        self.monitors
            .notify(|m| m.step_done(env, id, tau, step))
            .map_err(monitor_failed)?;

        self.metrics.record(StepMetrics {
            total_us: started.elapsed().as_micros() as u64,
            refreshed: targets.len(),
            structural_changes,
            skipped: false,
        });
        trace!(reaction = %id, tau = %tau, step, refreshed = targets.len(), "fired");
        Ok(StepOutcome::Fired {
            reaction: id,
            time: tau,
            step,
        })
    }

    /// `true` if `goal` holds and the next step would overshoot it.
    pub fn goal_reached(&mut self, goal: RunGoal) -> Result<bool, StepError> {
        Ok(match goal {
            RunGoal::Step(n) => self.step >= n,
            RunGoal::Time(t) => self
                .next_event()?
                .is_some_and(|(_, tau)| tau.is_finite() && tau > t),
            RunGoal::Quiescence => false,
        })
    }

    /// Step until `goal` is reached or the engine finishes.
    ///
    /// Does not call [`finish`](Self::finish).
    pub fn run_until(&mut self, goal: RunGoal) -> Result<RunOutcome, StepError> {
        loop {
            if self.goal_reached(goal)? {
                return Ok(RunOutcome::GoalReached);
            }
            if let StepOutcome::Finished(reason) = self.step()? {
                return Ok(RunOutcome::Finished(reason));
            }
        }
    }

    fn apply_changes(
        &mut self,
        fired: ReactionId,
        changes: Vec<StructuralChange<T>>,
    ) -> Result<(), StepError> {
        let env_error = |e: EnvironmentError| match e {
            EnvironmentError::UnknownNode { node } => StepError::UnknownNode { node },
            other => StepError::ActionFailed {
                reaction: fired,
                reason: ReactionError::ConstraintViolation {
                    constraint: other.to_string(),
                },
            },
        };
        let construction_failed = |e: ConstructionError| match e {
            ConstructionError::UnknownNode { node } => StepError::UnknownNode { node },
            other => StepError::ActionFailed {
                reaction: fired,
                reason: ReactionError::ExecutionFailed {
                    reason: other.to_string(),
                },
            },
        };
        for change in changes {
            match change {
                StructuralChange::AddReaction(reaction) => {
                    self.add_reaction(reaction).map_err(construction_failed)?;
                }
                StructuralChange::RemoveReaction(id) => {
                    self.remove_reaction(id)
                        .ok_or(StepError::UnknownReaction { reaction: id })?;
                }
                StructuralChange::RemoveNode(node) => {
                    self.remove_node(node).map_err(env_error)?;
                }
                StructuralChange::CloneNode { source, position } => {
                    self.clone_node(source, position)
                        .map_err(construction_failed)?;
                }
            }
        }
        Ok(())
    }
}

fn monitor_failed(e: MonitorError) -> StepError {
    StepError::MonitorFailed {
        reason: e.reason().to_owned(),
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("time", &self.env.time())
            .field("step", &self.step)
            .field("nodes", &self.env.node_count())
            .field("reactions", &self.reactions.len())
            .field("next", &self.queue.peek())
            .finish()
    }
}
