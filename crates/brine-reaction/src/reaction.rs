//! Reactions: guarded, timed bundles of actions.

use crate::action::Action;
use crate::condition::Condition;
use crate::context::ActionContext;
use crate::distribution::{Distribution, SimRng};
use brine_core::{Context, DependencySet, NodeId, ReactionError, Time};
use brine_space::Environment;
use std::fmt;

/// A reaction bound to one node.
///
/// Owns its conditions, actions, and time distribution. The dependency
/// sets and contexts are derived from the conditions and actions and
/// recomputed whenever either list is replaced:
///
/// - inbound: union of the conditions' inbound sets
/// - outbound: union of the actions' outbound sets
/// - input context: widest condition context, [`Context::Local`] if none
/// - output context: widest action context, [`Context::Local`] if none
///
/// # Updating
///
/// Rescheduling is split in two so a failing condition cannot leave the
/// engine half-updated: [`rate_hint`](Self::rate_hint) does every
/// fallible read, and [`apply_update`](Self::apply_update) feeds the
/// result to the distribution and cannot fail.
pub struct Reaction<T> {
    node: NodeId,
    conditions: Vec<Box<dyn Condition<T>>>,
    actions: Vec<Box<dyn Action<T>>>,
    distribution: Distribution<T>,
    inbound: DependencySet,
    outbound: DependencySet,
    input_context: Context,
    output_context: Context,
    executions: u64,
}

impl<T: 'static> Reaction<T> {
    /// A reaction with no conditions and no actions.
    pub fn new(node: NodeId, distribution: Distribution<T>) -> Self {
        Self {
            node,
            conditions: Vec::new(),
            actions: Vec::new(),
            distribution,
            inbound: DependencySet::empty(),
            outbound: DependencySet::empty(),
            input_context: Context::Local,
            output_context: Context::Local,
            executions: 0,
        }
    }

    /// Append a condition.
    pub fn with_condition(mut self, condition: impl Condition<T>) -> Self {
        self.conditions.push(Box::new(condition));
        self.derive_inputs();
        self
    }

    /// Append an action.
    pub fn with_action(mut self, action: impl Action<T>) -> Self {
        self.actions.push(Box::new(action));
        self.derive_outputs();
        self
    }

    /// Replace every condition.
    pub fn set_conditions(&mut self, conditions: Vec<Box<dyn Condition<T>>>) {
        self.conditions = conditions;
        self.derive_inputs();
    }

    /// Replace every action.
    pub fn set_actions(&mut self, actions: Vec<Box<dyn Action<T>>>) {
        self.actions = actions;
        self.derive_outputs();
    }

    fn derive_inputs(&mut self) {
        self.inbound = self
            .conditions
            .iter()
            .fold(DependencySet::empty(), |acc, c| acc.union(&c.inbound()));
        self.input_context = Context::widest(self.conditions.iter().map(|c| c.context()));
    }

    fn derive_outputs(&mut self) {
        self.outbound = self
            .actions
            .iter()
            .fold(DependencySet::empty(), |acc, a| acc.union(&a.outbound()));
        self.output_context = Context::widest(self.actions.iter().map(|a| a.context()));
    }

    // ── Accessors ───────────────────────────────────────────────

    /// The node this reaction is bound to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Conditions in declaration order.
    pub fn conditions(&self) -> &[Box<dyn Condition<T>>] {
        &self.conditions
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> &[Box<dyn Action<T>>] {
        &self.actions
    }

    /// Everything the conditions read.
    pub fn inbound(&self) -> &DependencySet {
        &self.inbound
    }

    /// Everything the actions may change.
    pub fn outbound(&self) -> &DependencySet {
        &self.outbound
    }

    /// Widest context among the conditions.
    pub fn input_context(&self) -> Context {
        self.input_context
    }

    /// Widest context among the actions.
    pub fn output_context(&self) -> Context {
        self.output_context
    }

    /// The time distribution.
    pub fn distribution(&self) -> &Distribution<T> {
        &self.distribution
    }

    /// Next scheduled firing time.
    pub fn tau(&self) -> Time {
        self.distribution.next_occurrence()
    }

    /// Nominal rate of the distribution.
    pub fn rate(&self) -> f64 {
        self.distribution.rate()
    }

    /// How many times this reaction has fired.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    // ── Firing ──────────────────────────────────────────────────

    /// `true` iff every condition is valid. Stops at the first invalid
    /// condition.
    pub fn can_execute(&self, env: &Environment<T>) -> Result<bool, ReactionError> {
        for condition in &self.conditions {
            if !condition.is_valid(env)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run every action once, in declaration order.
    pub fn execute(&mut self, ctx: &mut ActionContext<'_, T>) -> Result<(), ReactionError> {
        for action in &mut self.actions {
            action.execute(ctx)?;
        }
        self.executions += 1;
        Ok(())
    }

    // ── Rescheduling ────────────────────────────────────────────

    /// The current propensity: nominal rate times every condition's
    /// contribution. Zero as soon as any contribution is zero.
    pub fn rate_hint(&self, env: &Environment<T>) -> Result<f64, ReactionError> {
        let mut propensity = 1.0;
        for condition in &self.conditions {
            let p = condition.propensity_contribution(env)?;
            if !p.is_finite() || p < 0.0 {
                return Err(ReactionError::ConstraintViolation {
                    constraint: format!(
                        "propensity contribution must be finite and non-negative, got {p}"
                    ),
                });
            }
            propensity *= p;
            if propensity == 0.0 {
                return Ok(0.0);
            }
        }
        Ok(self.distribution.rate() * propensity)
    }

    /// Feed a precomputed rate hint to the distribution.
    pub fn apply_update(
        &mut self,
        now: Time,
        executed: bool,
        rate_hint: f64,
        env: &Environment<T>,
        rng: &mut SimRng,
    ) {
        self.distribution.update(now, executed, rate_hint, env, rng);
    }

    /// [`rate_hint`](Self::rate_hint) followed by
    /// [`apply_update`](Self::apply_update).
    pub fn update(
        &mut self,
        now: Time,
        executed: bool,
        env: &Environment<T>,
        rng: &mut SimRng,
    ) -> Result<(), ReactionError> {
        let hint = self.rate_hint(env)?;
        self.apply_update(now, executed, hint, env, rng);
        Ok(())
    }

    /// An independent deep copy bound to `node`, created at `now`, with a
    /// fresh execution count. See [`Distribution::clone_at`].
    pub fn clone_onto(&self, node: NodeId, now: Time, rng: &mut SimRng) -> Reaction<T> {
        let mut copy = Reaction::new(node, self.distribution.clone_at(now, rng));
        copy.set_conditions(self.conditions.iter().map(|c| c.clone_onto(node)).collect());
        copy.set_actions(self.actions.iter().map(|a| a.clone_onto(node)).collect());
        copy
    }
}

impl<T: 'static> fmt::Debug for Reaction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("node", &self.node)
            .field("conditions", &self.conditions.len())
            .field("actions", &self.actions.len())
            .field("inbound", &self.inbound)
            .field("outbound", &self.outbound)
            .field("input_context", &self.input_context)
            .field("output_context", &self.output_context)
            .field("distribution", &self.distribution)
            .field("executions", &self.executions)
            .finish()
    }
}
