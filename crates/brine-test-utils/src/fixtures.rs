//! Reusable condition, action, and distribution fixtures.
//!
//! - [`AlwaysTrue`]: a guard that never blocks
//! - [`MoleculeAtLeast`]: mass-action guard, propensity = concentration
//! - [`FailingCondition`]: errors while a shared switch is on
//! - [`ChangeConcentration`]: adds a constant to one molecule
//! - [`TransferToNeighbor`]: moves one unit to a random neighbour
//! - [`FailingAction`]: fails after N successful executions
//! - [`MoveNodeAction`], [`RemoveNodeAction`], [`CloneNodeAction`]:
//!   structural changes
//! - [`CountingDistribution`]: a periodic distribution that counts updates

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use brine_core::{
    Context, Dependency, DependencySet, Molecule, NodeId, Position, ReactionError, Time,
};
use brine_reaction::{
    Action, ActionContext, Condition, SimRng, StructuralChange, TimeDistribution,
};
use brine_space::Environment;
use rand::Rng;

fn reads(molecule: &Molecule) -> DependencySet {
    [Dependency::Molecule(molecule.clone())].into_iter().collect()
}

fn concentration(
    env: &Environment<f64>,
    node: NodeId,
    molecule: &Molecule,
) -> Result<f64, ReactionError> {
    if !env.contains_node(node) {
        return Err(ReactionError::MissingNode { node });
    }
    Ok(env.concentration(node, molecule).copied().unwrap_or(0.0))
}

fn add(
    env: &mut Environment<f64>,
    node: NodeId,
    molecule: &Molecule,
    delta: f64,
) -> Result<(), ReactionError> {
    let current = concentration(env, node, molecule)?;
    env.set_concentration(node, molecule.clone(), current + delta)
        .map_err(|_| ReactionError::MissingNode { node })?;
    Ok(())
}

// ── Conditions ──────────────────────────────────────────────────

/// Always valid, reads nothing.
#[derive(Clone, Debug)]
pub struct AlwaysTrue {
    pub node: NodeId,
}

impl Condition<f64> for AlwaysTrue {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn inbound(&self) -> DependencySet {
        DependencySet::empty()
    }

    fn is_valid(&self, _env: &Environment<f64>) -> Result<bool, ReactionError> {
        Ok(true)
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Condition<f64>> {
        Box::new(Self { node })
    }
}

/// Valid while the local concentration of `molecule` is at least
/// `threshold`. Contributes the concentration itself to the propensity.
#[derive(Clone, Debug)]
pub struct MoleculeAtLeast {
    pub node: NodeId,
    pub molecule: Molecule,
    pub threshold: f64,
}

impl MoleculeAtLeast {
    pub fn new(node: NodeId, molecule: impl Into<Molecule>, threshold: f64) -> Self {
        Self {
            node,
            molecule: molecule.into(),
            threshold,
        }
    }
}

impl Condition<f64> for MoleculeAtLeast {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn inbound(&self) -> DependencySet {
        reads(&self.molecule)
    }

    fn is_valid(&self, env: &Environment<f64>) -> Result<bool, ReactionError> {
        Ok(concentration(env, self.node, &self.molecule)? >= self.threshold)
    }

    fn propensity_contribution(&self, env: &Environment<f64>) -> Result<f64, ReactionError> {
        let c = concentration(env, self.node, &self.molecule)?;
        Ok(if c >= self.threshold { c.max(0.0) } else { 0.0 })
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Condition<f64>> {
        Box::new(Self {
            node,
            ..self.clone()
        })
    }
}

/// Fails with [`ReactionError::ExecutionFailed`] while `fail` is set,
/// otherwise valid. Reads `molecule` so it is refreshed when it changes.
#[derive(Clone, Debug)]
pub struct FailingCondition {
    pub node: NodeId,
    pub molecule: Molecule,
    pub fail: Arc<AtomicBool>,
}

impl FailingCondition {
    pub fn new(node: NodeId, molecule: impl Into<Molecule>) -> (Self, Arc<AtomicBool>) {
        let fail = Arc::new(AtomicBool::new(false));
        let cond = Self {
            node,
            molecule: molecule.into(),
            fail: Arc::clone(&fail),
        };
        (cond, fail)
    }
}

impl Condition<f64> for FailingCondition {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn inbound(&self) -> DependencySet {
        reads(&self.molecule)
    }

    fn is_valid(&self, _env: &Environment<f64>) -> Result<bool, ReactionError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReactionError::ExecutionFailed {
                reason: "injected condition failure".into(),
            });
        }
        Ok(true)
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Condition<f64>> {
        Box::new(Self {
            node,
            ..self.clone()
        })
    }
}

// ── Actions ─────────────────────────────────────────────────────

/// Adds `delta` to the local concentration of `molecule`.
#[derive(Clone, Debug)]
pub struct ChangeConcentration {
    pub node: NodeId,
    pub molecule: Molecule,
    pub delta: f64,
}

impl ChangeConcentration {
    pub fn new(node: NodeId, molecule: impl Into<Molecule>, delta: f64) -> Self {
        Self {
            node,
            molecule: molecule.into(),
            delta,
        }
    }
}

impl Action<f64> for ChangeConcentration {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn outbound(&self) -> DependencySet {
        reads(&self.molecule)
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
        add(ctx.env_mut(), self.node, &self.molecule, self.delta)
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
        Box::new(Self {
            node,
            ..self.clone()
        })
    }
}

/// Moves one unit of `molecule` to a uniformly chosen neighbour.
/// Does nothing on an isolated node.
#[derive(Clone, Debug)]
pub struct TransferToNeighbor {
    pub node: NodeId,
    pub molecule: Molecule,
}

impl TransferToNeighbor {
    pub fn new(node: NodeId, molecule: impl Into<Molecule>) -> Self {
        Self {
            node,
            molecule: molecule.into(),
        }
    }
}

impl Action<f64> for TransferToNeighbor {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Neighborhood
    }

    fn outbound(&self) -> DependencySet {
        reads(&self.molecule)
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
        let neighbors = ctx.env().neighbors(self.node).to_vec();
        if neighbors.is_empty() {
            return Ok(());
        }
        let target = neighbors[ctx.rng().random_range(0..neighbors.len())];
        let env = ctx.env_mut();
        add(env, self.node, &self.molecule, -1.0)?;
        add(env, target, &self.molecule, 1.0)
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
        Box::new(Self {
            node,
            ..self.clone()
        })
    }
}

/// Succeeds `succeed_times` times, then fails on every execution.
#[derive(Clone, Debug)]
pub struct FailingAction {
    pub node: NodeId,
    pub succeed_times: usize,
    pub executions: Arc<AtomicUsize>,
}

impl FailingAction {
    pub fn new(node: NodeId, succeed_times: usize) -> Self {
        Self {
            node,
            succeed_times,
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Action<f64> for FailingAction {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn outbound(&self) -> DependencySet {
        DependencySet::empty()
    }

    fn execute(&mut self, _ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
        let n = self.executions.fetch_add(1, Ordering::SeqCst);
        if n >= self.succeed_times {
            return Err(ReactionError::ExecutionFailed {
                reason: format!("injected failure on execution {}", n + 1),
            });
        }
        Ok(())
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
        Box::new(Self {
            node,
            ..self.clone()
        })
    }
}

/// Shifts the node by `offset` along the first axis.
#[derive(Clone, Debug)]
pub struct MoveNodeAction {
    pub node: NodeId,
    pub offset: f64,
}

impl Action<f64> for MoveNodeAction {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn outbound(&self) -> DependencySet {
        [Dependency::Movement].into_iter().collect()
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
        let node = self.node;
        let mut coords = ctx
            .env()
            .position(node)
            .ok_or(ReactionError::MissingNode { node })?
            .coords()
            .to_vec();
        if let Some(x) = coords.first_mut() {
            *x += self.offset;
        }
        ctx.env_mut()
            .move_node(node, Position::new(coords))
            .map_err(|e| ReactionError::ConstraintViolation {
                constraint: e.to_string(),
            })
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
        Box::new(Self {
            node,
            ..self.clone()
        })
    }
}

/// Requests removal of `target` (its own node by default).
#[derive(Clone, Debug)]
pub struct RemoveNodeAction {
    pub node: NodeId,
    pub target: NodeId,
}

impl RemoveNodeAction {
    pub fn new(node: NodeId) -> Self {
        Self { node, target: node }
    }
}

impl Action<f64> for RemoveNodeAction {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn outbound(&self) -> DependencySet {
        DependencySet::empty()
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
        ctx.request(StructuralChange::RemoveNode(self.target));
        Ok(())
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
        Box::new(Self { node, target: node })
    }
}

/// Requests a copy of its node, reactions included.
#[derive(Clone, Debug)]
pub struct CloneNodeAction {
    pub node: NodeId,
    pub position: Option<Position>,
}

impl Action<f64> for CloneNodeAction {
    fn node(&self) -> NodeId {
        self.node
    }

    fn context(&self) -> Context {
        Context::Local
    }

    fn outbound(&self) -> DependencySet {
        DependencySet::empty()
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
        ctx.request(StructuralChange::CloneNode {
            source: self.node,
            position: self.position.clone(),
        });
        Ok(())
    }

    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
        Box::new(Self {
            node,
            ..self.clone()
        })
    }
}

// ── Distributions ───────────────────────────────────────────────

/// Fires at `start`, then every `period` after each firing, and counts
/// every call to `update` in a shared counter.
#[derive(Clone, Debug)]
pub struct CountingDistribution {
    start: Time,
    period: f64,
    tau: Time,
    updates: Arc<AtomicUsize>,
}

impl CountingDistribution {
    pub fn new(start: Time, period: f64) -> (Self, Arc<AtomicUsize>) {
        let updates = Arc::new(AtomicUsize::new(0));
        let dist = Self {
            start,
            period,
            tau: start,
            updates: Arc::clone(&updates),
        };
        (dist, updates)
    }
}

impl TimeDistribution<f64> for CountingDistribution {
    fn next_occurrence(&self) -> Time {
        self.tau
    }

    fn rate(&self) -> f64 {
        1.0 / self.period
    }

    fn start(&self) -> Time {
        self.start
    }

    fn update(
        &mut self,
        now: Time,
        executed: bool,
        _rate_hint: f64,
        _env: &Environment<f64>,
        _rng: &mut SimRng,
    ) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if executed {
            self.tau = now.max(self.start) + self.period;
        }
    }

    fn clone_boxed(&self) -> Box<dyn TimeDistribution<f64>> {
        Box::new(self.clone())
    }
}
