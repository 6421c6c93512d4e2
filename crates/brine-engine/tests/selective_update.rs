//! Integration test: a firing refreshes exactly its dependents.
//!
//! Each reaction carries a counting distribution. After one firing, only
//! the fired reaction and the readers it could have affected may have
//! been updated.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use brine_core::{
    Context, Dependency, DependencySet, Molecule, NodeId, Position, ReactionError, Time,
};
use brine_engine::{Engine, EngineConfig, StepOutcome};
use brine_reaction::{Action, ActionContext, Condition, Distribution, Reaction};
use brine_space::{ConnectWithinDistance, Environment, NoLinks};
use brine_test_utils::{
    environment_with_nodes, ChangeConcentration, CountingDistribution, MoleculeAtLeast,
    MoveNodeAction, TransferToNeighbor,
};

fn counted(start: f64) -> (Distribution<f64>, Arc<AtomicUsize>) {
    let (dist, counter) = CountingDistribution::new(Time::new(start), 1.0);
    (Distribution::custom(dist), counter)
}

fn count(c: &Arc<AtomicUsize>) -> usize {
    c.load(Ordering::SeqCst)
}

/// Reads node movement, nothing else.
struct WatchesMovement(NodeId, Context);

impl Condition<f64> for WatchesMovement {
    fn node(&self) -> NodeId {
        self.0
    }
    fn context(&self) -> Context {
        self.1
    }
    fn inbound(&self) -> DependencySet {
        [Dependency::Movement].into_iter().collect()
    }
    fn is_valid(&self, _env: &Environment<f64>) -> Result<bool, ReactionError> {
        Ok(true)
    }
    fn clone_onto(&self, node: NodeId) -> Box<dyn Condition<f64>> {
        Box::new(WatchesMovement(node, self.1))
    }
}

/// Writes everything.
struct TouchAll(NodeId);

impl Action<f64> for TouchAll {
    fn node(&self) -> NodeId {
        self.0
    }
    fn context(&self) -> Context {
        Context::Global
    }
    fn outbound(&self) -> DependencySet {
        DependencySet::everything()
    }
    fn execute(&mut self, _ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
        Ok(())
    }
    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
        Box::new(TouchAll(node))
    }
}

#[test]
fn local_write_refreshes_only_local_readers() {
    let (env, nodes) = environment_with_nodes(
        1,
        NoLinks,
        &[Position::from([0.0]), Position::from([5.0])],
    );
    let (n0, n1) = (nodes[0], nodes[1]);
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();

    let (dist, writer) = counted(1.0);
    engine
        .add_reaction(Reaction::new(n0, dist).with_action(ChangeConcentration::new(n0, "A", 1.0)))
        .unwrap();
    let (dist, reads_a) = counted(100.0);
    engine
        .add_reaction(Reaction::new(n0, dist).with_condition(MoleculeAtLeast::new(n0, "A", 0.0)))
        .unwrap();
    let (dist, reads_b) = counted(100.0);
    engine
        .add_reaction(Reaction::new(n0, dist).with_condition(MoleculeAtLeast::new(n0, "B", 0.0)))
        .unwrap();
    let (dist, elsewhere) = counted(100.0);
    engine
        .add_reaction(Reaction::new(n1, dist).with_condition(MoleculeAtLeast::new(n1, "A", 0.0)))
        .unwrap();
    let (dist, independent) = counted(100.0);
    engine.add_reaction(Reaction::new(n0, dist)).unwrap();

    engine.initialize().unwrap();
    let all = [&writer, &reads_a, &reads_b, &elsewhere, &independent];
    assert!(all.iter().all(|c| count(c) == 1), "initialisation refreshes everything once");

    assert!(matches!(engine.step().unwrap(), StepOutcome::Fired { .. }));
    assert_eq!(count(&writer), 2);
    assert_eq!(count(&reads_a), 2);
    assert_eq!(count(&reads_b), 1);
    assert_eq!(count(&elsewhere), 1);
    assert_eq!(count(&independent), 1);
    assert_eq!(engine.metrics().last_step.refreshed, 2);
}

#[test]
fn neighborhood_write_reaches_neighbours_only() {
    let (mut env, nodes) = environment_with_nodes(
        1,
        ConnectWithinDistance::new(1.0).unwrap(),
        &[Position::from([0.0]), Position::from([1.0]), Position::from([3.0])],
    );
    env.set_concentration(nodes[0], Molecule::from("A"), 10.0)
        .unwrap();
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();

    let (dist, _) = counted(1.0);
    engine
        .add_reaction(
            Reaction::new(nodes[0], dist).with_action(TransferToNeighbor::new(nodes[0], "A")),
        )
        .unwrap();
    let mut readers = Vec::new();
    for &n in &nodes {
        let (dist, c) = counted(100.0);
        engine
            .add_reaction(Reaction::new(n, dist).with_condition(MoleculeAtLeast::new(n, "A", 0.0)))
            .unwrap();
        readers.push(c);
    }
    engine.initialize().unwrap();
    engine.step().unwrap();

    assert_eq!(count(&readers[0]), 2);
    assert_eq!(count(&readers[1]), 2);
    assert_eq!(count(&readers[2]), 1, "node 2 is not a neighbour");
}

#[test]
fn everything_refreshes_all() {
    let (env, nodes) = environment_with_nodes(
        1,
        NoLinks,
        &[Position::from([0.0]), Position::from([5.0])],
    );
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();
    let (dist, _) = counted(1.0);
    engine
        .add_reaction(Reaction::new(nodes[0], dist).with_action(TouchAll(nodes[0])))
        .unwrap();
    let (dist, reader) = counted(100.0);
    engine
        .add_reaction(
            Reaction::new(nodes[1], dist).with_condition(MoleculeAtLeast::new(nodes[1], "Z", 0.0)),
        )
        .unwrap();
    engine.initialize().unwrap();
    engine.step().unwrap();
    assert_eq!(count(&reader), 2);
}

#[test]
fn movement_refreshes_nearby_and_global_watchers() {
    let (env, nodes) = environment_with_nodes(
        1,
        ConnectWithinDistance::new(1.0).unwrap(),
        &[Position::from([0.0]), Position::from([1.0]), Position::from([10.0])],
    );
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();
    let (dist, _) = counted(1.0);
    engine
        .add_reaction(Reaction::new(nodes[0], dist).with_action(MoveNodeAction {
            node: nodes[0],
            offset: 0.5,
        }))
        .unwrap();
    let (dist, near) = counted(100.0);
    engine
        .add_reaction(
            Reaction::new(nodes[1], dist).with_condition(WatchesMovement(nodes[1], Context::Local)),
        )
        .unwrap();
    let (dist, far) = counted(100.0);
    engine
        .add_reaction(
            Reaction::new(nodes[2], dist).with_condition(WatchesMovement(nodes[2], Context::Local)),
        )
        .unwrap();
    let (dist, global) = counted(100.0);
    engine
        .add_reaction(
            Reaction::new(nodes[2], dist)
                .with_condition(WatchesMovement(nodes[2], Context::Global)),
        )
        .unwrap();
    engine.initialize().unwrap();
    engine.step().unwrap();

    assert_eq!(
        engine.environment().position(nodes[0]),
        Some(&Position::from([0.5]))
    );
    assert_eq!(count(&near), 2);
    assert_eq!(count(&far), 1);
    assert_eq!(count(&global), 2);
}
