//! Integration test: a failing firing leaves the schedule intact.
//!
//! Every firing time is read before and after the failure and must be
//! unchanged; on the threaded path the cause is published through
//! `Simulation::error()` and monitors still see the end of the run.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use brine_core::{Molecule, Position, ReactionError, ReactionId, StepError, Time};
use brine_engine::{ControlError, Engine, EngineConfig, Simulation, Status, StepOutcome};
use brine_reaction::{Distribution, Reaction};
use brine_space::NoLinks;
use brine_test_utils::{
    environment_with_nodes, ChangeConcentration, FailingAction, FailingCondition, MonitorEvent,
    RecordingMonitor,
};

fn taus(engine: &Engine<f64>) -> Vec<(ReactionId, Time)> {
    engine
        .reaction_ids()
        .map(|id| (id, engine.tau_of(id).unwrap()))
        .collect()
}

/// R0 fails at t = 1, R1 would fire at t = 2.
fn failing_action_model() -> (Engine<f64>, ReactionId, ReactionId) {
    let (env, nodes) = environment_with_nodes(1, NoLinks, &[Position::from([0.0])]);
    let n = nodes[0];
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();
    let r0 = engine
        .add_reaction(
            Reaction::new(n, Distribution::dirac_comb(Time::new(1.0), 1.0).unwrap())
                .with_action(FailingAction::new(n, 0)),
        )
        .unwrap();
    let r1 = engine
        .add_reaction(
            Reaction::new(n, Distribution::dirac_comb(Time::new(2.0), 1.0).unwrap())
                .with_action(ChangeConcentration::new(n, "A", 1.0)),
        )
        .unwrap();
    (engine, r0, r1)
}

#[test]
fn action_failure_keeps_queue_and_time() {
    let (mut engine, r0, r1) = failing_action_model();
    assert_eq!(engine.next_event().unwrap(), Some((r0, Time::new(1.0))));
    let before = taus(&engine);

    let err = engine.step().unwrap_err();
    assert_eq!(
        err,
        StepError::ActionFailed {
            reaction: r0,
            reason: ReactionError::ExecutionFailed {
                reason: "injected failure on execution 1".into(),
            },
        }
    );
    assert_eq!(taus(&engine), before);
    assert_eq!(engine.tau_of(r1), Some(Time::new(2.0)));
    assert_eq!(engine.time(), Time::ZERO);
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.reaction(r0).unwrap().executions(), 0);
}

#[test]
fn condition_failure_during_refresh_keeps_queue() {
    let (env, nodes) = environment_with_nodes(1, NoLinks, &[Position::from([0.0])]);
    let n = nodes[0];
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();
    let (guard, fail) = FailingCondition::new(n, "A");
    let reader = engine
        .add_reaction(
            Reaction::new(n, Distribution::dirac_comb(Time::new(5.0), 1.0).unwrap())
                .with_condition(guard),
        )
        .unwrap();
    let writer = engine
        .add_reaction(
            Reaction::new(n, Distribution::dirac_comb(Time::new(1.0), 1.0).unwrap())
                .with_action(ChangeConcentration::new(n, "A", 1.0)),
        )
        .unwrap();
    engine.initialize().unwrap();
    let before = taus(&engine);

    fail.store(true, Ordering::SeqCst);
    let err = engine.step().unwrap_err();
    assert!(matches!(
        err,
        StepError::ConditionFailed { reaction, .. } if reaction == reader
    ));
    assert_eq!(taus(&engine), before);
    assert_eq!(engine.tau_of(writer), Some(Time::new(1.0)));
}

#[test]
fn simulation_publishes_the_cause() {
    let (engine, r0, r1) = failing_action_model();
    let sim = Simulation::new(engine);
    let monitor = Arc::new(RecordingMonitor::new());
    sim.add_output_monitor(&monitor).unwrap();

    let err = sim.run().unwrap_err();
    let ControlError::Failed(cause) = err else {
        panic!("expected a step failure, got {err:?}");
    };
    assert!(matches!(cause, StepError::ActionFailed { reaction, .. } if reaction == r0));
    assert_eq!(sim.error(), Some(cause));
    assert_eq!(sim.status(), Status::Terminated);
    assert!(matches!(
        monitor.events().last(),
        Some(MonitorEvent::Finished { step: 0, .. })
    ));

    let engine = sim.join().unwrap();
    assert_eq!(engine.tau_of(r0), Some(Time::new(1.0)));
    assert_eq!(engine.tau_of(r1), Some(Time::new(2.0)));
    assert_eq!(
        engine
            .environment()
            .concentration(engine.reaction(r1).unwrap().node(), &Molecule::from("A")),
        None
    );
}

#[test]
fn panicking_action_is_caught() {
    use brine_core::{Context, DependencySet, NodeId};
    use brine_reaction::{Action, ActionContext};

    struct Boom(NodeId);

    impl Action<f64> for Boom {
        fn node(&self) -> NodeId {
            self.0
        }
        fn context(&self) -> Context {
            Context::Local
        }
        fn outbound(&self) -> DependencySet {
            DependencySet::empty()
        }
        fn execute(&mut self, _ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
            panic!("boom");
        }
        fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
            Box::new(Boom(node))
        }
    }

    let (env, nodes) = environment_with_nodes(1, NoLinks, &[Position::from([0.0])]);
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();
    engine
        .add_reaction(
            Reaction::new(nodes[0], Distribution::trigger(Time::ZERO).unwrap())
                .with_action(Boom(nodes[0])),
        )
        .unwrap();
    let sim = Simulation::new(engine);
    let err = sim.run().unwrap_err();
    assert_eq!(
        err,
        ControlError::Failed(StepError::Panicked {
            message: "boom".into()
        })
    );
    assert_eq!(sim.status(), Status::Terminated);
}

#[test]
fn finished_engine_stays_finished() {
    let (env, nodes) = environment_with_nodes(1, NoLinks, &[Position::from([0.0])]);
    let mut engine = Engine::new(env, EngineConfig::default()).unwrap();
    engine
        .add_reaction(Reaction::new(nodes[0], Distribution::trigger(Time::ZERO).unwrap()))
        .unwrap();
    assert!(matches!(engine.step().unwrap(), StepOutcome::Fired { .. }));
    assert!(matches!(engine.step().unwrap(), StepOutcome::Finished(_)));
    assert!(matches!(engine.step().unwrap(), StepOutcome::Finished(_)));
}
