//! Brine: a discrete-event stochastic simulation kernel.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! brine sub-crates. For most users, adding `brine` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use brine::prelude::*;
//!
//! // Adds one unit of "A" to its node every time it fires.
//! struct Produce {
//!     node: NodeId,
//! }
//!
//! impl Action<f64> for Produce {
//!     fn node(&self) -> NodeId { self.node }
//!     fn context(&self) -> Context { Context::Local }
//!     fn outbound(&self) -> DependencySet {
//!         [Dependency::Molecule("A".into())].into_iter().collect()
//!     }
//!     fn execute(&mut self, ctx: &mut ActionContext<'_, f64>) -> Result<(), ReactionError> {
//!         let a: Molecule = "A".into();
//!         let current = ctx.env().concentration(self.node, &a).copied().unwrap_or(0.0);
//!         ctx.env_mut()
//!             .set_concentration(self.node, a, current + 1.0)
//!             .map_err(|e| ReactionError::ExecutionFailed { reason: e.to_string() })
//!             .map(|_| ())
//!     }
//!     fn clone_onto(&self, node: NodeId) -> Box<dyn Action<f64>> {
//!         Box::new(Produce { node })
//!     }
//! }
//!
//! let mut env = Environment::new(1, NoLinks);
//! let node = env.add_node([0.0].into()).unwrap();
//! let config = EngineConfig { end_step: Some(5), ..EngineConfig::default() };
//! let mut engine = Engine::new(env, config).unwrap();
//! let every_second = Distribution::dirac_comb(Time::ZERO, 1.0).unwrap();
//! engine
//!     .add_reaction(Reaction::new(node, every_second).with_action(Produce { node }))
//!     .unwrap();
//!
//! let sim = Simulation::new(engine);
//! sim.run().unwrap();
//! let engine = sim.join().unwrap();
//! let a = engine.environment().concentration(node, &"A".into()).copied();
//! assert_eq!(a, Some(5.0));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `brine-core` | IDs, time, dependencies, error types |
//! | [`space`] | `brine-space` | Nodes, environment, linking rules |
//! | [`reaction`] | `brine-reaction` | Conditions, actions, distributions, incarnations |
//! | [`engine`] | `brine-engine` | Scheduler, simulation control, monitors, batches |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`brine-core`).
///
/// Contains [`types::Time`], [`types::Dependency`], [`types::Context`],
/// and the error types shared by every layer.
pub use brine_core as types;

/// Nodes and the environment that links them (`brine-space`).
///
/// [`space::Environment`] owns every node and records what changed;
/// [`space::LinkingRule`] decides neighbourhoods.
pub use brine_space as space;

/// Reactions and their parts (`brine-reaction`).
///
/// The [`reaction::Condition`] and [`reaction::Action`] traits are the main
/// extension points for model logic.
pub use brine_reaction as reaction;

/// The scheduler and its control surfaces (`brine-engine`).
///
/// [`engine::Engine`] for synchronous stepping, [`engine::Simulation`] for a
/// background thread with play/pause control, and
/// [`engine::ReplicateBatch`] for independent seeds in parallel.
pub use brine_engine as engine;

/// Common imports for typical brine usage.
///
/// ```rust
/// use brine::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use brine_core::{Context, Dependency, DependencySet, Molecule, NodeId, Position};
    pub use brine_core::{ReactionId, Time};

    // Errors
    pub use brine_core::{ConstructionError, ReactionError, StepError};

    // Space
    pub use brine_space::{ConnectWithinDistance, Environment, LinkingRule, NoLinks};

    // Reactions
    pub use brine_reaction::{
        Action, ActionContext, Condition, Distribution, Incarnation, Reaction, SimRng,
        StructuralChange,
    };

    // Engine
    pub use brine_engine::{
        Engine, EngineConfig, OutputMonitor, ReplicateBatch, RunGoal, RunOutcome, Simulation,
        Status,
    };
}
