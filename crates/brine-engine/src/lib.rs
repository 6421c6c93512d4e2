//! Next-reaction scheduling engine for brine simulations.
//!
//! Provides the single-threaded [`Engine`], which keeps every reaction in
//! an indexed priority queue and, after each firing, refreshes only the
//! reactions whose inputs the firing could have changed. On top of it:
//!
//! - [`Simulation`]: the engine on a dedicated thread, driven through
//!   play / pause / go-to commands with a published [`Status`]
//! - [`ReplicateBatch`]: independent seeded replicates run in parallel
//! - [`OutputMonitor`]: observers called after initialisation, every
//!   step, and termination

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batched;
pub mod config;
pub mod dependency_graph;
pub mod engine;
mod engine_thread;
pub mod metrics;
pub mod monitor;
pub mod queue;
pub mod simulation;
pub mod status;

pub use batched::{BatchError, ReplicateBatch};
pub use config::{ConfigError, EngineConfig};
pub use dependency_graph::{DependencyIndex, Scope};
pub use engine::{Engine, FinishReason, RunGoal, RunOutcome, StepOutcome};
pub use metrics::{EngineMetrics, StepMetrics};
pub use monitor::{MonitorError, OutputMonitor};
pub use queue::ReactionQueue;
pub use simulation::{ControlError, Simulation};
pub use status::Status;
