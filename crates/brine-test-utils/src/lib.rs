//! Test fixtures, monitors, and a toy incarnation for brine development.
//!
//! Everything here works on `f64` concentrations:
//!
//! - [`fixtures`]: conditions, actions, and an instrumented distribution
//! - [`monitors`]: output monitors that record or fail on demand
//! - [`incarnation`]: [`ToyIncarnation`], a small textual model language

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod incarnation;
pub mod monitors;

pub use fixtures::{
    AlwaysTrue, ChangeConcentration, CloneNodeAction, CountingDistribution, FailingAction,
    FailingCondition, MoleculeAtLeast, MoveNodeAction, RemoveNodeAction, TransferToNeighbor,
};
pub use incarnation::ToyIncarnation;
pub use monitors::{FailingMonitor, MonitorEvent, RecordingMonitor};

use brine_core::{NodeId, Position};
use brine_space::{Environment, LinkingRule};

/// Build an environment with one node per position.
///
/// Panics on an invalid position; test scaffolding only.
pub fn environment_with_nodes(
    dimensions: usize,
    linking: impl LinkingRule,
    positions: &[Position],
) -> (Environment<f64>, Vec<NodeId>) {
    let mut env = Environment::new(dimensions, linking);
    let ids = positions
        .iter()
        .map(|p| env.add_node(p.clone()).expect("valid test position"))
        .collect();
    (env, ids)
}
