//! Core types for the brine discrete-event simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace:
//! simulated [`Time`], node and reaction identifiers, molecules,
//! positions, the [`Dependency`]/[`Context`] model the scheduler uses
//! to decide which reactions to re-evaluate, and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dependency;
pub mod error;
pub mod id;
pub mod time;

pub use dependency::{Context, Dependency, DependencySet};
pub use error::{ConstructionError, ReactionError, StepError};
pub use id::{Molecule, NodeId, Position, ReactionId};
pub use time::Time;
