//! Nodes, environments, and neighbourhood linking for brine simulations.
//!
//! This crate defines the [`Environment`] the scheduler drives: it owns
//! every live [`Node`], a [`Position`](brine_core::Position) for each,
//! and the neighbourhood relation produced by a pluggable
//! [`LinkingRule`]. Mutations are recorded in an
//! [`EnvironmentChanges`] journal that the engine drains after every
//! firing to learn which nodes moved, appeared, or vanished.
//!
//! # Linking rules
//!
//! - [`ConnectWithinDistance`]: nodes closer than a fixed range are neighbours
//! - [`ExplicitLinks`]: a fixed list of node pairs
//! - [`NoLinks`]: every node is isolated

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod environment;
pub mod error;
pub mod linking;
pub mod node;

#[cfg(test)]
pub(crate) mod compliance;

pub use environment::{Environment, EnvironmentChanges};
pub use error::EnvironmentError;
pub use linking::{ConnectWithinDistance, ExplicitLinks, LinkingRule, NoLinks};
pub use node::Node;
