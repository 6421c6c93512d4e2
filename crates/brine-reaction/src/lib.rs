//! Reactions, conditions, actions, and time distributions for brine.
//!
//! A [`Reaction`] is the unit the scheduler orders: it is bound to one
//! node, guarded by [`Condition`]s, performs [`Action`]s, and gets its
//! next firing time from a [`Distribution`]. The dependency sets a
//! reaction derives from its conditions and actions are what lets the
//! engine refresh only the reactions a firing can affect.
//!
//! Domain models plug in through the [`Incarnation`] contract, which
//! builds nodes, reactions, conditions, actions, and concentrations from
//! textual parameters.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod condition;
pub mod context;
pub mod distribution;
pub mod incarnation;
pub mod reaction;

pub use action::Action;
pub use condition::Condition;
pub use context::{ActionContext, StructuralChange};
pub use distribution::{
    parse_distribution, DiracComb, Distribution, ExponentialTime, SimRng, TimeDistribution,
    Trigger,
};
pub use incarnation::{construction_error, Incarnation};
pub use reaction::Reaction;
