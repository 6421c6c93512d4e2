//! The [`Action`] trait: what a reaction does when it fires.

use crate::context::ActionContext;
use brine_core::{Context, DependencySet, NodeId, ReactionError};

/// An effect of a reaction, bound to one node.
///
/// # Contract
///
/// - `outbound()` lists everything `execute` may change. The engine
///   refreshes exactly the reactions whose inbound dependencies intersect
///   the union of these sets, within the scope given by `context()`.
/// - `execute()` runs exactly once per firing, in declaration order with
///   the reaction's other actions. Structural changes (new reactions,
///   removed nodes) are requested through the [`ActionContext`] and
///   applied by the engine after every action has run.
pub trait Action<T>: Send + 'static {
    /// The node this action is bound to.
    fn node(&self) -> NodeId;

    /// The widest scope this action writes.
    fn context(&self) -> Context;

    /// Everything this action may change.
    fn outbound(&self) -> DependencySet;

    /// Perform the action.
    fn execute(&mut self, ctx: &mut ActionContext<'_, T>) -> Result<(), ReactionError>;

    /// An independent copy bound to `node`.
    fn clone_onto(&self, node: NodeId) -> Box<dyn Action<T>>;
}
