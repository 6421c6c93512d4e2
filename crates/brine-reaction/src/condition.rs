//! The [`Condition`] trait: guards on a reaction.

use brine_core::{Context, DependencySet, NodeId, ReactionError};
use brine_space::Environment;

/// A guard on a reaction, bound to one node.
///
/// A reaction may fire only when all of its conditions are valid. Each
/// condition also contributes a factor to the reaction's propensity, so
/// stochastic reactions slow down or speed up with the state they read.
///
/// # Contract
///
/// - `inbound()` lists everything `is_valid` and `propensity_contribution`
///   read. The engine refreshes the owning reaction only when one of
///   these changes, so an incomplete set means stale firing times.
/// - `context()` is the widest scope the condition reads: its own node
///   ([`Context::Local`]), its neighbours, or the whole environment.
/// - `propensity_contribution()` is finite and non-negative.
pub trait Condition<T>: Send + 'static {
    /// The node this condition is bound to.
    fn node(&self) -> NodeId;

    /// The widest scope this condition reads.
    fn context(&self) -> Context;

    /// Everything this condition reads.
    fn inbound(&self) -> DependencySet;

    /// Whether the guard currently holds.
    fn is_valid(&self, env: &Environment<T>) -> Result<bool, ReactionError>;

    /// This condition's factor in the owning reaction's propensity.
    ///
    /// Default: `1.0` when valid, `0.0` otherwise.
    fn propensity_contribution(&self, env: &Environment<T>) -> Result<f64, ReactionError> {
        Ok(if self.is_valid(env)? { 1.0 } else { 0.0 })
    }

    /// An independent copy bound to `node`.
    fn clone_onto(&self, node: NodeId) -> Box<dyn Condition<T>>;
}
