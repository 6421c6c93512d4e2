//! The [`Incarnation`] contract: how a domain model builds its pieces.

use crate::action::Action;
use crate::condition::Condition;
use crate::distribution::{parse_distribution, Distribution, SimRng};
use crate::reaction::Reaction;
use brine_core::{ConstructionError, NodeId, Position};
use brine_space::{Environment, EnvironmentError};

/// Factory for every model-specific piece of a simulation.
///
/// Loaders hand textual parameters to an incarnation and get back nodes,
/// distributions, reactions, conditions, actions, and concentrations.
/// Malformed parameters fail here, at creation time, never inside the
/// running engine. A request the incarnation cannot serve fails with
/// [`ConstructionError::UnsupportedCapability`].
pub trait Incarnation<T: 'static>: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Create a node at `position`.
    ///
    /// Default: an empty node, ignoring `parameter`.
    fn create_node(
        &self,
        env: &mut Environment<T>,
        position: Position,
        parameter: Option<&str>,
    ) -> Result<NodeId, ConstructionError> {
        let _ = parameter;
        env.add_node(position).map_err(construction_error)
    }

    /// Create the time distribution for a reaction on `node`.
    ///
    /// Default: [`parse_distribution`] starting at the current time.
    fn create_time_distribution(
        &self,
        rng: &mut SimRng,
        env: &Environment<T>,
        node: NodeId,
        parameter: Option<&str>,
    ) -> Result<Distribution<T>, ConstructionError> {
        if !env.contains_node(node) {
            return Err(ConstructionError::UnknownNode { node });
        }
        parse_distribution(parameter, env.time(), rng)
    }

    /// Create a reaction on `node` driven by `distribution`.
    fn create_reaction(
        &self,
        rng: &mut SimRng,
        env: &Environment<T>,
        node: NodeId,
        distribution: Distribution<T>,
        parameter: Option<&str>,
    ) -> Result<Reaction<T>, ConstructionError>;

    /// Create a condition bound to `node`.
    fn create_condition(
        &self,
        rng: &mut SimRng,
        env: &Environment<T>,
        node: NodeId,
        parameter: Option<&str>,
    ) -> Result<Box<dyn Condition<T>>, ConstructionError>;

    /// Create an action bound to `node`.
    fn create_action(
        &self,
        rng: &mut SimRng,
        env: &Environment<T>,
        node: NodeId,
        parameter: Option<&str>,
    ) -> Result<Box<dyn Action<T>>, ConstructionError>;

    /// Parse a concentration.
    fn create_concentration(&self, text: Option<&str>) -> Result<T, ConstructionError>;
}

/// Map an environment failure onto the construction error a loader
/// reports.
pub fn construction_error(err: EnvironmentError) -> ConstructionError {
    match err {
        EnvironmentError::UnknownNode { node } => ConstructionError::UnknownNode { node },
        other => ConstructionError::InvalidParameter {
            parameter: "position".to_owned(),
            reason: other.to_string(),
        },
    }
}
