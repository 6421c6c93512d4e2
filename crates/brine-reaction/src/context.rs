//! Execution context handed to actions, and the structural changes they
//! may request.

use crate::distribution::SimRng;
use crate::reaction::Reaction;
use brine_core::{NodeId, Position, ReactionId, Time};
use brine_space::Environment;
use std::fmt;

/// A change to the set of nodes or reactions, requested by an action.
///
/// Applied by the engine once every action of the firing reaction has
/// run, in the order requested.
pub enum StructuralChange<T> {
    /// Schedule a new reaction. Its node must exist.
    AddReaction(Reaction<T>),
    /// Unschedule a reaction and detach it from its node.
    RemoveReaction(ReactionId),
    /// Remove a node together with every reaction bound to it.
    RemoveNode(NodeId),
    /// Copy a node and every reaction bound to it. The copy is placed at
    /// `position`, or on top of the source when `None`.
    CloneNode {
        /// Node to copy.
        source: NodeId,
        /// Where to place the copy.
        position: Option<Position>,
    },
}

impl<T: 'static> fmt::Debug for StructuralChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddReaction(r) => f.debug_tuple("AddReaction").field(&r.node()).finish(),
            Self::RemoveReaction(id) => f.debug_tuple("RemoveReaction").field(id).finish(),
            Self::RemoveNode(id) => f.debug_tuple("RemoveNode").field(id).finish(),
            Self::CloneNode { source, position } => f
                .debug_struct("CloneNode")
                .field("source", source)
                .field("position", position)
                .finish(),
        }
    }
}

/// Execution context passed to each action's `execute()`.
///
/// Gives mutable access to the environment and the simulation RNG, and
/// collects structural change requests for the engine.
pub struct ActionContext<'a, T> {
    env: &'a mut Environment<T>,
    rng: &'a mut SimRng,
    changes: &'a mut Vec<StructuralChange<T>>,
    reaction: ReactionId,
    node: NodeId,
    time: Time,
}

impl<'a, T> ActionContext<'a, T> {
    /// Construct a new action context.
    ///
    /// Typically called by the engine, not by actions directly.
    pub fn new(
        env: &'a mut Environment<T>,
        rng: &'a mut SimRng,
        changes: &'a mut Vec<StructuralChange<T>>,
        reaction: ReactionId,
        node: NodeId,
        time: Time,
    ) -> Self {
        Self {
            env,
            rng,
            changes,
            reaction,
            node,
            time,
        }
    }

    /// Read access to the environment.
    pub fn env(&self) -> &Environment<T> {
        self.env
    }

    /// Mutable access to the environment.
    pub fn env_mut(&mut self) -> &mut Environment<T> {
        self.env
    }

    /// The simulation RNG.
    pub fn rng(&mut self) -> &mut SimRng {
        self.rng
    }

    /// The firing reaction.
    pub fn reaction(&self) -> ReactionId {
        self.reaction
    }

    /// The node the firing reaction is bound to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The firing time.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Queue a structural change.
    pub fn request(&mut self, change: StructuralChange<T>) {
        self.changes.push(change);
    }

    /// Changes requested so far in this firing.
    pub fn requested(&self) -> &[StructuralChange<T>] {
        self.changes
    }
}
