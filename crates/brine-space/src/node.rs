//! Simulation nodes.

use brine_core::{Molecule, NodeId, ReactionId};
use indexmap::IndexMap;

/// A spatially-located container of molecule concentrations.
///
/// A node owns its concentration table and the ids of the reactions
/// scheduled on it. The reactions themselves live in the engine; the
/// node only records which ones are bound here so they can be torn down
/// together when the node is removed.
///
/// Concentrations are kept in insertion order, so iterating a node's
/// molecules is deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct Node<T> {
    id: NodeId,
    concentrations: IndexMap<Molecule, T>,
    reactions: Vec<ReactionId>,
}

impl<T> Node<T> {
    /// Create an empty node. Normally called by the environment, which
    /// hands out ids.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            concentrations: IndexMap::new(),
            reactions: Vec::new(),
        }
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Concentration of `molecule`, if present.
    pub fn concentration(&self, molecule: &Molecule) -> Option<&T> {
        self.concentrations.get(molecule)
    }

    /// Mutable access to the concentration of `molecule`, if present.
    pub fn concentration_mut(&mut self, molecule: &Molecule) -> Option<&mut T> {
        self.concentrations.get_mut(molecule)
    }

    /// Set the concentration of `molecule`, returning the previous value.
    pub fn set_concentration(&mut self, molecule: Molecule, value: T) -> Option<T> {
        self.concentrations.insert(molecule, value)
    }

    /// Remove `molecule` from this node, returning its concentration.
    pub fn remove_concentration(&mut self, molecule: &Molecule) -> Option<T> {
        self.concentrations.shift_remove(molecule)
    }

    /// `true` if `molecule` has a concentration on this node.
    pub fn contains(&self, molecule: &Molecule) -> bool {
        self.concentrations.contains_key(molecule)
    }

    /// Molecules present on this node, in insertion order.
    pub fn molecules(&self) -> impl Iterator<Item = &Molecule> {
        self.concentrations.keys()
    }

    /// `(molecule, concentration)` pairs in insertion order.
    pub fn concentrations(&self) -> impl Iterator<Item = (&Molecule, &T)> {
        self.concentrations.iter()
    }

    /// Number of molecules present.
    pub fn molecule_count(&self) -> usize {
        self.concentrations.len()
    }

    /// Reactions scheduled on this node, in the order they were added.
    pub fn reactions(&self) -> &[ReactionId] {
        &self.reactions
    }

    /// Record that `reaction` is scheduled on this node.
    pub fn add_reaction(&mut self, reaction: ReactionId) {
        if !self.reactions.contains(&reaction) {
            self.reactions.push(reaction);
        }
    }

    /// Forget `reaction`. Returns `true` if it was recorded.
    pub fn remove_reaction(&mut self, reaction: ReactionId) -> bool {
        match self.reactions.iter().position(|r| *r == reaction) {
            Some(i) => {
                self.reactions.remove(i);
                true
            }
            None => false,
        }
    }
}

impl<T: Clone> Node<T> {
    /// A copy of this node's concentrations under a new id, with no
    /// reactions. Reactions are cloned separately by the engine.
    pub fn clone_contents(&self, id: NodeId) -> Self {
        Self {
            id,
            concentrations: self.concentrations.clone(),
            reactions: Vec::new(),
        }
    }
}
