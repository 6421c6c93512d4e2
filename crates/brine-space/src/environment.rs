//! The environment: live nodes, their positions, and neighbourhoods.

use crate::error::EnvironmentError;
use crate::linking::LinkingRule;
use crate::node::Node;
use brine_core::{Molecule, NodeId, Position, Time};
use indexmap::{IndexMap, IndexSet};

/// Structural mutations recorded since the journal was last drained.
///
/// The engine takes this after every firing to decide which reactions
/// the firing may have affected beyond its declared outbound
/// dependencies: moved nodes imply a `Movement` change, and nodes whose
/// neighbourhood changed need their neighbourhood-scoped reactions
/// refreshed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvironmentChanges {
    /// Nodes whose position changed.
    pub moved: IndexSet<NodeId>,
    /// Nodes created.
    pub added: IndexSet<NodeId>,
    /// Nodes removed.
    pub removed: IndexSet<NodeId>,
    /// Live nodes whose set of neighbours changed.
    pub neighborhood_changed: IndexSet<NodeId>,
}

impl EnvironmentChanges {
    /// `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.neighborhood_changed.is_empty()
    }
}

/// Owns every live node together with its position and neighbourhood.
///
/// Node ids come from a monotonic counter and are never reused, even
/// after removal. Neighbourhoods are cached per node, sorted by id, and
/// recomputed from the [`LinkingRule`] only for the nodes a mutation
/// touches.
///
/// The environment also carries the global simulated time. The engine is
/// the only writer; conditions and actions read it through
/// [`Environment::time`].
#[derive(Clone, Debug)]
pub struct Environment<T> {
    dimensions: usize,
    nodes: IndexMap<NodeId, Node<T>>,
    positions: IndexMap<NodeId, Position>,
    neighborhoods: IndexMap<NodeId, Vec<NodeId>>,
    linking: Box<dyn LinkingRule>,
    time: Time,
    next_id: u64,
    changes: EnvironmentChanges,
}

impl<T> Environment<T> {
    /// Create an empty environment of the given dimensionality.
    pub fn new(dimensions: usize, linking: impl LinkingRule) -> Self {
        Self::with_boxed_rule(dimensions, Box::new(linking))
    }

    /// Create an empty environment from an already-boxed linking rule.
    pub fn with_boxed_rule(dimensions: usize, linking: Box<dyn LinkingRule>) -> Self {
        Self {
            dimensions,
            nodes: IndexMap::new(),
            positions: IndexMap::new(),
            neighborhoods: IndexMap::new(),
            linking,
            time: Time::ZERO,
            next_id: 0,
            changes: EnvironmentChanges::default(),
        }
    }

    /// Number of spatial dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The linking rule in use.
    pub fn linking_rule(&self) -> &dyn LinkingRule {
        self.linking.as_ref()
    }

    // ── Time ────────────────────────────────────────────────────

    /// Current simulated time.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Set the simulated time. Driven by the engine.
    pub fn set_time(&mut self, time: Time) {
        self.time = time;
    }

    // ── Node lifecycle ──────────────────────────────────────────

    /// Create an empty node at `position` and return its id.
    pub fn add_node(&mut self, position: Position) -> Result<NodeId, EnvironmentError> {
        self.check_position(&position)?;
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id));
        self.positions.insert(id, position);
        self.changes.added.insert(id);
        self.relink(id);
        Ok(id)
    }

    /// Remove a node and return it. Its neighbours lose it from their
    /// neighbourhoods.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node<T>, EnvironmentError> {
        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(EnvironmentError::UnknownNode { node: id })?;
        self.positions.shift_remove(&id);
        let old = self.neighborhoods.shift_remove(&id).unwrap_or_default();
        for n in old {
            if let Some(list) = self.neighborhoods.get_mut(&n) {
                list.retain(|x| *x != id);
                self.changes.neighborhood_changed.insert(n);
            }
        }
        self.changes.moved.shift_remove(&id);
        self.changes.neighborhood_changed.shift_remove(&id);
        self.changes.removed.insert(id);
        Ok(node)
    }

    /// Move a node to a new position, recomputing its neighbourhood.
    pub fn move_node(&mut self, id: NodeId, position: Position) -> Result<(), EnvironmentError> {
        self.check_position(&position)?;
        let slot = self
            .positions
            .get_mut(&id)
            .ok_or(EnvironmentError::UnknownNode { node: id })?;
        *slot = position;
        self.changes.moved.insert(id);
        self.relink(id);
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    /// The node with the given id.
    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(&id)
    }

    /// Mutable access to the node with the given id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(&id)
    }

    /// `true` if the node is live.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ids of live nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.values()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if no node is live.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of a node.
    pub fn position(&self, id: NodeId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// Neighbours of a node, sorted by id. Empty for unknown nodes.
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.neighborhoods.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Concentration of `molecule` on node `id`.
    pub fn concentration(&self, id: NodeId, molecule: &Molecule) -> Option<&T> {
        self.nodes.get(&id)?.concentration(molecule)
    }

    /// Set the concentration of `molecule` on node `id`, returning the
    /// previous value.
    pub fn set_concentration(
        &mut self,
        id: NodeId,
        molecule: Molecule,
        value: T,
    ) -> Result<Option<T>, EnvironmentError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(EnvironmentError::UnknownNode { node: id })?;
        Ok(node.set_concentration(molecule, value))
    }

    // ── Change journal ──────────────────────────────────────────

    /// Changes recorded since the last [`take_changes`](Self::take_changes).
    pub fn changes(&self) -> &EnvironmentChanges {
        &self.changes
    }

    /// Drain the change journal.
    pub fn take_changes(&mut self) -> EnvironmentChanges {
        std::mem::take(&mut self.changes)
    }

    // ── Internals ───────────────────────────────────────────────

    fn check_position(&self, position: &Position) -> Result<(), EnvironmentError> {
        if position.dimensions() != self.dimensions {
            return Err(EnvironmentError::DimensionMismatch {
                expected: self.dimensions,
                got: position.dimensions(),
            });
        }
        if position.coords().iter().any(|c| !c.is_finite()) {
            return Err(EnvironmentError::NonFinitePosition);
        }
        Ok(())
    }

    /// Recompute the neighbourhood of `id` and patch the neighbourhoods
    /// of every node that gained or lost it.
    fn relink(&mut self, id: NodeId) {
        let Some(pos) = self.positions.get(&id) else {
            return;
        };
        let mut fresh: Vec<NodeId> = self
            .positions
            .iter()
            .filter(|(other, other_pos)| {
                **other != id && self.linking.linked(id, pos, **other, other_pos)
            })
            .map(|(other, _)| *other)
            .collect();
        fresh.sort_unstable();

        let old = self.neighborhoods.get(&id).cloned().unwrap_or_default();
        if fresh == old {
            self.neighborhoods.insert(id, fresh);
            return;
        }
        self.changes.neighborhood_changed.insert(id);

        for lost in old.iter().filter(|n| fresh.binary_search(n).is_err()) {
            if let Some(list) = self.neighborhoods.get_mut(lost) {
                list.retain(|x| *x != id);
            }
            self.changes.neighborhood_changed.insert(*lost);
        }
        for gained in fresh.iter().filter(|n| old.binary_search(n).is_err()) {
            let list = self.neighborhoods.entry(*gained).or_default();
            if let Err(i) = list.binary_search(&id) {
                list.insert(i, id);
            }
            self.changes.neighborhood_changed.insert(*gained);
        }
        self.neighborhoods.insert(id, fresh);
    }
}

impl<T: Clone> Environment<T> {
    /// Create a new node holding a copy of `source`'s concentrations.
    ///
    /// The copy is placed at `position`, or at the source's position when
    /// `None`. Reactions are not copied here.
    pub fn clone_node(
        &mut self,
        source: NodeId,
        position: Option<Position>,
    ) -> Result<NodeId, EnvironmentError> {
        let src = self
            .nodes
            .get(&source)
            .ok_or(EnvironmentError::UnknownNode { node: source })?;
        let position = match position {
            Some(p) => p,
            None => self
                .positions
                .get(&source)
                .cloned()
                .ok_or(EnvironmentError::UnknownNode { node: source })?,
        };
        self.check_position(&position)?;
        let id = NodeId(self.next_id);
        let copy = src.clone_contents(id);
        self.next_id += 1;
        self.nodes.insert(id, copy);
        self.positions.insert(id, position);
        self.changes.added.insert(id);
        self.relink(id);
        Ok(id)
    }
}
