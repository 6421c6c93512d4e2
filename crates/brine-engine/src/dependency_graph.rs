//! Which reactions does a firing affect?
//!
//! Two filters, applied in order:
//!
//! 1. [`DependencyIndex`] maps each inbound dependency to the reactions
//!    that read it, so the candidates for a firing are found from its
//!    outbound set without scanning every reaction.
//! 2. [`Scope`] drops candidates the firing cannot reach, given where it
//!    happened, how far its actions write, and how far each candidate
//!    reads.

use std::collections::BTreeSet;

use brine_core::{Context, Dependency, DependencySet, Molecule, NodeId, ReactionId};
use brine_space::Environment;
use indexmap::IndexMap;

/// Reverse index from inbound dependencies to reactions.
///
/// Wildcard readers live in their own buckets: a reaction reading
/// `Everything` is a candidate for every firing, one reading
/// `EveryMolecule` for every firing that writes any molecule.
#[derive(Clone, Debug, Default)]
pub struct DependencyIndex {
    by_molecule: IndexMap<Molecule, BTreeSet<ReactionId>>,
    movement: BTreeSet<ReactionId>,
    every_molecule: BTreeSet<ReactionId>,
    everything: BTreeSet<ReactionId>,
    all: BTreeSet<ReactionId>,
}

impl DependencyIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `id` under every entry of `inbound`.
    pub fn insert(&mut self, id: ReactionId, inbound: &DependencySet) {
        self.all.insert(id);
        for dep in inbound.iter() {
            match dep {
                Dependency::Everything => {
                    self.everything.insert(id);
                }
                Dependency::EveryMolecule => {
                    self.every_molecule.insert(id);
                }
                Dependency::Movement => {
                    self.movement.insert(id);
                }
                Dependency::Molecule(m) => {
                    self.by_molecule.entry(m).or_default().insert(id);
                }
            }
        }
    }

    /// Drop `id` from every bucket `inbound` put it in.
    pub fn remove(&mut self, id: ReactionId, inbound: &DependencySet) {
        self.all.remove(&id);
        for dep in inbound.iter() {
            match dep {
                Dependency::Everything => {
                    self.everything.remove(&id);
                }
                Dependency::EveryMolecule => {
                    self.every_molecule.remove(&id);
                }
                Dependency::Movement => {
                    self.movement.remove(&id);
                }
                Dependency::Molecule(m) => {
                    if let Some(bucket) = self.by_molecule.get_mut(&m) {
                        bucket.remove(&id);
                        if bucket.is_empty() {
                            self.by_molecule.swap_remove(&m);
                        }
                    }
                }
            }
        }
    }

    /// Number of indexed reactions.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Reactions whose inbound set intersects `outbound`, in id order.
    pub fn candidates(&self, outbound: &DependencySet) -> BTreeSet<ReactionId> {
        if outbound.is_empty() {
            return BTreeSet::new();
        }
        if outbound.contains(&Dependency::Everything) {
            return self.all.clone();
        }
        let mut out = self.everything.clone();
        for dep in outbound.iter() {
            match dep {
                Dependency::Movement => out.extend(&self.movement),
                Dependency::EveryMolecule => {
                    out.extend(&self.every_molecule);
                    for bucket in self.by_molecule.values() {
                        out.extend(bucket);
                    }
                }
                Dependency::Molecule(m) => {
                    out.extend(&self.every_molecule);
                    if let Some(bucket) = self.by_molecule.get(&m) {
                        out.extend(bucket);
                    }
                }
                Dependency::Everything => {}
            }
        }
        out
    }

    /// Reactions reading `Movement` (or `Everything`).
    pub fn movement_readers(&self) -> BTreeSet<ReactionId> {
        self.movement.union(&self.everything).copied().collect()
    }
}

/// Spatial reach of one firing.
///
/// Built from the firing node `origin`, the reaction's output context,
/// and the neighbourhood of `origin` both before and after the actions
/// ran, so writes to a neighbour that has since moved away still count.
#[derive(Clone, Debug)]
pub struct Scope {
    origin: NodeId,
    context: Context,
    first: BTreeSet<NodeId>,
    second: BTreeSet<NodeId>,
}

impl Scope {
    /// Scope of a firing on `origin`, writing with `context`.
    ///
    /// `before` is the neighbourhood of `origin` before the actions ran.
    pub fn new<T>(
        origin: NodeId,
        context: Context,
        before: &[NodeId],
        env: &Environment<T>,
    ) -> Self {
        let first: BTreeSet<NodeId> = before
            .iter()
            .chain(env.neighbors(origin))
            .copied()
            .collect();
        let second = match context {
            Context::Neighborhood => first
                .iter()
                .flat_map(|n| env.neighbors(*n).iter().copied())
                .collect(),
            Context::Local | Context::Global => BTreeSet::new(),
        };
        Self {
            origin,
            context,
            first,
            second,
        }
    }

    /// Whether a reaction on `target` reading with `input` can observe
    /// this firing.
    pub fn admits(&self, target: NodeId, input: Context) -> bool {
        if self.context == Context::Global || input == Context::Global || target == self.origin {
            return true;
        }
        match self.context {
            Context::Local => input == Context::Neighborhood && self.first.contains(&target),
            Context::Neighborhood => {
                self.first.contains(&target)
                    || (input == Context::Neighborhood && self.second.contains(&target))
            }
            Context::Global => true,
        }
    }
}

/// Nodes a batch of movements can be observed from: the moved nodes,
/// their neighbours, and nodes whose neighbourhood changed.
pub fn movement_reach<T>(
    moved: impl IntoIterator<Item = NodeId>,
    neighborhood_changed: impl IntoIterator<Item = NodeId>,
    env: &Environment<T>,
) -> BTreeSet<NodeId> {
    let mut reach = BTreeSet::new();
    for n in moved {
        reach.insert(n);
        reach.extend(env.neighbors(n).iter().copied());
    }
    reach.extend(neighborhood_changed);
    reach
}

#[cfg(test)]
mod tests {
    use super::*;
    use brine_core::Position;
    use brine_space::ConnectWithinDistance;

    fn set(deps: &[Dependency]) -> DependencySet {
        deps.iter().cloned().collect()
    }

    fn mol(name: &str) -> Dependency {
        Dependency::Molecule(Molecule::from(name))
    }

    fn index() -> DependencyIndex {
        let mut idx = DependencyIndex::new();
        idx.insert(ReactionId(0), &set(&[mol("a")]));
        idx.insert(ReactionId(1), &set(&[mol("b")]));
        idx.insert(ReactionId(2), &set(&[Dependency::EveryMolecule]));
        idx.insert(ReactionId(3), &set(&[Dependency::Movement]));
        idx.insert(ReactionId(4), &set(&[Dependency::Everything]));
        idx.insert(ReactionId(5), &set(&[]));
        idx
    }

    fn ids(s: BTreeSet<ReactionId>) -> Vec<u64> {
        s.into_iter().map(|r| r.0).collect()
    }

    #[test]
    fn molecule_write_hits_readers_and_wildcards() {
        assert_eq!(ids(index().candidates(&set(&[mol("a")]))), [0, 2, 4]);
    }

    #[test]
    fn movement_write_skips_molecule_readers() {
        assert_eq!(ids(index().candidates(&set(&[Dependency::Movement]))), [3, 4]);
    }

    #[test]
    fn every_molecule_write_hits_all_molecule_readers() {
        assert_eq!(
            ids(index().candidates(&set(&[Dependency::EveryMolecule]))),
            [0, 1, 2, 4]
        );
    }

    #[test]
    fn everything_write_hits_all() {
        assert_eq!(
            ids(index().candidates(&set(&[Dependency::Everything]))),
            [0, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn empty_write_hits_nothing() {
        assert!(index().candidates(&DependencySet::empty()).is_empty());
    }

    #[test]
    fn remove_clears_buckets() {
        let mut idx = index();
        idx.remove(ReactionId(0), &set(&[mol("a")]));
        idx.remove(ReactionId(4), &set(&[Dependency::Everything]));
        assert_eq!(ids(idx.candidates(&set(&[mol("a")]))), [2]);
        assert_eq!(idx.len(), 4);
    }

    /// Nodes on a line at x = 0..5, linked to adjacent nodes.
    fn line() -> Environment<u32> {
        let mut env = Environment::new(1, ConnectWithinDistance::new(1.0).unwrap());
        for i in 0..5 {
            env.add_node(Position::from([i as f64])).unwrap();
        }
        env
    }

    #[test]
    fn local_scope() {
        let env = line();
        let scope = Scope::new(NodeId(2), Context::Local, env.neighbors(NodeId(2)), &env);
        assert!(scope.admits(NodeId(2), Context::Local));
        assert!(!scope.admits(NodeId(1), Context::Local));
        assert!(scope.admits(NodeId(1), Context::Neighborhood));
        assert!(!scope.admits(NodeId(0), Context::Neighborhood));
        assert!(scope.admits(NodeId(0), Context::Global));
    }

    #[test]
    fn neighborhood_scope() {
        let env = line();
        let scope = Scope::new(
            NodeId(2),
            Context::Neighborhood,
            env.neighbors(NodeId(2)),
            &env,
        );
        assert!(scope.admits(NodeId(1), Context::Local));
        assert!(scope.admits(NodeId(3), Context::Local));
        assert!(!scope.admits(NodeId(0), Context::Local));
        assert!(scope.admits(NodeId(0), Context::Neighborhood));
        assert!(scope.admits(NodeId(4), Context::Neighborhood));
    }

    #[test]
    fn global_scope_admits_everything() {
        let env = line();
        let scope = Scope::new(NodeId(0), Context::Global, &[], &env);
        assert!(scope.admits(NodeId(4), Context::Local));
    }

    #[test]
    fn movement_reach_includes_neighbours() {
        let env = line();
        let reach = movement_reach([NodeId(0)], [NodeId(4)], &env);
        let nodes: Vec<_> = reach.into_iter().map(|n| n.0).collect();
        assert_eq!(nodes, [0, 1, 4]);
    }
}
