//! Dependencies, dependency sets, and spatial [`Context`].
//!
//! A reaction declares what it reads (the union of its conditions'
//! inbound dependencies) and what it writes (the union of its actions'
//! outbound dependencies). After a firing the scheduler re-evaluates
//! only reactions whose inbound set intersects the fired reaction's
//! outbound set, within the reach of the contexts involved.

use crate::id::Molecule;
use smallvec::SmallVec;
use std::fmt;

/// Spatial reach of a condition's read or an action's write.
///
/// Ordered from narrowest to widest: `Local < Neighborhood < Global`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Context {
    /// Only the hosting node.
    #[default]
    Local,
    /// The hosting node and its current neighbours.
    Neighborhood,
    /// Any node in the environment.
    Global,
}

impl Context {
    /// The wider of two contexts.
    pub fn widen(self, other: Context) -> Context {
        self.max(other)
    }

    /// The widest context in `contexts`, or [`Context::Local`] if empty.
    pub fn widest(contexts: impl IntoIterator<Item = Context>) -> Context {
        contexts.into_iter().fold(Context::Local, Context::widen)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Neighborhood => f.write_str("neighborhood"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// A symbolic piece of state a reaction reads or writes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dependency {
    /// A concrete molecule.
    Molecule(Molecule),
    /// Node positions and the neighbourhoods derived from them.
    Movement,
    /// Wildcard matching every molecule dependency (but not movement).
    EveryMolecule,
    /// Wildcard matching every dependency.
    Everything,
}

impl Dependency {
    /// Whether a write of `self` can affect a read of `other` (or vice
    /// versa; the relation is symmetric).
    pub fn matches(&self, other: &Dependency) -> bool {
        use Dependency::*;
        match (self, other) {
            (Everything, _) | (_, Everything) => true,
            (EveryMolecule, Molecule(_) | EveryMolecule) => true,
            (Molecule(_), EveryMolecule) => true,
            (Molecule(a), Molecule(b)) => a == b,
            (Movement, Movement) => true,
            _ => false,
        }
    }

    /// `true` for concrete molecules and the molecule wildcard.
    pub fn is_molecular(&self) -> bool {
        matches!(self, Dependency::Molecule(_) | Dependency::EveryMolecule)
    }
}

impl From<Molecule> for Dependency {
    fn from(m: Molecule) -> Self {
        Dependency::Molecule(m)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Molecule(m) => write!(f, "{m}"),
            Self::Movement => f.write_str("<movement>"),
            Self::EveryMolecule => f.write_str("<every molecule>"),
            Self::Everything => f.write_str("<everything>"),
        }
    }
}

/// A set of [`Dependency`] values with wildcard absorption.
///
/// - Once [`Dependency::Everything`] is present, the set is exactly
///   `{Everything}` and further inserts are no-ops.
/// - Once [`Dependency::EveryMolecule`] is present, concrete molecules
///   (already present or added later) are absorbed into it.
///
/// Concrete molecules are kept sorted, so iteration order is
/// deterministic and independent of insertion order.
///
/// # Examples
///
/// ```
/// use brine_core::{Dependency, DependencySet, Molecule};
///
/// let mut reads = DependencySet::empty();
/// reads.insert(Molecule::from("A").into());
/// let writes: DependencySet = [Dependency::EveryMolecule].into_iter().collect();
/// assert!(reads.intersects(&writes));
/// assert!(!reads.intersects(&[Dependency::Movement].into_iter().collect()));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencySet {
    everything: bool,
    every_molecule: bool,
    movement: bool,
    molecules: SmallVec<[Molecule; 4]>,
}

impl DependencySet {
    /// Create an empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A set containing only [`Dependency::Everything`].
    pub fn everything() -> Self {
        Self {
            everything: true,
            ..Self::default()
        }
    }

    /// Insert a dependency, applying wildcard absorption.
    pub fn insert(&mut self, dep: Dependency) {
        if self.everything {
            return;
        }
        match dep {
            Dependency::Everything => {
                *self = Self::everything();
            }
            Dependency::EveryMolecule => {
                self.every_molecule = true;
                self.molecules.clear();
            }
            Dependency::Movement => self.movement = true,
            Dependency::Molecule(m) => {
                if self.every_molecule {
                    return;
                }
                if let Err(pos) = self.molecules.binary_search(&m) {
                    self.molecules.insert(pos, m);
                }
            }
        }
    }

    /// Whether `dep` is literally present (no wildcard matching, except
    /// that an absorbing wildcard reports its absorbed entries).
    pub fn contains(&self, dep: &Dependency) -> bool {
        if self.everything {
            return true;
        }
        match dep {
            Dependency::Everything => false,
            Dependency::EveryMolecule => self.every_molecule,
            Dependency::Movement => self.movement,
            Dependency::Molecule(m) => {
                self.every_molecule || self.molecules.binary_search(m).is_ok()
            }
        }
    }

    /// Whether any dependency in `self` matches any in `other`.
    pub fn intersects(&self, other: &DependencySet) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.everything || other.everything {
            return true;
        }
        if self.movement && other.movement {
            return true;
        }
        let self_molecular = self.every_molecule || !self.molecules.is_empty();
        let other_molecular = other.every_molecule || !other.molecules.is_empty();
        if (self.every_molecule && other_molecular) || (other.every_molecule && self_molecular) {
            return true;
        }
        // Both molecule lists are sorted: merge-walk them.
        let (mut i, mut j) = (0, 0);
        while i < self.molecules.len() && j < other.molecules.len() {
            match self.molecules[i].cmp(&other.molecules[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// Return the union of two sets.
    pub fn union(&self, other: &DependencySet) -> DependencySet {
        let mut out = self.clone();
        for dep in other.iter() {
            out.insert(dep);
        }
        out
    }

    /// `true` if any entry is a molecule or the molecule wildcard.
    pub fn has_molecular(&self) -> bool {
        self.everything || self.every_molecule || !self.molecules.is_empty()
    }

    /// Returns `true` if the set holds no dependency at all.
    pub fn is_empty(&self) -> bool {
        !self.everything && !self.every_molecule && !self.movement && self.molecules.is_empty()
    }

    /// Number of entries after absorption.
    pub fn len(&self) -> usize {
        if self.everything {
            return 1;
        }
        usize::from(self.every_molecule) + usize::from(self.movement) + self.molecules.len()
    }

    /// Iterate over the entries: wildcards first, then molecules in
    /// ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = Dependency> + '_ {
        let everything = self.everything.then_some(Dependency::Everything);
        let every_molecule = self.every_molecule.then_some(Dependency::EveryMolecule);
        let movement = self.movement.then_some(Dependency::Movement);
        everything
            .into_iter()
            .chain(every_molecule)
            .chain(movement)
            .chain(self.molecules.iter().cloned().map(Dependency::Molecule))
    }
}

impl FromIterator<Dependency> for DependencySet {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> Self {
        let mut set = Self::empty();
        for dep in iter {
            set.insert(dep);
        }
        set
    }
}

impl Extend<Dependency> for DependencySet {
    fn extend<I: IntoIterator<Item = Dependency>>(&mut self, iter: I) {
        for dep in iter {
            self.insert(dep);
        }
    }
}
