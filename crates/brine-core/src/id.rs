//! Strongly-typed identifiers, the [`Molecule`] key, and [`Position`].

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Identifies a node within an environment.
///
/// Assigned from a monotonic counter when the node is created and never
/// reused while the environment lives, even after the node is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a reaction scheduled on an engine.
///
/// Ids grow with creation order. The scheduler uses them as the
/// tie-break between reactions with equal firing times, so the lower
/// (older) id always wins a tie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactionId(pub u64);

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl From<u64> for ReactionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// A named piece of node state that carries a concentration.
///
/// Molecules compare, hash, and order by name. Cloning is a reference
/// count bump, so molecules can be stored freely in dependency sets and
/// concentration tables.
///
/// # Examples
///
/// ```
/// use brine_core::Molecule;
///
/// let a = Molecule::new("A");
/// assert_eq!(a, Molecule::from("A"));
/// assert_eq!(a.name(), "A");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Molecule(Arc<str>);

impl Molecule {
    /// Create a molecule with the given name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The molecule's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Molecule({})", self.0)
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Molecule {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A point in continuous simulation space.
///
/// Uses `SmallVec<[f64; 3]>` so positions up to three dimensions stay
/// inline. Higher-dimensional positions spill to the heap transparently.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Position(SmallVec<[f64; 3]>);

impl Position {
    /// Build a position from its coordinates.
    pub fn new(coords: impl IntoIterator<Item = f64>) -> Self {
        Self(coords.into_iter().collect())
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// The coordinates, in axis order.
    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance to `other`.
    ///
    /// Missing trailing coordinates are treated as zero, so comparing
    /// positions of different dimensionality is well defined.
    pub fn distance(&self, other: &Position) -> f64 {
        let n = self.0.len().max(other.0.len());
        (0..n)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0.0);
                let b = other.0.get(i).copied().unwrap_or(0.0);
                (a - b) * (a - b)
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl<const N: usize> From<[f64; N]> for Position {
    fn from(coords: [f64; N]) -> Self {
        Self::new(coords)
    }
}
