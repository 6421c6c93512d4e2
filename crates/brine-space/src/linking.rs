//! Neighbourhood linking rules.

use crate::error::EnvironmentError;
use brine_core::{NodeId, Position};
use indexmap::IndexSet;
use std::fmt;

/// Decides which pairs of nodes are neighbours.
///
/// The environment asks the rule about each pair whenever a node is
/// added or moved, and caches the result. Implementations must be:
///
/// - symmetric: `linked(a, b) == linked(b, a)`
/// - irreflexive: a node is never its own neighbour
/// - deterministic: the same inputs always give the same answer
///
/// `Send + Sync` so an environment can move onto the engine thread.
pub trait LinkingRule: fmt::Debug + Send + Sync + 'static {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Whether nodes `a` (at `pa`) and `b` (at `pb`) are neighbours.
    fn linked(&self, a: NodeId, pa: &Position, b: NodeId, pb: &Position) -> bool;

    /// Clone into a new boxed rule.
    fn clone_boxed(&self) -> Box<dyn LinkingRule>;
}

impl Clone for Box<dyn LinkingRule> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Links every pair of distinct nodes whose Euclidean distance is at most
/// `range`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectWithinDistance {
    range: f64,
}

impl ConnectWithinDistance {
    /// Create a rule with the given range.
    ///
    /// Returns `Err(InvalidRange)` if `range` is NaN, infinite, or negative.
    pub fn new(range: f64) -> Result<Self, EnvironmentError> {
        if !range.is_finite() || range < 0.0 {
            return Err(EnvironmentError::InvalidRange { value: range });
        }
        Ok(Self { range })
    }

    /// The linking range.
    pub fn range(&self) -> f64 {
        self.range
    }
}

impl LinkingRule for ConnectWithinDistance {
    fn name(&self) -> &str {
        "ConnectWithinDistance"
    }

    fn linked(&self, a: NodeId, pa: &Position, b: NodeId, pb: &Position) -> bool {
        a != b && pa.distance(pb) <= self.range
    }

    fn clone_boxed(&self) -> Box<dyn LinkingRule> {
        Box::new(self.clone())
    }
}

/// Links an explicit, fixed list of node pairs regardless of position.
///
/// Pairs are stored unordered, so `link(a, b)` and `link(b, a)` are the
/// same link.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExplicitLinks {
    pairs: IndexSet<(NodeId, NodeId)>,
}

impl ExplicitLinks {
    /// An empty link list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link between `a` and `b`. Self-links are ignored.
    pub fn link(mut self, a: NodeId, b: NodeId) -> Self {
        if a != b {
            self.pairs.insert(Self::key(a, b));
        }
        self
    }

    /// Number of distinct links.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// `true` if no links are defined.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

impl FromIterator<(NodeId, NodeId)> for ExplicitLinks {
    fn from_iter<I: IntoIterator<Item = (NodeId, NodeId)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |links, (a, b)| links.link(a, b))
    }
}

impl LinkingRule for ExplicitLinks {
    fn name(&self) -> &str {
        "ExplicitLinks"
    }

    fn linked(&self, a: NodeId, _pa: &Position, b: NodeId, _pb: &Position) -> bool {
        a != b && self.pairs.contains(&Self::key(a, b))
    }

    fn clone_boxed(&self) -> Box<dyn LinkingRule> {
        Box::new(self.clone())
    }
}

/// No node has any neighbour.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoLinks;

impl LinkingRule for NoLinks {
    fn name(&self) -> &str {
        "NoLinks"
    }

    fn linked(&self, _a: NodeId, _pa: &Position, _b: NodeId, _pb: &Position) -> bool {
        false
    }

    fn clone_boxed(&self) -> Box<dyn LinkingRule> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use proptest::prelude::*;

    fn grid(n: u64) -> Vec<(NodeId, Position)> {
        (0..n)
            .map(|i| (NodeId(i), Position::from([(i % 4) as f64, (i / 4) as f64])))
            .collect()
    }

    #[test]
    fn within_distance_rejects_bad_range() {
        assert!(ConnectWithinDistance::new(-1.0).is_err());
        assert!(ConnectWithinDistance::new(f64::NAN).is_err());
        assert!(ConnectWithinDistance::new(f64::INFINITY).is_err());
        assert!(ConnectWithinDistance::new(0.0).is_ok());
    }

    #[test]
    fn within_distance_is_compliant() {
        let rule = ConnectWithinDistance::new(1.0).unwrap();
        compliance::run_full_compliance(&rule, &grid(12));
    }

    #[test]
    fn within_distance_links_orthogonal_grid_neighbours() {
        let rule = ConnectWithinDistance::new(1.0).unwrap();
        let nodes = grid(8);
        let (a, pa) = &nodes[0];
        let (b, pb) = &nodes[1];
        let (c, pc) = &nodes[5];
        assert!(rule.linked(*a, pa, *b, pb));
        assert!(!rule.linked(*a, pa, *c, pc));
    }

    #[test]
    fn explicit_links_are_unordered() {
        let rule = ExplicitLinks::new()
            .link(NodeId(2), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(3), NodeId(3));
        assert_eq!(rule.len(), 1);
        let p = Position::from([0.0]);
        assert!(rule.linked(NodeId(1), &p, NodeId(2), &p));
        assert!(rule.linked(NodeId(2), &p, NodeId(1), &p));
        assert!(!rule.linked(NodeId(3), &p, NodeId(3), &p));
        compliance::run_full_compliance(&rule, &grid(6));
    }

    #[test]
    fn no_links_is_compliant() {
        compliance::run_full_compliance(&NoLinks, &grid(5));
    }

    proptest! {
        #[test]
        fn within_distance_symmetric_for_random_points(
            xs in proptest::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 2..12),
            range in 0.0f64..5.0,
        ) {
            let rule = ConnectWithinDistance::new(range).unwrap();
            let nodes: Vec<_> = xs
                .into_iter()
                .enumerate()
                .map(|(i, (x, y))| (NodeId(i as u64), Position::from([x, y])))
                .collect();
            compliance::assert_symmetric(&rule, &nodes);
            compliance::assert_irreflexive(&rule, &nodes);
        }
    }
}
