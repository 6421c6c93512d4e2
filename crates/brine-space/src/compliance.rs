//! Linking rule and environment compliance test helpers.
//!
//! Reused by the linking rule tests and the environment tests to check
//! the invariants every [`LinkingRule`] and every [`Environment`] must
//! uphold.

use crate::environment::Environment;
use crate::linking::LinkingRule;
use brine_core::{NodeId, Position};

/// Assert that `linked(a, b) == linked(b, a)` for all pairs.
pub fn assert_symmetric(rule: &dyn LinkingRule, nodes: &[(NodeId, Position)]) {
    for (a, pa) in nodes {
        for (b, pb) in nodes {
            assert_eq!(
                rule.linked(*a, pa, *b, pb),
                rule.linked(*b, pb, *a, pa),
                "{} is not symmetric for ({a}, {b})",
                rule.name()
            );
        }
    }
}

/// Assert that no node is linked to itself.
pub fn assert_irreflexive(rule: &dyn LinkingRule, nodes: &[(NodeId, Position)]) {
    for (a, pa) in nodes {
        assert!(
            !rule.linked(*a, pa, *a, pa),
            "{} links {a} to itself",
            rule.name()
        );
    }
}

/// Assert that two evaluations of every pair agree.
pub fn assert_deterministic(rule: &dyn LinkingRule, nodes: &[(NodeId, Position)]) {
    for (a, pa) in nodes {
        for (b, pb) in nodes {
            assert_eq!(
                rule.linked(*a, pa, *b, pb),
                rule.linked(*a, pa, *b, pb),
                "{} is non-deterministic for ({a}, {b})",
                rule.name()
            );
        }
    }
}

/// Run every rule-level check.
pub fn run_full_compliance(rule: &dyn LinkingRule, nodes: &[(NodeId, Position)]) {
    assert_symmetric(rule, nodes);
    assert_irreflexive(rule, nodes);
    assert_deterministic(rule, nodes);
}

/// Assert that the environment's cached neighbourhoods are exactly what
/// its linking rule says, sorted, and symmetric.
pub fn assert_neighborhoods_consistent<T>(env: &Environment<T>) {
    let ids: Vec<NodeId> = env.node_ids().collect();
    for &a in &ids {
        let pa = env.position(a).expect("live node has a position");
        let cached = env.neighbors(a);
        assert!(
            cached.windows(2).all(|w| w[0] < w[1]),
            "N({a}) = {cached:?} is not sorted and unique"
        );
        for &b in &ids {
            let pb = env.position(b).expect("live node has a position");
            let expected = env.linking_rule().linked(a, pa, b, pb);
            assert_eq!(
                cached.contains(&b),
                expected,
                "cached N({a}) disagrees with the linking rule about {b}"
            );
            if expected {
                assert!(
                    env.neighbors(b).contains(&a),
                    "neighbour symmetry violated: {b} in N({a}) but not the reverse"
                );
            }
        }
    }
}
