//! Benchmark models for the brine simulation kernel.
//!
//! Provides pre-built [`Engine`] profiles for benchmarks:
//!
//! - [`lattice_profile`]: square lattice with diffusion on every node
//! - [`decay_profile`]: isolated nodes, each with an independent decay
//! - [`grid_positions`]: row-major positions of a square lattice

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use brine_core::{ConstructionError, Position};
use brine_engine::{Engine, EngineConfig};
use brine_reaction::{construction_error, Distribution, Reaction};
use brine_space::{ConnectWithinDistance, Environment, NoLinks};
use brine_test_utils::{ChangeConcentration, MoleculeAtLeast, TransferToNeighbor};

/// Molecule moved around by the benchmark models.
pub const SPECIES: &str = "A";

/// Positions of a `side x side` lattice with unit spacing, row-major.
pub fn grid_positions(side: usize) -> Vec<Position> {
    (0..side * side)
        .map(|i| Position::from([(i % side) as f64, (i / side) as f64]))
        .collect()
}

/// A `side x side` lattice (4-neighbour links) with `initial` units of
/// [`SPECIES`] per node and one diffusion reaction per node.
///
/// Every firing changes two nodes, so each step refreshes a handful of
/// reactions out of `side * side`.
pub fn lattice_profile(
    side: usize,
    initial: f64,
    seed: u64,
) -> Result<Engine<f64>, ConstructionError> {
    let linking = ConnectWithinDistance::new(1.0).map_err(construction_error)?;
    let mut env = Environment::new(2, linking);
    for position in grid_positions(side) {
        let node = env.add_node(position).map_err(construction_error)?;
        env.set_concentration(node, SPECIES.into(), initial)
            .map_err(construction_error)?;
    }
    let mut engine = engine_for(env, seed)?;
    let nodes: Vec<_> = engine.environment().node_ids().collect();
    for node in nodes {
        let (env, rng) = engine.parts_mut();
        let dist = Distribution::exponential(env.time(), 1.0, rng)?;
        let reaction = Reaction::new(node, dist)
            .with_condition(MoleculeAtLeast::new(node, SPECIES, 1.0))
            .with_action(TransferToNeighbor::new(node, SPECIES));
        engine.add_reaction(reaction)?;
    }
    Ok(engine)
}

/// `nodes` unlinked nodes, each with a first-order decay of [`SPECIES`].
///
/// No firing affects another node's reaction.
pub fn decay_profile(
    nodes: usize,
    initial: f64,
    seed: u64,
) -> Result<Engine<f64>, ConstructionError> {
    let mut env = Environment::new(1, NoLinks);
    for i in 0..nodes {
        let node = env
            .add_node(Position::from([i as f64]))
            .map_err(construction_error)?;
        env.set_concentration(node, SPECIES.into(), initial)
            .map_err(construction_error)?;
    }
    let mut engine = engine_for(env, seed)?;
    let ids: Vec<_> = engine.environment().node_ids().collect();
    for node in ids {
        let (env, rng) = engine.parts_mut();
        let dist = Distribution::exponential(env.time(), 0.5, rng)?;
        let reaction = Reaction::new(node, dist)
            .with_condition(MoleculeAtLeast::new(node, SPECIES, 1.0))
            .with_action(ChangeConcentration::new(node, SPECIES, -1.0));
        engine.add_reaction(reaction)?;
    }
    Ok(engine)
}

fn engine_for(env: Environment<f64>, seed: u64) -> Result<Engine<f64>, ConstructionError> {
    let config = EngineConfig {
        seed,
        ..EngineConfig::default()
    };
    Engine::new(env, config).map_err(|e| ConstructionError::InvalidParameter {
        parameter: "engine config".into(),
        reason: e.to_string(),
    })
}
