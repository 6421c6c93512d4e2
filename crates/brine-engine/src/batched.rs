//! Independent replicates of one model, run in parallel.
//!
//! [`ReplicateBatch`] owns N [`Engine`]s with distinct seeds and drives
//! each to the same [`RunGoal`] on its own scoped thread. Replicates
//! share no mutable state, so the outcome of replicate `i` depends only
//! on its own seed.

use std::collections::BTreeSet;
use std::fmt;
use std::thread;

use brine_core::{ConstructionError, StepError};
use brine_space::Environment;

use crate::config::{ConfigError, EngineConfig};
use crate::engine::{Engine, RunGoal, RunOutcome};

// ── Error type ──────────────────────────────────────────────────

/// Error from a batch operation, annotated with the failing replicate.
#[derive(Debug, PartialEq)]
pub enum BatchError {
    /// A replicate's step failed.
    Step {
        /// Index of the replicate that failed (0-based).
        replicate_index: usize,
        /// The underlying step error.
        error: StepError,
    },
    /// Building a replicate's model failed.
    Construction {
        /// Index of the replicate that failed (0-based).
        replicate_index: usize,
        /// The underlying construction error.
        error: ConstructionError,
    },
    /// Configuration error during construction.
    Config(ConfigError),
    /// Batch-level argument validation failed.
    InvalidArgument {
        /// Human-readable description of what's wrong.
        reason: String,
    },
    /// A replicate's thread panicked.
    Panicked {
        /// Index of the replicate that panicked (0-based).
        replicate_index: usize,
    },
    /// A replicate's thread could not be spawned.
    SpawnFailed {
        /// The OS error.
        reason: String,
    },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step {
                replicate_index,
                error,
            } => write!(f, "replicate {replicate_index}: step failed: {error}"),
            Self::Construction {
                replicate_index,
                error,
            } => write!(f, "replicate {replicate_index}: construction failed: {error}"),
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::Panicked { replicate_index } => {
                write!(f, "replicate {replicate_index} panicked")
            }
            Self::SpawnFailed { reason } => {
                write!(f, "failed to spawn replicate thread: {reason}")
            }
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Step { error, .. } => Some(error),
            Self::Construction { error, .. } => Some(error),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for BatchError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ── ReplicateBatch ──────────────────────────────────────────────

/// A set of independent engines stepped to a common goal.
///
/// # Examples
///
/// ```
/// use brine_core::Time;
/// use brine_engine::{EngineConfig, ReplicateBatch, RunGoal};
/// use brine_reaction::{Distribution, Reaction};
/// use brine_space::{Environment, NoLinks};
///
/// let mut batch = ReplicateBatch::from_seeds(
///     EngineConfig::default(),
///     &[1, 2, 3],
///     |_| Environment::<f64>::new(1, NoLinks),
///     |engine| {
///         let node = engine.environment_mut().add_node([0.0].into()).unwrap();
///         engine.add_reaction(Reaction::new(node, Distribution::trigger(Time::ZERO)?))?;
///         Ok(())
///     },
/// )
/// .unwrap();
/// let outcomes = batch.run(RunGoal::Quiescence).unwrap();
/// assert_eq!(outcomes.len(), 3);
/// ```
pub struct ReplicateBatch<T> {
    engines: Vec<Engine<T>>,
}

impl<T: Clone + Send + 'static> ReplicateBatch<T> {
    /// Wrap pre-built engines.
    ///
    /// Fails on an empty batch or if two engines share a seed.
    pub fn new(engines: Vec<Engine<T>>) -> Result<Self, BatchError> {
        if engines.is_empty() {
            return Err(BatchError::InvalidArgument {
                reason: "a batch needs at least one replicate".into(),
            });
        }
        let mut seeds = BTreeSet::new();
        for engine in &engines {
            let seed = engine.config().seed;
            if !seeds.insert(seed) {
                return Err(BatchError::InvalidArgument {
                    reason: format!("seed {seed} is used by more than one replicate"),
                });
            }
        }
        Ok(Self { engines })
    }

    /// Build one engine per seed from a shared configuration.
    ///
    /// `environment` creates each replicate's environment and `populate`
    /// adds its reactions.
    pub fn from_seeds<E, P>(
        config: EngineConfig,
        seeds: &[u64],
        mut environment: E,
        mut populate: P,
    ) -> Result<Self, BatchError>
    where
        E: FnMut(u64) -> Environment<T>,
        P: FnMut(&mut Engine<T>) -> Result<(), ConstructionError>,
    {
        let mut engines = Vec::with_capacity(seeds.len());
        for (i, &seed) in seeds.iter().enumerate() {
            let cfg = EngineConfig {
                seed,
                ..config.clone()
            };
            let mut engine = Engine::new(environment(seed), cfg)?;
            populate(&mut engine).map_err(|error| BatchError::Construction {
                replicate_index: i,
                error,
            })?;
            engines.push(engine);
        }
        Self::new(engines)
    }

    /// Drive every replicate to `goal`, one thread per replicate.
    ///
    /// Returns the outcomes in replicate order, or the error of the
    /// lowest-indexed failing replicate. Replicates that did not fail
    /// keep their progress either way.
    pub fn run(&mut self, goal: RunGoal) -> Result<Vec<RunOutcome>, BatchError> {
        let results = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.engines.len());
            for (i, engine) in self.engines.iter_mut().enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("brine-replicate-{i}"))
                    .spawn_scoped(scope, move || engine.run_until(goal))
                    .map_err(|e| BatchError::SpawnFailed {
                        reason: e.to_string(),
                    });
                handles.push(handle);
            }
            handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| match handle?.join() {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(error)) => Err(BatchError::Step {
                        replicate_index: i,
                        error,
                    }),
                    Err(_) => Err(BatchError::Panicked { replicate_index: i }),
                })
                .collect::<Vec<_>>()
        });
        results.into_iter().collect()
    }

    /// Number of replicates.
    pub fn num_replicates(&self) -> usize {
        self.engines.len()
    }

    /// The replicate at `index`.
    pub fn engine(&self, index: usize) -> Option<&Engine<T>> {
        self.engines.get(index)
    }

    /// All replicates, in order.
    pub fn engines(&self) -> &[Engine<T>] {
        &self.engines
    }

    /// Take the engines back.
    pub fn into_engines(self) -> Vec<Engine<T>> {
        self.engines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FinishReason;
    use brine_core::Time;
    use brine_reaction::{construction_error, Distribution, Reaction};
    use brine_space::NoLinks;

    fn build(config: EngineConfig, seeds: &[u64]) -> Result<ReplicateBatch<f64>, BatchError> {
        ReplicateBatch::from_seeds(
            config,
            seeds,
            |_| Environment::new(1, NoLinks),
            |engine| {
                let node = engine
                    .environment_mut()
                    .add_node([0.0].into())
                    .map_err(construction_error)?;
                let (env, rng) = engine.parts_mut();
                let dist = Distribution::exponential(env.time(), 2.0, rng)?;
                engine.add_reaction(Reaction::new(node, dist))?;
                Ok(())
            },
        )
    }

    #[test]
    fn empty_batch_rejected() {
        let err = ReplicateBatch::<f64>::new(Vec::new()).err().unwrap();
        assert!(matches!(err, BatchError::InvalidArgument { .. }));
    }

    #[test]
    fn duplicate_seeds_rejected() {
        let err = build(EngineConfig::default(), &[7, 7]).err().unwrap();
        assert!(matches!(err, BatchError::InvalidArgument { .. }));
    }

    #[test]
    fn invalid_config_surfaces() {
        let config = EngineConfig {
            end_step: Some(0),
            ..EngineConfig::default()
        };
        let err = build(config, &[1]).err().unwrap();
        assert_eq!(err, BatchError::Config(ConfigError::ZeroEndStep));
    }

    #[test]
    fn replicates_reach_goal_independently() {
        let mut batch = build(EngineConfig::default(), &[1, 2, 3, 4]).unwrap();
        let outcomes = batch.run(RunGoal::Step(25)).unwrap();
        assert_eq!(outcomes, vec![RunOutcome::GoalReached; 4]);
        for engine in batch.engines() {
            assert_eq!(engine.current_step(), 25);
        }
        let times: Vec<Time> = batch.engines().iter().map(|e| e.time()).collect();
        assert_ne!(times[0], times[1]);
    }

    #[test]
    fn same_seed_replays_identically() {
        let mut a = build(EngineConfig::default(), &[9]).unwrap();
        let mut b = build(EngineConfig::default(), &[9]).unwrap();
        a.run(RunGoal::Step(50)).unwrap();
        b.run(RunGoal::Step(50)).unwrap();
        assert_eq!(a.engine(0).unwrap().time(), b.engine(0).unwrap().time());
    }

    #[test]
    fn end_step_finishes_every_replicate() {
        let config = EngineConfig {
            end_step: Some(10),
            ..EngineConfig::default()
        };
        let mut batch = build(config, &[1, 2]).unwrap();
        let outcomes = batch.run(RunGoal::Quiescence).unwrap();
        assert_eq!(
            outcomes,
            vec![RunOutcome::Finished(FinishReason::EndStep); 2]
        );
        assert_eq!(batch.into_engines().len(), 2);
    }
}
