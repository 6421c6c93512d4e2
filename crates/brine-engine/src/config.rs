//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use brine_core::Time;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`] or while
/// bringing up an engine.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `end_time` is NaN, infinite, or negative.
    InvalidEndTime {
        /// The invalid value.
        value: f64,
    },
    /// `end_step` is zero, so nothing could ever run.
    ZeroEndStep,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEndTime { value } => {
                write!(f, "end_time must be finite and non-negative, got {value}")
            }
            Self::ZeroEndStep => write!(f, "end_step must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

// ── EngineConfig ───────────────────────────────────────────────────

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Seed for the simulation RNG. Same seed, same model, same
    /// trajectory. Default: 0.
    pub seed: u64,
    /// Stop before firing anything scheduled after this time.
    /// Default: `None` (no limit).
    pub end_time: Option<Time>,
    /// Stop once this many steps have completed. Default: `None`.
    pub end_step: Option<u64>,
    /// Expected number of reactions refreshed per firing; pre-sizes the
    /// refresh buffers. Default: 16.
    pub max_dependents_hint: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            end_time: None,
            end_step: None,
            max_dependents_hint: 16,
        }
    }
}

impl EngineConfig {
    /// Configuration with the given seed and no limits.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(end) = self.end_time {
            let value = end.as_f64();
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidEndTime { value });
            }
        }
        if self.end_step == Some(0) {
            return Err(ConfigError::ZeroEndStep);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_end_time() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let cfg = EngineConfig {
                end_time: Some(Time::new(bad)),
                ..EngineConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidEndTime { .. })
            ));
        }
        let cfg = EngineConfig {
            end_time: Some(Time::ZERO),
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_zero_end_step() {
        let cfg = EngineConfig {
            end_step: Some(0),
            ..EngineConfig::with_seed(3)
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroEndStep));
    }
}
