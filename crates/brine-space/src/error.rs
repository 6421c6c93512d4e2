//! Error types for environment operations.

use brine_core::NodeId;
use std::fmt;

/// Errors arising from environment construction or node manipulation.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentError {
    /// The node does not exist (never created, or already removed).
    UnknownNode {
        /// The missing node.
        node: NodeId,
    },
    /// A position has the wrong number of coordinates.
    DimensionMismatch {
        /// Dimensions of the environment.
        expected: usize,
        /// Dimensions of the rejected position.
        got: usize,
    },
    /// A linking range is NaN, infinite, or negative.
    InvalidRange {
        /// The rejected value.
        value: f64,
    },
    /// A position has a NaN or infinite coordinate.
    NonFinitePosition,
}

impl fmt::Display for EnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node } => write!(f, "unknown node {node}"),
            Self::DimensionMismatch { expected, got } => {
                write!(f, "position has {got} dimensions, environment has {expected}")
            }
            Self::InvalidRange { value } => {
                write!(f, "linking range must be finite and non-negative, got {value}")
            }
            Self::NonFinitePosition => write!(f, "position coordinates must be finite"),
        }
    }
}

impl std::error::Error for EnvironmentError {}
