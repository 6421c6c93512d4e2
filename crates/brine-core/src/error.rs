//! Error types for the brine simulator.
//!
//! Organised by when they surface: construction errors are returned
//! synchronously to whoever builds reactions, reaction errors are raised
//! by conditions and actions while the engine runs, and step errors are
//! what the engine reports when a firing cannot complete.

use crate::id::{NodeId, ReactionId};
use crate::time::Time;
use std::error::Error;
use std::fmt;

/// Errors raised while building nodes, reactions, conditions, actions,
/// or time distributions.
///
/// These are always returned at creation time, never deferred into the
/// running loop.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstructionError {
    /// A rate parameter is NaN, infinite, zero, or negative.
    InvalidRate {
        /// The rejected value.
        value: f64,
    },
    /// A start time is not finite.
    InvalidStartTime {
        /// The rejected value.
        value: f64,
    },
    /// A textual parameter could not be parsed.
    InvalidParameter {
        /// The offending text.
        parameter: String,
        /// What was wrong with it.
        reason: String,
    },
    /// The referenced node does not exist.
    UnknownNode {
        /// The missing node.
        node: NodeId,
    },
    /// The requested capability cannot be provided in the current state,
    /// e.g. a program that needs an action kind nothing supplies.
    UnsupportedCapability {
        /// Description of what was requested.
        reason: String,
    },
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRate { value } => {
                write!(f, "rate must be finite and strictly positive, got {value}")
            }
            Self::InvalidStartTime { value } => {
                write!(f, "start time must be finite, got {value}")
            }
            Self::InvalidParameter { parameter, reason } => {
                write!(f, "invalid parameter '{parameter}': {reason}")
            }
            Self::UnknownNode { node } => write!(f, "unknown node {node}"),
            Self::UnsupportedCapability { reason } => {
                write!(f, "unsupported capability: {reason}")
            }
        }
    }
}

impl Error for ConstructionError {}

/// Errors raised by a condition or an action while the engine runs.
///
/// Wrapped in [`StepError`] by the engine, together with the id of the
/// reaction that raised it.
#[derive(Clone, Debug, PartialEq)]
pub enum ReactionError {
    /// The condition or action failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A node the condition or action is bound to no longer exists.
    MissingNode {
        /// The missing node.
        node: NodeId,
    },
    /// A model-level constraint was violated.
    ConstraintViolation {
        /// Description of the violated constraint.
        constraint: String,
    },
}

impl fmt::Display for ReactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::MissingNode { node } => write!(f, "node {node} does not exist"),
            Self::ConstraintViolation { constraint } => {
                write!(f, "constraint violation: {constraint}")
            }
        }
    }
}

impl Error for ReactionError {}

/// Errors from the scheduler during a single step.
///
/// Any of these terminates a running simulation; the queue is left as it
/// was before the failing firing so it can be inspected.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A condition failed while checking guards or computing propensities.
    ConditionFailed {
        /// The reaction whose condition failed.
        reaction: ReactionId,
        /// The underlying error.
        reason: ReactionError,
    },
    /// An action failed while executing.
    ActionFailed {
        /// The reaction whose action failed.
        reaction: ReactionId,
        /// The underlying error.
        reason: ReactionError,
    },
    /// An output monitor reported a failure.
    MonitorFailed {
        /// Description reported by the monitor.
        reason: String,
    },
    /// The next reaction is scheduled before the current time.
    TimeReversal {
        /// The offending reaction.
        reaction: ReactionId,
        /// Its scheduled time.
        tau: Time,
        /// The current simulated time.
        now: Time,
    },
    /// A structural change referenced a reaction that does not exist.
    UnknownReaction {
        /// The missing reaction.
        reaction: ReactionId,
    },
    /// A structural change referenced a node that does not exist.
    UnknownNode {
        /// The missing node.
        node: NodeId,
    },
    /// A reaction or monitor panicked on the engine thread.
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionFailed { reaction, reason } => {
                write!(f, "condition of {reaction} failed: {reason}")
            }
            Self::ActionFailed { reaction, reason } => {
                write!(f, "action of {reaction} failed: {reason}")
            }
            Self::MonitorFailed { reason } => write!(f, "output monitor failed: {reason}"),
            Self::TimeReversal { reaction, tau, now } => {
                write!(f, "{reaction} scheduled at {tau}, before current time {now}")
            }
            Self::UnknownReaction { reaction } => write!(f, "unknown reaction {reaction}"),
            Self::UnknownNode { node } => write!(f, "unknown node {node}"),
            Self::Panicked { message } => write!(f, "panicked: {message}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConditionFailed { reason, .. } | Self::ActionFailed { reason, .. } => {
                Some(reason)
            }
            _ => None,
        }
    }
}
