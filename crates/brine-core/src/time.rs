//! Simulated time.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// A point on the simulated time axis.
///
/// Wraps an `f64` and imposes a total order through [`f64::total_cmp`],
/// so `Time` can key ordered collections directly. [`Time::INFINITY`]
/// means "never": a reaction whose next occurrence is infinite will not
/// fire until some dependency change makes it schedulable again.
///
/// # Examples
///
/// ```
/// use brine_core::Time;
///
/// let t = Time::new(1.5) + 0.5;
/// assert_eq!(t, Time::new(2.0));
/// assert!(t < Time::INFINITY);
/// assert!(!Time::INFINITY.is_finite());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Time(f64);

impl Time {
    /// The origin of every simulation.
    pub const ZERO: Time = Time(0.0);

    /// "Never".
    pub const INFINITY: Time = Time(f64::INFINITY);

    /// Wrap a raw value.
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// The raw value.
    pub const fn as_f64(self) -> f64 {
        self.0
    }

    /// `true` unless this is infinite or NaN.
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// The later of two times.
    pub fn max(self, other: Time) -> Time {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// The earlier of two times.
    pub fn min(self, other: Time) -> Time {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        // 0.0 and -0.0 are the same instant.
        if self.0 == other.0 {
            Ordering::Equal
        } else {
            self.0.total_cmp(&other.0)
        }
    }
}

impl Add<f64> for Time {
    type Output = Time;

    fn add(self, rhs: f64) -> Time {
        Time(self.0 + rhs)
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl Sub for Time {
    type Output = f64;

    fn sub(self, rhs: Time) -> f64 {
        self.0 - rhs.0
    }
}

impl From<f64> for Time {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_infinite() && self.0 > 0.0 {
            f.write_str("inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
