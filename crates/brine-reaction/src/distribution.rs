//! Time distributions: when does a reaction fire next?
//!
//! The three built-in policies live in the [`Distribution`] enum so the
//! engine's hot loop dispatches with a `match`; anything else plugs in
//! through [`Distribution::Custom`] and the [`TimeDistribution`] trait.
//!
//! Every policy has a start time. Until the simulated clock reaches it,
//! updates behave as if the clock read exactly `start`.

use brine_core::{ConstructionError, Time};
use brine_space::Environment;
use rand::Rng;
use std::fmt;

/// The random number generator threaded through every stochastic choice.
///
/// Seeded once from the engine configuration; it is the only source of
/// randomness a simulation has.
pub type SimRng = rand_chacha::ChaCha8Rng;

/// An open time-distribution policy.
///
/// # Contract
///
/// - `next_occurrence()` is a pure read and never decreases except
///   through `update`.
/// - `update()` never sets the next occurrence below `max(now, start)`.
/// - `rate()` is the nominal rate; `f64::INFINITY` marks one-shot events.
pub trait TimeDistribution<T>: Send + 'static {
    /// The next time the owning reaction should fire.
    fn next_occurrence(&self) -> Time;

    /// The nominal rate of this distribution.
    fn rate(&self) -> f64;

    /// The start time.
    fn start(&self) -> Time;

    /// Recompute the next occurrence.
    ///
    /// `executed` is `true` right after the owning reaction fired, and
    /// `false` when a dependency changed without a firing. `rate_hint` is
    /// the owning reaction's current propensity.
    fn update(
        &mut self,
        now: Time,
        executed: bool,
        rate_hint: f64,
        env: &Environment<T>,
        rng: &mut SimRng,
    );

    /// Clone into a new boxed distribution.
    fn clone_boxed(&self) -> Box<dyn TimeDistribution<T>>;

    /// An independent copy for a reaction created at `now`, such as one
    /// cloned onto a new node.
    ///
    /// Default: [`clone_boxed`](Self::clone_boxed).
    fn clone_at(&self, now: Time, rng: &mut SimRng) -> Box<dyn TimeDistribution<T>> {
        let _ = (now, rng);
        self.clone_boxed()
    }
}

fn check_rate(rate: f64) -> Result<f64, ConstructionError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(ConstructionError::InvalidRate { value: rate })
    }
}

fn check_start(start: Time) -> Result<Time, ConstructionError> {
    if start.is_finite() {
        Ok(start)
    } else {
        Err(ConstructionError::InvalidStartTime {
            value: start.as_f64(),
        })
    }
}

/// One sample from Exp(rate), by inversion.
fn sample_exponential(rate: f64, rng: &mut SimRng) -> f64 {
    let u: f64 = rng.random();
    -(1.0 - u).ln() / rate
}

// ── DiracComb ───────────────────────────────────────────────────

/// Fires at `start`, then every `1 / rate` after each firing.
///
/// Ignores the rate hint: a periodic event keeps its period regardless
/// of propensity.
#[derive(Clone, Debug, PartialEq)]
pub struct DiracComb {
    start: Time,
    rate: f64,
    tau: Time,
}

impl DiracComb {
    /// Build a comb. Fails on a non-positive or non-finite rate, or a
    /// non-finite start.
    pub fn new(start: Time, rate: f64) -> Result<Self, ConstructionError> {
        let start = check_start(start)?;
        let rate = check_rate(rate)?;
        Ok(Self {
            start,
            rate,
            tau: start,
        })
    }

    /// The period between firings.
    pub fn period(&self) -> f64 {
        1.0 / self.rate
    }

    fn update(&mut self, now: Time, executed: bool) {
        if executed {
            self.tau = now.max(self.start) + self.period();
        }
    }

    /// Same period, phase restarted at `max(now, start)`.
    fn restarted_at(&self, now: Time) -> Self {
        Self {
            tau: now.max(self.start),
            ..self.clone()
        }
    }
}

// ── ExponentialTime ─────────────────────────────────────────────

/// Exponentially distributed waiting times with Gibson–Bruck reuse.
///
/// The effective rate is the owning reaction's propensity. After a
/// firing a fresh sample is drawn; when only the propensity changed the
/// remaining waiting time is rescaled by `old / new`, so no random
/// number is consumed.
#[derive(Clone, Debug, PartialEq)]
pub struct ExponentialTime {
    start: Time,
    rate: f64,
    tau: Time,
    propensity: f64,
}

impl ExponentialTime {
    /// Build the distribution, drawing the initial occurrence from `rng`
    /// with the nominal rate.
    pub fn new(start: Time, rate: f64, rng: &mut SimRng) -> Result<Self, ConstructionError> {
        let start = check_start(start)?;
        let rate = check_rate(rate)?;
        Ok(Self {
            start,
            rate,
            tau: start + sample_exponential(rate, rng),
            propensity: rate,
        })
    }

    /// The propensity the current occurrence was drawn or rescaled with.
    pub fn propensity(&self) -> f64 {
        self.propensity
    }

    fn update(&mut self, now: Time, executed: bool, rate_hint: f64, rng: &mut SimRng) {
        let now = now.max(self.start);
        let new = if rate_hint.is_finite() && rate_hint > 0.0 {
            rate_hint
        } else {
            0.0
        };
        let old = self.propensity;
        self.tau = if new == 0.0 {
            Time::INFINITY
        } else if executed || old <= 0.0 || !self.tau.is_finite() {
            now + sample_exponential(new, rng)
        } else {
            // Remaining waiting time shrinks as the propensity grows.
            now + (old / new) * (self.tau - now).max(0.0)
        };
        self.propensity = new;
    }

    /// A fresh sample from `max(now, start)` at the current propensity,
    /// or the nominal rate if the propensity is zero.
    fn resampled_at(&self, now: Time, rng: &mut SimRng) -> Self {
        let rate = if self.propensity > 0.0 {
            self.propensity
        } else {
            self.rate
        };
        Self {
            start: self.start,
            rate: self.rate,
            tau: now.max(self.start) + sample_exponential(rate, rng),
            propensity: rate,
        }
    }
}

// ── Trigger ─────────────────────────────────────────────────────

/// A one-shot event at `start`. Its rate is infinite; after it fires the
/// next occurrence is never.
#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    start: Time,
    fired: bool,
}

impl Trigger {
    /// Build a trigger at `start`.
    pub fn new(start: Time) -> Result<Self, ConstructionError> {
        Ok(Self {
            start: check_start(start)?,
            fired: false,
        })
    }

    /// `true` once the trigger has fired.
    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

// ── Distribution ────────────────────────────────────────────────

/// The time distribution owned by a reaction.
pub enum Distribution<T> {
    /// Periodic firing.
    DiracComb(DiracComb),
    /// Stochastic firing with Gibson–Bruck rescaling.
    Exponential(ExponentialTime),
    /// One-shot firing.
    Trigger(Trigger),
    /// A user-supplied policy.
    Custom(Box<dyn TimeDistribution<T>>),
}

impl<T: 'static> Distribution<T> {
    /// Shorthand for [`DiracComb::new`].
    pub fn dirac_comb(start: Time, rate: f64) -> Result<Self, ConstructionError> {
        DiracComb::new(start, rate).map(Self::DiracComb)
    }

    /// Shorthand for [`ExponentialTime::new`].
    pub fn exponential(start: Time, rate: f64, rng: &mut SimRng) -> Result<Self, ConstructionError> {
        ExponentialTime::new(start, rate, rng).map(Self::Exponential)
    }

    /// Shorthand for [`Trigger::new`].
    pub fn trigger(start: Time) -> Result<Self, ConstructionError> {
        Trigger::new(start).map(Self::Trigger)
    }

    /// Wrap a user-supplied policy.
    pub fn custom(distribution: impl TimeDistribution<T>) -> Self {
        Self::Custom(Box::new(distribution))
    }

    /// The next time the owning reaction should fire.
    pub fn next_occurrence(&self) -> Time {
        match self {
            Self::DiracComb(d) => d.tau,
            Self::Exponential(d) => d.tau,
            Self::Trigger(d) => {
                if d.fired {
                    Time::INFINITY
                } else {
                    d.start
                }
            }
            Self::Custom(d) => d.next_occurrence(),
        }
    }

    /// The nominal rate.
    pub fn rate(&self) -> f64 {
        match self {
            Self::DiracComb(d) => d.rate,
            Self::Exponential(d) => d.rate,
            Self::Trigger(_) => f64::INFINITY,
            Self::Custom(d) => d.rate(),
        }
    }

    /// The start time.
    pub fn start(&self) -> Time {
        match self {
            Self::DiracComb(d) => d.start,
            Self::Exponential(d) => d.start,
            Self::Trigger(d) => d.start,
            Self::Custom(d) => d.start(),
        }
    }

    /// Recompute the next occurrence. See [`TimeDistribution::update`].
    pub fn update(
        &mut self,
        now: Time,
        executed: bool,
        rate_hint: f64,
        env: &Environment<T>,
        rng: &mut SimRng,
    ) {
        match self {
            Self::DiracComb(d) => d.update(now, executed),
            Self::Exponential(d) => d.update(now, executed, rate_hint, rng),
            Self::Trigger(d) => {
                if executed {
                    d.fired = true;
                }
            }
            Self::Custom(d) => d.update(now, executed, rate_hint, env, rng),
        }
    }

    /// An independent copy for a reaction created at `now`.
    ///
    /// Unlike [`Clone`], which copies the pending occurrence, a Dirac comb
    /// restarts its phase at `now` and an exponential draws a fresh
    /// sample from `rng`. A trigger keeps its fixed instant.
    pub fn clone_at(&self, now: Time, rng: &mut SimRng) -> Self {
        match self {
            Self::DiracComb(d) => Self::DiracComb(d.restarted_at(now)),
            Self::Exponential(d) => Self::Exponential(d.resampled_at(now, rng)),
            Self::Trigger(d) => Self::Trigger(d.clone()),
            Self::Custom(d) => Self::Custom(d.clone_at(now, rng)),
        }
    }
}

impl<T: 'static> Clone for Distribution<T> {
    fn clone(&self) -> Self {
        match self {
            Self::DiracComb(d) => Self::DiracComb(d.clone()),
            Self::Exponential(d) => Self::Exponential(d.clone()),
            Self::Trigger(d) => Self::Trigger(d.clone()),
            Self::Custom(d) => Self::Custom(d.clone_boxed()),
        }
    }
}

impl<T: 'static> fmt::Debug for Distribution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiracComb(d) => fmt::Debug::fmt(d, f),
            Self::Exponential(d) => fmt::Debug::fmt(d, f),
            Self::Trigger(d) => fmt::Debug::fmt(d, f),
            Self::Custom(d) => f
                .debug_struct("Custom")
                .field("next_occurrence", &d.next_occurrence())
                .field("rate", &d.rate())
                .finish(),
        }
    }
}

/// Parse a textual time-distribution parameter.
///
/// - `None` or blank: [`Trigger`] at `start`
/// - `"<rate>"`: [`ExponentialTime`] with that rate
/// - `"dirac:<rate>"`: [`DiracComb`] with that rate
///
/// Anything else, and any invalid rate, is a [`ConstructionError`].
pub fn parse_distribution<T: 'static>(
    parameter: Option<&str>,
    start: Time,
    rng: &mut SimRng,
) -> Result<Distribution<T>, ConstructionError> {
    let text = parameter.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Distribution::trigger(start);
    }
    let invalid = |reason: &str| ConstructionError::InvalidParameter {
        parameter: text.to_owned(),
        reason: reason.to_owned(),
    };
    if let Some(rest) = text.strip_prefix("dirac:") {
        let rate: f64 = rest
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number after 'dirac:'"))?;
        return Distribution::dirac_comb(start, rate);
    }
    let rate: f64 = text
        .parse()
        .map_err(|_| invalid("expected a rate, 'dirac:<rate>', or nothing"))?;
    Distribution::exponential(start, rate, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brine_space::NoLinks;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn env() -> Environment<f64> {
        Environment::new(1, NoLinks)
    }

    fn rng() -> SimRng {
        SimRng::seed_from_u64(7)
    }

    #[test]
    fn dirac_comb_fires_at_start_then_periodically() {
        let env = env();
        let mut rng = rng();
        let mut d: Distribution<f64> = Distribution::dirac_comb(Time::new(1.0), 4.0).unwrap();
        assert_eq!(d.next_occurrence(), Time::new(1.0));
        d.update(Time::new(1.0), true, 123.0, &env, &mut rng);
        assert_eq!(d.next_occurrence(), Time::new(1.25));
        d.update(Time::new(1.1), false, 0.0, &env, &mut rng);
        assert_eq!(d.next_occurrence(), Time::new(1.25));
    }

    #[test]
    fn clone_at_draws_independent_occurrences() {
        let mut rng = rng();
        let src: Distribution<f64> =
            Distribution::exponential(Time::ZERO, 1.0, &mut rng).unwrap();
        let copy = src.clone_at(Time::new(0.5), &mut rng);
        assert_ne!(copy.next_occurrence(), src.next_occurrence());
        assert!(copy.next_occurrence() >= Time::new(0.5));
        assert_eq!(src.clone().next_occurrence(), src.next_occurrence());

        let comb: Distribution<f64> = Distribution::dirac_comb(Time::ZERO, 2.0).unwrap();
        let restarted = comb.clone_at(Time::new(3.2), &mut rng);
        assert_eq!(restarted.next_occurrence(), Time::new(3.2));
        assert_eq!(restarted.rate(), 2.0);
    }

    #[test]
    fn trigger_fires_once() {
        let env = env();
        let mut rng = rng();
        let mut d: Distribution<f64> = Distribution::trigger(Time::new(2.0)).unwrap();
        assert_eq!(d.rate(), f64::INFINITY);
        assert_eq!(d.next_occurrence(), Time::new(2.0));
        d.update(Time::new(0.5), false, 1.0, &env, &mut rng);
        assert_eq!(d.next_occurrence(), Time::new(2.0));
        d.update(Time::new(2.0), true, 1.0, &env, &mut rng);
        assert_eq!(d.next_occurrence(), Time::INFINITY);
    }

    #[test]
    fn exponential_zero_propensity_is_never() {
        let env = env();
        let mut rng = rng();
        let mut d: Distribution<f64> =
            Distribution::exponential(Time::ZERO, 1.0, &mut rng).unwrap();
        d.update(Time::ZERO, false, 0.0, &env, &mut rng);
        assert_eq!(d.next_occurrence(), Time::INFINITY);
        d.update(Time::new(3.0), false, 2.0, &env, &mut rng);
        let t = d.next_occurrence();
        assert!(t.is_finite());
        assert!(t >= Time::new(3.0));
    }

    #[test]
    fn exponential_rescales_without_consuming_randomness() {
        let env = env();
        let mut rng = rng();
        let mut d = ExponentialTime::new(Time::ZERO, 1.0, &mut rng).unwrap();
        let tau = d.tau;
        let before = rng.clone();
        let mut dist: Distribution<f64> = Distribution::Exponential(d.clone());
        dist.update(Time::ZERO, false, 2.0, &env, &mut rng);
        assert_eq!(rng, before);
        let expected = Time::new(tau.as_f64() / 2.0);
        assert!((dist.next_occurrence() - expected).abs() < 1e-12);
        d.update(Time::ZERO, true, 2.0, &mut rng);
        assert_ne!(rng, before);
    }

    #[test]
    fn rejects_invalid_rates_and_starts() {
        let mut rng = rng();
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Distribution::<f64>::exponential(Time::ZERO, rate, &mut rng),
                Err(ConstructionError::InvalidRate { .. })
            ));
            assert!(matches!(
                Distribution::<f64>::dirac_comb(Time::ZERO, rate),
                Err(ConstructionError::InvalidRate { .. })
            ));
        }
        assert!(matches!(
            Distribution::<f64>::trigger(Time::INFINITY),
            Err(ConstructionError::InvalidStartTime { .. })
        ));
    }

    #[test]
    fn parse_distribution_forms() {
        let mut rng = rng();
        let d = parse_distribution::<f64>(None, Time::ZERO, &mut rng).unwrap();
        assert!(matches!(d, Distribution::Trigger(_)));
        let d = parse_distribution::<f64>(Some("  "), Time::ZERO, &mut rng).unwrap();
        assert!(matches!(d, Distribution::Trigger(_)));
        let d = parse_distribution::<f64>(Some("2.5"), Time::ZERO, &mut rng).unwrap();
        assert!(matches!(d, Distribution::Exponential(_)));
        assert_eq!(d.rate(), 2.5);
        let d = parse_distribution::<f64>(Some("dirac:4"), Time::ZERO, &mut rng).unwrap();
        assert!(matches!(d, Distribution::DiracComb(_)));
        assert!(matches!(
            parse_distribution::<f64>(Some("fast"), Time::ZERO, &mut rng),
            Err(ConstructionError::InvalidParameter { .. })
        ));
        assert!(matches!(
            parse_distribution::<f64>(Some("-3"), Time::ZERO, &mut rng),
            Err(ConstructionError::InvalidRate { .. })
        ));
        assert!(matches!(
            parse_distribution::<f64>(Some("dirac:x"), Time::ZERO, &mut rng),
            Err(ConstructionError::InvalidParameter { .. })
        ));
    }

    proptest! {
        #[test]
        fn exponential_never_schedules_before_now(
            seed in any::<u64>(),
            hints in proptest::collection::vec((0.0f64..10.0, any::<bool>()), 1..30),
        ) {
            let env = env();
            let mut rng = SimRng::seed_from_u64(seed);
            let mut d: Distribution<f64> =
                Distribution::exponential(Time::new(1.0), 1.0, &mut rng).unwrap();
            let mut now = Time::ZERO;
            for (hint, executed) in hints {
                d.update(now, executed, hint, &env, &mut rng);
                let next = d.next_occurrence();
                prop_assert!(next >= now.max(Time::new(1.0)));
                if next.is_finite() {
                    now = next;
                }
            }
        }
    }
}
