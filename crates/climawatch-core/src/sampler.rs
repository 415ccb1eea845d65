//! Bounded random walk between authoritative updates.

use rand::Rng;

use crate::kind::{Fluctuation, MetricKind};

/// Next synthetic value: `previous + δ`, rounded and clamped.
///
/// `δ` is uniform over the kind's [`Fluctuation`]. A non-finite `previous`
/// restarts the walk from the kind's default base, so the result is always
/// finite and inside the clamp range.
pub fn next<R: Rng + ?Sized>(previous: f64, kind: MetricKind, rng: &mut R) -> f64 {
    let spec = kind.spec();
    let base = if previous.is_finite() {
        previous
    } else {
        spec.default_base
    };
    let delta = match spec.fluctuation {
        Fluctuation::Continuous(m) => rng.random_range(-m..=m),
        Fluctuation::Discrete(m) => f64::from(rng.random_range(-m..=m)),
    };
    spec.settle(base + delta)
}
