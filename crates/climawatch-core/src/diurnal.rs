//! Hour-of-day variation used to seed a fresh window.
//!
//! Each kind follows a piecewise daily curve: a morning ramp, a midday
//! plateau, an evening ramp and a night plateau, with a small bounded jitter
//! on the plateaus. The curve only shapes the initial history; live values
//! come from the random walk and authoritative readings afterwards.

use rand::Rng;

use crate::kind::MetricKind;
use crate::window::Sample;

/// Number of hourly samples produced by [`seed`].
pub const SEED_HOURS: usize = 24;

/// Milliseconds in one hour.
pub const HOUR_MS: u64 = 3_600_000;

/// Local hour of day (0-23) for a Unix timestamp and a fixed UTC offset.
pub fn local_hour(timestamp_ms: u64, utc_offset_hours: i32) -> u32 {
    let secs = (timestamp_ms / 1000) as i64 + i64::from(utc_offset_hours) * 3600;
    (secs.rem_euclid(86_400) / 3600) as u32
}

/// Expected offset from the base value at local hour `hour`.
pub fn offset<R: Rng + ?Sized>(kind: MetricKind, hour: u32, rng: &mut R) -> f64 {
    let h = f64::from(hour);
    match kind {
        MetricKind::Temperature => match hour {
            6..=11 => (h - 6.0) * 0.8,
            12..=14 => 5.0 + jitter(rng, 1.0),
            15..=19 => 5.0 - (h - 15.0) * 0.7,
            _ => -2.0 + jitter(rng, 1.0),
        },
        MetricKind::Humidity => match hour {
            5..=8 => 15.0 + jitter(rng, 4.0),
            9..=15 => -10.0 - (h - 9.0) * 0.8 + jitter(rng, 3.0),
            16..=19 => -5.0 + (h - 16.0) * 2.0 + jitter(rng, 2.5),
            _ => 10.0 + jitter(rng, 3.5),
        },
        MetricKind::UvIndex => match hour {
            5..=7 => (h - 5.0) * 0.8 - 2.0,
            8..=11 => (h - 8.0) * 0.9,
            12..=15 => 3.5 + jitter(rng, 0.5),
            16..=18 => 3.5 - (h - 16.0) * 1.5,
            _ => -3.0 + jitter(rng, 0.3),
        },
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, amplitude: f64) -> f64 {
    rng.random_range(-amplitude..=amplitude)
}

/// Build the trailing 24 hours of history ending at `now_ms`, one sample per
/// hour, oldest first.
///
/// A missing or non-finite `base` falls back to the kind's default base.
pub fn seed<R: Rng + ?Sized>(
    base: Option<f64>,
    kind: MetricKind,
    now_ms: u64,
    utc_offset_hours: i32,
    rng: &mut R,
) -> Vec<Sample> {
    let spec = kind.spec();
    let base = base.filter(|b| b.is_finite()).unwrap_or(spec.default_base);

    (0..SEED_HOURS)
        .rev()
        .map(|hours_ago| {
            let ts = now_ms.saturating_sub(hours_ago as u64 * HOUR_MS);
            let hour = local_hour(ts, utc_offset_hours);
            let value = spec.settle(base + offset(kind, hour, rng));
            Sample::new(ts, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // 2024-03-01T12:00:00Z
    const NOON_UTC: u64 = 1_709_294_400_000;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_local_hour() {
        assert_eq!(local_hour(NOON_UTC, 0), 12);
        assert_eq!(local_hour(NOON_UTC, -6), 6);
        assert_eq!(local_hour(NOON_UTC, 14), 2);
        assert_eq!(local_hour(0, -6), 18);
    }

    #[test]
    fn test_seed_has_24_hourly_samples() {
        let samples = seed(Some(25.0), MetricKind::Temperature, NOON_UTC, 0, &mut rng());
        assert_eq!(samples.len(), SEED_HOURS);
        assert_eq!(samples.last().unwrap().timestamp_ms, NOON_UTC);
        assert!(
            samples
                .windows(2)
                .all(|p| p[1].timestamp_ms - p[0].timestamp_ms == HOUR_MS)
        );
    }

    #[test]
    fn test_humidity_seed_in_percent_range() {
        for base in [0.0, 50.0, 100.0] {
            let samples = seed(Some(base), MetricKind::Humidity, NOON_UTC, -6, &mut rng());
            assert_eq!(samples.len(), 24);
            assert!(samples.iter().all(|s| (0.0..=100.0).contains(&s.value)));
            assert!(samples.iter().all(|s| s.value.fract() == 0.0));
        }
    }

    #[test]
    fn test_uv_seed_never_negative() {
        let samples = seed(Some(0.0), MetricKind::UvIndex, NOON_UTC, -6, &mut rng());
        assert!(samples.iter().all(|s| s.value >= 0.0));
    }

    #[test]
    fn test_missing_base_uses_kind_default() {
        // Humidity 05:00-08:00 sits at +15 ± 4 over the base.
        let hour_7_utc = NOON_UTC - 5 * HOUR_MS;
        let samples = seed(None, MetricKind::Humidity, hour_7_utc, 0, &mut rng());
        let last = samples.last().unwrap().value;
        assert!((61.0..=69.0).contains(&last), "got {last}");

        let samples = seed(Some(f64::NAN), MetricKind::UvIndex, NOON_UTC, 0, &mut rng());
        assert!(samples.iter().all(|s| s.value.is_finite()));
    }

    #[test]
    fn test_deterministic_segments() {
        let mut r = rng();
        assert_eq!(offset(MetricKind::Temperature, 6, &mut r), 0.0);
        assert!((offset(MetricKind::Temperature, 10, &mut r) - 3.2).abs() < 1e-9);
        assert!((offset(MetricKind::Temperature, 17, &mut r) - 3.6).abs() < 1e-9);
        assert!((offset(MetricKind::UvIndex, 5, &mut r) + 2.0).abs() < 1e-9);
        assert!((offset(MetricKind::UvIndex, 18, &mut r) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_jittered_segments_bounded() {
        let mut r = rng();
        for _ in 0..500 {
            let t = offset(MetricKind::Temperature, 13, &mut r);
            assert!((4.0..=6.0).contains(&t));
            let n = offset(MetricKind::Humidity, 2, &mut r);
            assert!((6.5..=13.5).contains(&n));
            let u = offset(MetricKind::UvIndex, 23, &mut r);
            assert!((-3.3..=-2.7).contains(&u));
        }
    }

    #[test]
    fn test_temperature_midday_above_night() {
        // Base 25, UTC offset 0: the 13:00 sample is hotter than the 02:00 one.
        let samples = seed(Some(25.0), MetricKind::Temperature, NOON_UTC + HOUR_MS, 0, &mut rng());
        let at = |hour: u32| {
            samples
                .iter()
                .find(|s| local_hour(s.timestamp_ms, 0) == hour)
                .unwrap()
                .value
        };
        assert!(at(13) > at(2));
    }

    #[test]
    fn test_seed_near_epoch_saturates() {
        let samples = seed(Some(20.0), MetricKind::Temperature, 1_000, 0, &mut rng());
        assert_eq!(samples.len(), 24);
        assert_eq!(samples[0].timestamp_ms, 0);
    }
}
