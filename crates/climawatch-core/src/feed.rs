//! Polled reading sources.
//!
//! A [`ReadingSource`] returns the current [`Reading`] for a region. The
//! scheduler calls [`ReadingSource::fetch`] on tokio's blocking pool, so
//! implementations may block on I/O.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Weather descriptions reported by the simulated backend.
const DESCRIPTIONS: &[&str] = &["clear sky", "few clouds", "overcast", "rain"];

/// One polled weather payload for a region.
///
/// Numeric fields are optional so that a missing value reaches the
/// reconciler (and is reported as a validation failure) instead of failing
/// the whole payload. The Spanish field names used by the upstream weather
/// API are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default, alias = "temperatura")]
    pub temperature: Option<f64>,
    #[serde(default, alias = "humedad")]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub uv_index: Option<f64>,
    #[serde(default)]
    pub avg_temp: Option<f64>,
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
    #[serde(default, alias = "velocidad_viento")]
    pub wind_speed: Option<f64>,
    /// When the source observed these values, in ms since the Unix epoch.
    /// A reading delivered twice with the same observation time collapses
    /// into one sample.
    #[serde(default)]
    pub observed_at_ms: Option<u64>,
}

/// Anything that can be polled for a region's current reading.
pub trait ReadingSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetch the current reading for `region`. May block.
    fn fetch(&self, region: &str) -> Result<Reading, FeedError>;
}

// ---------------------------------------------------------------------------
// Simulated feed
// ---------------------------------------------------------------------------

/// Random plausible readings, standing in for a live weather backend.
///
/// Ranges: temperature and average temperature 20-30 °C, humidity 40-80 %
/// (whole numbers), UV 0-10, wind 0.5-5 m/s.
pub struct SimulatedFeed {
    rng: Mutex<StdRng>,
}

impl SimulatedFeed {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new(None)
    }
}

fn one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

impl ReadingSource for SimulatedFeed {
    fn name(&self) -> &str {
        "simulated"
    }

    fn fetch(&self, _region: &str) -> Result<Reading, FeedError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let description = DESCRIPTIONS[rng.random_range(0..DESCRIPTIONS.len())];
        Ok(Reading {
            temperature: Some(one_decimal(rng.random_range(20.0..=30.0))),
            humidity: Some(f64::from(rng.random_range(40..=80))),
            uv_index: Some(one_decimal(rng.random_range(0.0..=10.0))),
            avg_temp: Some(one_decimal(rng.random_range(20.0..=30.0))),
            description: Some(description.to_string()),
            wind_speed: Some(one_decimal(rng.random_range(0.5..=5.0))),
            observed_at_ms: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Static feed
// ---------------------------------------------------------------------------

/// Fixed readings keyed by region (case-insensitive).
#[derive(Debug, Default)]
pub struct StaticFeed {
    readings: Mutex<HashMap<String, Reading>>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, region: &str, reading: Reading) -> Self {
        self.set(region, reading);
        self
    }

    /// Replace the reading served for `region`.
    pub fn set(&self, region: &str, reading: Reading) {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(crate::region_key(region), reading);
    }
}

impl ReadingSource for StaticFeed {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, region: &str) -> Result<Reading, FeedError> {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&crate::region_key(region))
            .cloned()
            .ok_or_else(|| FeedError::UnknownRegion(region.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_ranges() {
        let feed = SimulatedFeed::new(Some(3));
        for _ in 0..500 {
            let r = feed.fetch("Liberia").unwrap();
            let t = r.temperature.unwrap();
            let h = r.humidity.unwrap();
            let uv = r.uv_index.unwrap();
            assert!((20.0..=30.0).contains(&t));
            assert!((40.0..=80.0).contains(&h));
            assert_eq!(h.fract(), 0.0);
            assert!((0.0..=10.0).contains(&uv));
            assert!(DESCRIPTIONS.contains(&r.description.as_deref().unwrap()));
        }
    }

    #[test]
    fn test_simulated_seed_is_reproducible() {
        let a = SimulatedFeed::new(Some(9));
        let b = SimulatedFeed::new(Some(9));
        assert_eq!(a.fetch("x").unwrap(), b.fetch("x").unwrap());
    }

    #[test]
    fn test_static_feed_lookup_is_case_insensitive() {
        let feed = StaticFeed::new().with(
            "Santa Cruz",
            Reading {
                humidity: Some(70.0),
                ..Reading::default()
            },
        );
        assert_eq!(feed.fetch(" santa cruz").unwrap().humidity, Some(70.0));
        assert_eq!(
            feed.fetch("Nicoya"),
            Err(FeedError::UnknownRegion("Nicoya".into()))
        );
    }

    #[test]
    fn test_reading_accepts_upstream_field_names() {
        let json = r#"{
            "temperatura": 27.3,
            "humedad": 64,
            "uv_index": 5.0,
            "avg_temp": 26.1,
            "descripcion": "few clouds",
            "velocidad_viento": 2.4
        }"#;
        let r: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(r.temperature, Some(27.3));
        assert_eq!(r.humidity, Some(64.0));
        assert_eq!(r.description.as_deref(), Some("few clouds"));
        assert_eq!(r.wind_speed, Some(2.4));
    }

    #[test]
    fn test_reading_missing_fields_default_to_none() {
        let r: Reading = serde_json::from_str(r#"{"humidity": 55}"#).unwrap();
        assert_eq!(r.humidity, Some(55.0));
        assert!(r.temperature.is_none());
        assert!(r.uv_index.is_none());
        assert!(r.observed_at_ms.is_none());
    }

    #[test]
    fn test_reading_observation_time() {
        let r: Reading =
            serde_json::from_str(r#"{"uv_index": 6.1, "observed_at_ms": 1709294400000}"#).unwrap();
        assert_eq!(r.observed_at_ms, Some(1_709_294_400_000));
    }
}
