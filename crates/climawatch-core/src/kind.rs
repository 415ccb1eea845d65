//! Metric kinds and their static configuration table.
//!
//! Every kind the dashboard tracks is described by a [`MetricSpec`]: unit,
//! clamp range, random-walk step, display precision and the domain an
//! authoritative reading must fall in to be accepted. Components stay generic
//! over [`MetricKind`] and look everything else up here.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feed::Reading;

/// A metric displayed for each observed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Air temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// UV index (dimensionless, open-ended).
    UvIndex,
}

impl MetricKind {
    /// All kinds, in display order.
    pub const ALL: [MetricKind; 3] = [Self::Temperature, Self::Humidity, Self::UvIndex];

    /// Static configuration for this kind.
    pub fn spec(self) -> &'static MetricSpec {
        match self {
            Self::Temperature => &TEMPERATURE,
            Self::Humidity => &HUMIDITY,
            Self::UvIndex => &UV_INDEX,
        }
    }

    /// Stable identifier (`"temperature"`, `"humidity"`, `"uv_index"`).
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Pick the authoritative value for this kind out of a polled reading.
    ///
    /// Temperature follows the reported average and falls back to the
    /// instantaneous temperature when no average is present.
    pub fn extract(self, reading: &Reading) -> Option<f64> {
        match self {
            Self::Temperature => reading.avg_temp.or(reading.temperature),
            Self::Humidity => reading.humidity,
            Self::UvIndex => reading.uv_index,
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "temperature" | "temp" | "t" => Ok(Self::Temperature),
            "humidity" | "hum" | "h" => Ok(Self::Humidity),
            "uv_index" | "uvindex" | "uv" => Ok(Self::UvIndex),
            other => Err(format!(
                "unknown metric kind '{other}' (expected temperature, humidity or uv_index)"
            )),
        }
    }
}

/// Shape of the random step applied between authoritative updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fluctuation {
    /// Uniform real step in `[-magnitude, +magnitude]`.
    Continuous(f64),
    /// Uniform integer step in `[-magnitude, +magnitude]`.
    Discrete(i32),
}

impl Fluctuation {
    /// Largest absolute step this fluctuation can produce.
    pub fn magnitude(self) -> f64 {
        match self {
            Self::Continuous(m) => m,
            Self::Discrete(m) => f64::from(m),
        }
    }
}

/// Static description of a metric kind.
#[derive(Debug, Clone)]
pub struct MetricSpec {
    /// Stable identifier.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Display unit.
    pub unit: &'static str,
    /// Lower clamp bound for every stored value.
    pub min: f64,
    /// Upper clamp bound for every stored value.
    pub max: f64,
    /// Random-walk step between ticks.
    pub fluctuation: Fluctuation,
    /// Decimal places kept after rounding.
    pub precision: u32,
    /// Base value used when no reading is available at seeding time.
    pub default_base: f64,
    /// Inclusive range an authoritative reading must fall in.
    pub domain: (f64, f64),
}

impl MetricSpec {
    /// Clamp into `[min, max]`. Also normalises `-0.0` to `0.0`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max) + 0.0
    }

    /// Round to the kind's display precision.
    ///
    /// Values too large to scale are already integral and come back as is.
    pub fn round(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.precision as i32);
        let scaled = value * scale;
        if !scaled.is_finite() {
            return value;
        }
        scaled.round() / scale
    }

    /// Round, then clamp. Clamping last keeps the bound exact.
    pub fn settle(&self, value: f64) -> f64 {
        self.clamp(self.round(value))
    }

    /// Whether an authoritative reading is plausible for this kind.
    pub fn in_domain(&self, value: f64) -> bool {
        value.is_finite() && value >= self.domain.0 && value <= self.domain.1
    }
}

static TEMPERATURE: MetricSpec = MetricSpec {
    name: "temperature",
    label: "Average Temperature",
    unit: "°C",
    min: f64::NEG_INFINITY,
    max: f64::INFINITY,
    fluctuation: Fluctuation::Continuous(1.5),
    precision: 1,
    default_base: 0.0,
    domain: (-90.0, 60.0),
};

static HUMIDITY: MetricSpec = MetricSpec {
    name: "humidity",
    label: "Humidity",
    unit: "%",
    min: 0.0,
    max: 100.0,
    fluctuation: Fluctuation::Discrete(8),
    precision: 0,
    default_base: 50.0,
    domain: (0.0, 100.0),
};

static UV_INDEX: MetricSpec = MetricSpec {
    name: "uv_index",
    label: "UV Index",
    unit: "",
    min: 0.0,
    max: f64::INFINITY,
    fluctuation: Fluctuation::Continuous(0.5),
    precision: 1,
    default_base: 5.0,
    domain: (0.0, 20.0),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_ranges() {
        assert_eq!(MetricKind::Humidity.spec().clamp(120.0), 100.0);
        assert_eq!(MetricKind::Humidity.spec().clamp(-3.0), 0.0);
        assert_eq!(MetricKind::UvIndex.spec().clamp(-0.2), 0.0);
        assert_eq!(MetricKind::UvIndex.spec().clamp(42.0), 42.0);
        assert_eq!(MetricKind::Temperature.spec().clamp(-120.0), -120.0);
    }

    #[test]
    fn test_clamp_normalises_negative_zero() {
        let v = MetricKind::UvIndex.spec().clamp(-0.0);
        assert!(v.is_sign_positive());
    }

    #[test]
    fn test_round_precision() {
        assert_eq!(MetricKind::Temperature.spec().round(21.46), 21.5);
        assert_eq!(MetricKind::Humidity.spec().round(49.6), 50.0);
        assert_eq!(MetricKind::UvIndex.spec().round(3.04), 3.0);
    }

    #[test]
    fn test_domain() {
        let uv = MetricKind::UvIndex.spec();
        assert!(uv.in_domain(0.0));
        assert!(uv.in_domain(11.5));
        assert!(!uv.in_domain(-1.0));
        assert!(!uv.in_domain(f64::NAN));
        assert!(!MetricKind::Temperature.spec().in_domain(f64::INFINITY));
        assert!(!MetricKind::Humidity.spec().in_domain(100.5));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("temp".parse::<MetricKind>(), Ok(MetricKind::Temperature));
        assert_eq!(" Humidity ".parse::<MetricKind>(), Ok(MetricKind::Humidity));
        assert_eq!("uv".parse::<MetricKind>(), Ok(MetricKind::UvIndex));
        assert!("pressure".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_display_matches_serde_name() {
        for kind in MetricKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_round_does_not_overflow() {
        let spec = MetricKind::Temperature.spec();
        assert_eq!(spec.round(f64::MAX), f64::MAX);
        assert_eq!(spec.settle(f64::MIN), f64::MIN);
        assert_eq!(MetricKind::Humidity.spec().settle(f64::MAX), 100.0);
    }

    #[test]
    fn test_extract_temperature_prefers_average() {
        let reading = Reading {
            temperature: Some(27.0),
            avg_temp: Some(25.5),
            ..Reading::default()
        };
        assert_eq!(MetricKind::Temperature.extract(&reading), Some(25.5));

        let reading = Reading {
            temperature: Some(27.0),
            ..Reading::default()
        };
        assert_eq!(MetricKind::Temperature.extract(&reading), Some(27.0));
        assert_eq!(MetricKind::UvIndex.extract(&reading), None);
    }
}
