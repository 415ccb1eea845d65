pub mod monitor;
pub mod regions;
pub mod seed;
pub mod serve;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use climawatch_core::{
    ConfigError, DEFAULT_REGIONS, MetricKind, MetricSnapshot, Monitor, MonitorConfig,
    SimulatedFeed,
};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides<'a> {
    pub regions: Option<&'a str>,
    pub seed: Option<u64>,
    pub tick_secs: Option<u64>,
}

/// Split a comma-separated region list. `"all"` selects the default cantons.
pub fn parse_regions(filter: &str) -> Vec<String> {
    if filter.trim().eq_ignore_ascii_case("all") {
        return DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect();
    }
    filter
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load the config file (or defaults) and apply overrides.
pub fn resolve_config(
    path: Option<&str>,
    overrides: &Overrides,
) -> Result<MonitorConfig, ConfigError> {
    let mut config = match path {
        Some(p) => MonitorConfig::load(Path::new(p))?,
        None => MonitorConfig::default(),
    };
    if let Some(filter) = overrides.regions {
        config.regions = parse_regions(filter);
    }
    if overrides.seed.is_some() {
        config.seed = overrides.seed;
    }
    if let Some(secs) = overrides.tick_secs {
        config.tick_interval_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

/// Like [`resolve_config`], but exits with a message on error.
pub fn make_config(path: Option<&str>, overrides: &Overrides) -> MonitorConfig {
    match resolve_config(path, overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Monitor backed by the simulated weather feed, or exit with a message.
pub fn make_monitor(config: MonitorConfig) -> Arc<Monitor> {
    let feed = SimulatedFeed::new(config.seed);
    match Monitor::new(config, Arc::new(feed)) {
        Ok(monitor) => Arc::new(monitor),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Clap value parser for `--refresh`: a finite, positive number of seconds.
pub fn parse_refresh(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("refresh must be a positive number of seconds, got {raw}"));
    }
    Ok(secs)
}

/// Multi-threaded runtime, or exit with a message.
pub fn make_runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting async runtime: {e}");
            std::process::exit(1);
        }
    }
}

/// Value with the kind's precision and unit, or a dash when absent.
pub fn format_value(kind: MetricKind, value: Option<f64>) -> String {
    let spec = kind.spec();
    match value {
        Some(v) => format!("{v:.prec$} {}", spec.unit, prec = spec.precision as usize)
            .trim_end()
            .to_string(),
        None => "—".to_string(),
    }
}

/// Whether repeated poll failures mean the metric is running on synthetic
/// values only.
pub fn is_stale(metric: &MetricSnapshot) -> bool {
    metric.poll_failures >= climawatch_server::STALE_AFTER_FAILURES
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // -----------------------------------------------------------------------
    // parse_regions tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_regions_list() {
        assert_eq!(
            parse_regions(" Liberia, Santa Cruz ,,Nicoya"),
            vec!["Liberia", "Santa Cruz", "Nicoya"]
        );
    }

    #[test]
    fn test_parse_regions_all() {
        assert_eq!(parse_regions("ALL").len(), DEFAULT_REGIONS.len());
        assert!(parse_regions("").is_empty());
    }

    // -----------------------------------------------------------------------
    // resolve_config tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_resolve_defaults() {
        let c = resolve_config(None, &Overrides::default()).unwrap();
        assert_eq!(c, MonitorConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"regions": ["Cañas"], "seed": 1, "tick_interval_secs": 30}}"#).unwrap();
        let path = f.path().to_str().unwrap().to_string();

        let c = resolve_config(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(c.regions, vec!["Cañas".to_string()]);
        assert_eq!(c.seed, Some(1));

        let c = resolve_config(
            Some(&path),
            &Overrides {
                regions: Some("Liberia,Nicoya"),
                seed: Some(9),
                tick_secs: Some(5),
            },
        )
        .unwrap();
        assert_eq!(c.regions.len(), 2);
        assert_eq!(c.seed, Some(9));
        assert_eq!(c.tick_interval_secs, 5);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = resolve_config(
            None,
            &Overrides {
                tick_secs: Some(0),
                ..Overrides::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    // -----------------------------------------------------------------------
    // parse_refresh tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_refresh_accepts_positive_seconds() {
        assert_eq!(parse_refresh("2.5"), Ok(2.5));
        assert_eq!(parse_refresh(" 1 "), Ok(1.0));
    }

    #[test]
    fn test_parse_refresh_rejects_non_finite_and_non_positive() {
        for raw in ["inf", "-inf", "NaN", "nan", "0", "-1", "soon", ""] {
            assert!(parse_refresh(raw).is_err(), "accepted {raw:?}");
        }
    }

    // -----------------------------------------------------------------------
    // format_value tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_format_value_uses_precision_and_unit() {
        assert_eq!(format_value(MetricKind::Temperature, Some(27.44)), "27.4 °C");
        assert_eq!(format_value(MetricKind::Humidity, Some(62.0)), "62 %");
        assert_eq!(format_value(MetricKind::UvIndex, Some(7.5)), "7.5");
        assert_eq!(format_value(MetricKind::UvIndex, None), "—");
    }
}
