//! Monitor configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! defaults below. Command-line flags override file values in the CLI.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kind::MetricKind;
use crate::window::DEFAULT_CAPACITY;

/// Cantons of Guanacaste observed by default.
pub const DEFAULT_REGIONS: &[&str] = &[
    "Liberia",
    "Nicoya",
    "Santa Cruz",
    "Bagaces",
    "Cañas",
    "Carrillo",
    "Tilarán",
    "Abangares",
    "La Cruz",
    "Hojancha",
    "Nandayure",
];

/// Poll period per metric kind, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollIntervals {
    pub temperature: u64,
    pub humidity: u64,
    pub uv_index: u64,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            temperature: 60,
            humidity: 45,
            uv_index: 30,
        }
    }
}

impl PollIntervals {
    pub fn secs(&self, kind: MetricKind) -> u64 {
        match kind {
            MetricKind::Temperature => self.temperature,
            MetricKind::Humidity => self.humidity,
            MetricKind::UvIndex => self.uv_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples kept per metric window.
    pub window_capacity: usize,
    /// Seconds between synthetic ticks.
    pub tick_interval_secs: u64,
    pub poll_interval_secs: PollIntervals,
    /// Fixed offset used to compute the local hour for diurnal seeding.
    pub utc_offset_hours: i32,
    /// Regions to observe at startup.
    pub regions: Vec<String>,
    /// Seed for reproducible runs. Each metric derives its own stream.
    pub seed: Option<u64>,
    /// Pending commands buffered per metric task.
    pub command_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_CAPACITY,
            tick_interval_secs: 60,
            poll_interval_secs: PollIntervals::default(),
            utc_offset_hours: -6,
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            seed: None,
            command_buffer: 64,
        }
    }
}

impl MonitorConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity < 2 {
            return Err(ConfigError::Invalid(format!(
                "window_capacity must be at least 2, got {}",
                self.window_capacity
            )));
        }
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid("tick_interval_secs must be > 0".into()));
        }
        for kind in MetricKind::ALL {
            if self.poll_interval_secs.secs(kind) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "poll interval for {kind} must be > 0"
                )));
            }
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours {} outside [-12, 14]",
                self.utc_offset_hours
            )));
        }
        if self.regions.iter().any(|r| r.trim().is_empty()) {
            return Err(ConfigError::Invalid("region names must not be empty".into()));
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::Invalid("command_buffer must be > 0".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn poll_interval(&self, kind: MetricKind) -> Duration {
        Duration::from_secs(self.poll_interval_secs.secs(kind))
    }
}
