//! Error types for reconciliation, feeds, configuration and the monitor.

use std::path::PathBuf;

use thiserror::Error;

use crate::kind::MetricKind;

/// An authoritative reading was refused. The window is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("no {kind} value in the authoritative payload")]
    Missing { kind: MetricKind },
    #[error("{kind} value {value} is not a finite number")]
    NonFinite { kind: MetricKind, value: f64 },
    #[error("{kind} value {value} outside accepted range [{min}, {max}]")]
    OutOfDomain {
        kind: MetricKind,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("reading at {timestamp_ms} ms is older than the latest sample at {tail_ms} ms")]
    Stale { timestamp_ms: u64, tail_ms: u64 },
}

/// Failure to obtain a reading from a polled source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("feed '{source_name}' unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
    #[error("feed has no data for region '{0}'")]
    UnknownRegion(String),
    #[error("fetch worker failed: {0}")]
    Worker(String),
}

/// Invalid or unreadable configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by [`crate::Monitor`] and [`crate::MetricHandle`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("region '{0}' is not being observed")]
    UnknownRegion(String),
    #[error("metric task for {region}/{kind} has stopped")]
    Closed { region: String, kind: MetricKind },
    #[error(transparent)]
    Rejected(#[from] ReconcileError),
}
