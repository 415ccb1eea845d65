//! # climawatch-core
//!
//! **Live-looking weather metrics that stay honest.**
//!
//! `climawatch-core` keeps a rolling window of temperature, humidity and UV
//! index readings for every observed region. Between real readings the
//! windows drift on a bounded random walk so charts keep moving; whenever an
//! authoritative value arrives (polled or pushed) it is reconciled into the
//! window and becomes the new anchor for the walk.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use climawatch_core::{MetricKind, Monitor, MonitorConfig, SimulatedFeed};
//!
//! # async fn run() -> Result<(), climawatch_core::ConfigError> {
//! let monitor = Monitor::new(MonitorConfig::default(), Arc::new(SimulatedFeed::default()))?;
//! monitor.observe("Liberia").await;
//!
//! let snap = monitor.snapshot("liberia").unwrap();
//! let uv = snap.metric(MetricKind::UvIndex).unwrap();
//! println!("UV {:?} {}", uv.latest, uv.trend.arrow());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Reading source → per-metric task (tick / poll / push) → watch snapshot → renderer
//!
//! - **Seeding**: each window starts with 24 hourly samples shaped by a
//!   diurnal curve around the first reading.
//! - **Ticks**: a bounded random walk step from the current tail.
//! - **Reconciliation**: validated authoritative values are appended, or
//!   replace the tail when they share its timestamp. Values carrying the
//!   source's observation time are stamped with it, so one reading seen by
//!   both a poll and a push is counted once.
//!
//! Every metric is owned by exactly one task, so ticks, poll results and
//! pushes are applied one at a time in arrival order.

pub mod config;
pub mod diurnal;
pub mod error;
pub mod events;
pub mod feed;
pub mod kind;
pub mod monitor;
pub mod sampler;
pub mod scheduler;
pub mod state;
pub mod trend;
pub mod window;

pub use config::{DEFAULT_REGIONS, MonitorConfig, PollIntervals};
pub use error::{ConfigError, FeedError, MonitorError, ReconcileError};
pub use events::{MetricUpdate, PushEvent, RecordAction};
pub use feed::{Reading, ReadingSource, SimulatedFeed, StaticFeed};
pub use kind::{Fluctuation, MetricKind, MetricSpec};
pub use monitor::{EventOutcome, Monitor};
pub use scheduler::{Cadence, MetricHandle, now_ms};
pub use state::{Authoritative, MetricSnapshot, MetricState, Reconciled, RegionSnapshot};
pub use trend::{Trend, classify};
pub use window::{DEFAULT_CAPACITY, Sample, Window};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lookup key for a region name: trimmed and lowercased.
pub fn region_key(region: &str) -> String {
    region.trim().to_lowercase()
}
