//! Per (region, kind) metric state and the reconciler.
//!
//! A [`MetricState`] owns one [`Window`], the current [`Trend`], the last
//! authoritative reading and its own random source. It is plain data with
//! synchronous operations; serialising access is the scheduler's job.

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::diurnal;
use crate::error::ReconcileError;
use crate::kind::MetricKind;
use crate::sampler;
use crate::trend::Trend;
use crate::window::{Sample, Window};

/// What a successful reconciliation did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciled {
    /// A new tail sample was appended.
    Appended,
    /// The tail shared the reading's timestamp and was overwritten.
    Replaced,
    /// Same timestamp and value as the tail; nothing changed.
    Duplicate,
}

/// Last accepted authoritative reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Authoritative {
    pub value: f64,
    pub timestamp_ms: u64,
}

/// Window, trend and bookkeeping for one metric of one region.
#[derive(Debug, Clone)]
pub struct MetricState<R = StdRng> {
    kind: MetricKind,
    window: Window,
    trend: Trend,
    last_authoritative: Option<Authoritative>,
    rng: R,
    ticks: u64,
    rejected: u64,
    poll_failures: u32,
}

impl<R: Rng> MetricState<R> {
    /// Empty state. Mostly useful for tests; production states are seeded.
    pub fn new(kind: MetricKind, capacity: usize, rng: R) -> Self {
        Self {
            kind,
            window: Window::new(capacity),
            trend: Trend::Stable,
            last_authoritative: None,
            rng,
            ticks: 0,
            rejected: 0,
            poll_failures: 0,
        }
    }

    /// State whose window holds the diurnal history ending at `now_ms`.
    ///
    /// With a capacity below 24 only the most recent hours are kept.
    pub fn seeded(
        kind: MetricKind,
        base: Option<f64>,
        capacity: usize,
        now_ms: u64,
        utc_offset_hours: i32,
        rng: R,
    ) -> Self {
        let mut state = Self::new(kind, capacity, rng);
        for sample in diurnal::seed(base, kind, now_ms, utc_offset_hours, &mut state.rng) {
            state.window.append(sample);
        }
        state.refresh_trend();
        state
    }

    /// Advance the random walk by one step from the current tail.
    ///
    /// A timestamp older than the tail is raised to the tail's so the window
    /// stays non-decreasing.
    pub fn tick(&mut self, timestamp_ms: u64) -> Sample {
        let previous = self
            .window
            .latest()
            .map(|s| s.value)
            .or(self.last_authoritative.map(|a| a.value))
            .unwrap_or(self.kind.spec().default_base);
        let value = sampler::next(previous, self.kind, &mut self.rng);
        let sample = Sample::new(timestamp_ms.max(self.tail_ms()), value);
        self.window.append(sample);
        self.ticks += 1;
        self.refresh_trend();
        sample
    }

    /// Merge an authoritative reading into the window.
    ///
    /// On error the window, trend and last authoritative value are exactly as
    /// before the call; only the rejection counter moves. A reading carrying
    /// the tail's timestamp overwrites the tail instead of appending, so the
    /// same reading delivered by both poll and push is counted once.
    pub fn reconcile(
        &mut self,
        value: Option<f64>,
        timestamp_ms: u64,
    ) -> Result<Reconciled, ReconcileError> {
        let value = match self.validate(value, timestamp_ms) {
            Ok(v) => v,
            Err(e) => {
                self.rejected += 1;
                return Err(e);
            }
        };

        let sample = Sample::new(timestamp_ms, value);
        let outcome = match self.window.latest() {
            Some(tail) if tail.timestamp_ms == timestamp_ms && tail.value == value => {
                Reconciled::Duplicate
            }
            Some(tail) if tail.timestamp_ms == timestamp_ms => {
                self.window.replace_latest(sample);
                Reconciled::Replaced
            }
            _ => {
                self.window.append(sample);
                Reconciled::Appended
            }
        };

        self.last_authoritative = Some(Authoritative {
            value,
            timestamp_ms,
        });
        self.refresh_trend();
        Ok(outcome)
    }

    fn validate(&self, value: Option<f64>, timestamp_ms: u64) -> Result<f64, ReconcileError> {
        let kind = self.kind;
        let spec = kind.spec();
        let value = value.ok_or(ReconcileError::Missing { kind })?;
        if !value.is_finite() {
            return Err(ReconcileError::NonFinite { kind, value });
        }
        if !spec.in_domain(value) {
            return Err(ReconcileError::OutOfDomain {
                kind,
                value,
                min: spec.domain.0,
                max: spec.domain.1,
            });
        }
        if let Some(tail) = self.window.latest() {
            if timestamp_ms < tail.timestamp_ms {
                return Err(ReconcileError::Stale {
                    timestamp_ms,
                    tail_ms: tail.timestamp_ms,
                });
            }
        }
        Ok(spec.settle(value))
    }
}

impl<R> MetricState<R> {
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn last_authoritative(&self) -> Option<Authoritative> {
        self.last_authoritative
    }

    /// Number of synthetic ticks applied since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of authoritative readings refused by validation.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Consecutive failed polls since the last successful one.
    pub fn poll_failures(&self) -> u32 {
        self.poll_failures
    }

    pub fn record_poll_failure(&mut self) {
        self.poll_failures = self.poll_failures.saturating_add(1);
    }

    pub fn record_poll_success(&mut self) {
        self.poll_failures = 0;
    }

    /// Tail timestamp, or 0 for an empty window.
    pub fn tail_ms(&self) -> u64 {
        self.window.latest().map_or(0, |s| s.timestamp_ms)
    }

    /// Immutable copy for rendering.
    pub fn snapshot(&self, region: &str) -> MetricSnapshot {
        let spec = self.kind.spec();
        MetricSnapshot {
            region: region.to_string(),
            kind: self.kind,
            label: spec.label.to_string(),
            unit: spec.unit.to_string(),
            samples: self.window.snapshot(),
            trend: self.trend,
            latest: self.window.latest().map(|s| s.value),
            last_authoritative: self.last_authoritative,
            ticks: self.ticks,
            rejected: self.rejected,
            poll_failures: self.poll_failures,
        }
    }

    fn refresh_trend(&mut self) {
        self.trend = self.window.trend();
    }
}

/// Point-in-time copy of a [`MetricState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub region: String,
    pub kind: MetricKind,
    pub label: String,
    pub unit: String,
    /// Window contents, oldest first.
    pub samples: Vec<Sample>,
    pub trend: Trend,
    pub latest: Option<f64>,
    pub last_authoritative: Option<Authoritative>,
    pub ticks: u64,
    pub rejected: u64,
    pub poll_failures: u32,
}

/// Every metric of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub region: String,
    pub metrics: Vec<MetricSnapshot>,
}

impl RegionSnapshot {
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricSnapshot> {
        self.metrics.iter().find(|m| m.kind == kind)
    }
}
