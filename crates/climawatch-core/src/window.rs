//! Fixed-capacity FIFO window of timestamped samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::trend::{Trend, classify};

/// Default window capacity: one day of hourly samples.
pub const DEFAULT_CAPACITY: usize = 24;

/// One timestamped value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp_ms: u64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// Ordered, capacity-bounded sample buffer.
///
/// Insertion order is chronological order. Appending at capacity evicts the
/// oldest sample first, so `len() <= capacity()` holds after every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Window {
    /// Create an empty window.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the tail, evicting the head first when full.
    pub fn append(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        debug_assert!(
            self.samples.len() <= self.capacity,
            "window exceeded capacity {}",
            self.capacity
        );
    }

    /// Overwrite the tail in place. Appends when the window is empty.
    pub fn replace_latest(&mut self, sample: Sample) {
        match self.samples.back_mut() {
            Some(tail) => *tail = sample,
            None => self.samples.push_back(sample),
        }
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    /// Owned copy of every sample, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Iterate oldest -> newest.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Trend over the two most recent samples.
    pub fn trend(&self) -> Trend {
        let n = self.samples.len();
        if n < 2 {
            return Trend::Stable;
        }
        classify(&[self.samples[n - 2], self.samples[n - 1]])
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
