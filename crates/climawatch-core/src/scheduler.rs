//! Per-metric single-writer task.
//!
//! Each [`MetricState`] is moved into its own tokio task, which is the only
//! code that ever mutates it. The task serialises three event sources in the
//! order they complete:
//!
//! 1. synthetic ticks on a fixed interval (random walk step),
//! 2. poll results from a [`ReadingSource`], fetched on the blocking pool,
//! 3. push commands sent through a [`MetricHandle`].
//!
//! Authoritative values are stamped with their observation time when the
//! source supplies one, so the same reading delivered by both a poll and a
//! push lands on one timestamp and is reconciled once. Without it the
//! arrival time at the task is used.
//!
//! After every mutation the task publishes an `Arc<MetricSnapshot>` on a
//! watch channel; readers clone the `Arc` and never block the writer.
//! Dropping or stopping the handle aborts the task, which drops the state,
//! cancels both cadences, aborts in-flight polls and closes the command
//! channel, so late results for a forgotten metric are discarded.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::config::MonitorConfig;
use crate::error::{FeedError, MonitorError, ReconcileError};
use crate::feed::{Reading, ReadingSource};
use crate::kind::MetricKind;
use crate::state::{MetricSnapshot, MetricState, Reconciled};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Wall-clock milliseconds advanced by tokio's monotonic clock, so stamps
/// never go backwards even if the system clock does.
#[derive(Debug, Clone, Copy)]
struct TaskClock {
    base_ms: u64,
    base: Instant,
}

impl TaskClock {
    fn starting_at(base_ms: u64) -> Self {
        Self {
            base_ms,
            base: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.base_ms + self.base.elapsed().as_millis() as u64
    }
}

/// Tick and poll periods for one metric task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadence {
    pub tick: Duration,
    pub poll: Duration,
    /// Command channel capacity.
    pub buffer: usize,
}

impl Cadence {
    pub fn from_config(config: &MonitorConfig, kind: MetricKind) -> Self {
        Self {
            tick: config.tick_interval(),
            poll: config.poll_interval(kind),
            buffer: config.command_buffer.max(1),
        }
    }
}

enum Command {
    Push {
        value: Option<f64>,
        observed_at_ms: Option<u64>,
        reply: oneshot::Sender<Result<Reconciled, ReconcileError>>,
    },
}

/// Owner-side handle to a running metric task.
pub struct MetricHandle {
    region: String,
    kind: MetricKind,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<MetricSnapshot>>,
    task: JoinHandle<()>,
}

impl MetricHandle {
    /// Start the task for an already seeded state.
    ///
    /// Must be called from within a tokio runtime. The first tick and the
    /// first poll fire one full period after spawning.
    pub fn spawn(
        region: &str,
        state: MetricState,
        source: Arc<dyn ReadingSource>,
        cadence: Cadence,
    ) -> Self {
        let kind = state.kind();
        let (commands, rx) = mpsc::channel(cadence.buffer.max(1));
        let (publisher, snapshots) = watch::channel(Arc::new(state.snapshot(region)));
        let clock = TaskClock::starting_at(now_ms().max(state.tail_ms()));

        let task = MetricTask {
            region: region.to_string(),
            state,
            source,
            clock,
            publisher,
        };
        let task = tokio::spawn(task.run(rx, cadence));
        info!("started {region}/{kind} (tick {:?}, poll {:?})", cadence.tick, cadence.poll);

        Self {
            region: region.to_string(),
            kind,
            commands,
            snapshots,
            task,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Latest published snapshot. Never waits on the writer.
    pub fn snapshot(&self) -> Arc<MetricSnapshot> {
        Arc::clone(&*self.snapshots.borrow())
    }

    /// Receiver that is notified after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MetricSnapshot>> {
        self.snapshots.clone()
    }

    /// Hand a pushed authoritative value to the task and wait for the
    /// outcome. The arrival time at the task is the reading's timestamp.
    pub async fn push(&self, value: Option<f64>) -> Result<Reconciled, MonitorError> {
        self.push_observed(value, None).await
    }

    /// Like [`MetricHandle::push`], stamped with the source's observation
    /// time when one is given.
    pub async fn push_observed(
        &self,
        value: Option<f64>,
        observed_at_ms: Option<u64>,
    ) -> Result<Reconciled, MonitorError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Push {
                value,
                observed_at_ms,
                reply,
            })
            .await
            .map_err(|_| self.closed())?;
        let result = outcome.await.map_err(|_| self.closed())?;
        Ok(result?)
    }

    /// Cancel both cadences and discard anything still in flight.
    pub fn stop(&self) {
        if !self.task.is_finished() {
            info!("stopping {}/{}", self.region, self.kind);
        }
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn closed(&self) -> MonitorError {
        MonitorError::Closed {
            region: self.region.clone(),
            kind: self.kind,
        }
    }
}

impl Drop for MetricHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct MetricTask {
    region: String,
    state: MetricState,
    source: Arc<dyn ReadingSource>,
    clock: TaskClock,
    publisher: watch::Sender<Arc<MetricSnapshot>>,
}

type PollOutcome = Result<Result<Reading, FeedError>, JoinError>;

impl MetricTask {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, cadence: Cadence) {
        let start = Instant::now();
        let mut ticks = interval_at(start + cadence.tick, cadence.tick);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = interval_at(start + cadence.poll, cadence.poll);
        polls.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Dropped with the task, which aborts any fetch still running.
        let mut in_flight: JoinSet<Result<Reading, FeedError>> = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticks.tick() => self.on_tick(),
                _ = polls.tick() => self.start_poll(&mut in_flight),
                Some(outcome) = in_flight.join_next(), if !in_flight.is_empty() => {
                    self.on_poll(outcome);
                }
                command = commands.recv() => match command {
                    Some(Command::Push { value, observed_at_ms, reply }) => {
                        let _ = reply.send(self.on_push(value, observed_at_ms));
                    }
                    None => break,
                },
            }
        }
        debug!("{}/{} task exiting", self.region, self.state.kind());
    }

    /// Timestamp for the next sample: task clock, never behind the tail.
    fn stamp(&self) -> u64 {
        self.clock.now_ms().max(self.state.tail_ms())
    }

    /// Timestamp for an authoritative value: its observation time, kept
    /// between the tail and the task clock, or the task clock if unknown.
    fn stamp_observed(&self, observed_at_ms: Option<u64>) -> u64 {
        let now = self.stamp();
        match observed_at_ms {
            Some(t) => t.min(now).max(self.state.tail_ms()),
            None => now,
        }
    }

    fn on_tick(&mut self) {
        let sample = self.state.tick(self.stamp());
        debug!(
            "{}/{} tick -> {} ({})",
            self.region,
            self.state.kind(),
            sample.value,
            self.state.trend()
        );
        self.publish();
    }

    fn start_poll(&mut self, in_flight: &mut JoinSet<Result<Reading, FeedError>>) {
        if !in_flight.is_empty() {
            debug!(
                "{}/{} previous poll still running, skipping",
                self.region,
                self.state.kind()
            );
            return;
        }
        let source = Arc::clone(&self.source);
        let region = self.region.clone();
        in_flight.spawn_blocking(move || source.fetch(&region));
    }

    fn on_poll(&mut self, outcome: PollOutcome) {
        let kind = self.state.kind();
        let reading = match outcome {
            Ok(Ok(reading)) => reading,
            Ok(Err(e)) => return self.poll_failed(e),
            Err(e) => return self.poll_failed(FeedError::Worker(e.to_string())),
        };
        self.state.record_poll_success();
        let stamp = self.stamp_observed(reading.observed_at_ms);
        match self.state.reconcile(kind.extract(&reading), stamp) {
            Ok(outcome) => debug!("{}/{} poll {outcome:?}", self.region, kind),
            Err(e) => warn!("{}/{} poll rejected: {e}", self.region, kind),
        }
        self.publish();
    }

    fn poll_failed(&mut self, error: FeedError) {
        self.state.record_poll_failure();
        warn!(
            "{}/{} poll via '{}' failed ({} in a row): {error}",
            self.region,
            self.state.kind(),
            self.source.name(),
            self.state.poll_failures()
        );
        self.publish();
    }

    fn on_push(
        &mut self,
        value: Option<f64>,
        observed_at_ms: Option<u64>,
    ) -> Result<Reconciled, ReconcileError> {
        let stamp = self.stamp_observed(observed_at_ms);
        let result = self.state.reconcile(value, stamp);
        match &result {
            Ok(outcome) => debug!("{}/{} push {outcome:?}", self.region, self.state.kind()),
            Err(e) => warn!("{}/{} push rejected: {e}", self.region, self.state.kind()),
        }
        self.publish();
        result
    }

    fn publish(&self) {
        self.publisher
            .send_replace(Arc::new(self.state.snapshot(&self.region)));
    }
}
