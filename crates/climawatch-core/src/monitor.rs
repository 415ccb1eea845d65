//! Registry of observed regions.
//!
//! Lifecycle of a region:
//! 1. `observe` fetches one reading and seeds every metric window around it
//! 2. each metric gets its own task (see [`crate::scheduler`])
//! 3. pushes are routed to the owning task by region and kind
//! 4. `forget` stops the tasks; late poll results and pushes are discarded

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::MonitorConfig;
use crate::error::{ConfigError, FeedError, MonitorError};
use crate::events::{MetricUpdate, PushEvent};
use crate::feed::{Reading, ReadingSource};
use crate::kind::MetricKind;
use crate::region_key;
use crate::scheduler::{Cadence, MetricHandle, now_ms};
use crate::state::{MetricState, Reconciled, RegionSnapshot};

/// Running tasks for one region, in [`MetricKind::ALL`] order.
struct RegionTasks {
    name: String,
    metrics: Vec<MetricHandle>,
}

impl RegionTasks {
    fn handle(&self, kind: MetricKind) -> Option<&MetricHandle> {
        self.metrics.iter().find(|h| h.kind() == kind)
    }

    fn snapshot(&self) -> RegionSnapshot {
        RegionSnapshot {
            region: self.name.clone(),
            metrics: self
                .metrics
                .iter()
                .map(|h| h.snapshot().as_ref().clone())
                .collect(),
        }
    }

    fn stop(&self) {
        for handle in &self.metrics {
            handle.stop();
        }
    }
}

/// What [`Monitor::handle_event`] did with a push-channel event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// A metric update was reconciled into its window.
    Metric(Reconciled),
    /// Per-kind results of a weather update, in [`MetricKind::ALL`] order.
    /// Kinds the reading has no value for are left out.
    Weather(Vec<(MetricKind, Result<Reconciled, MonitorError>)>),
    /// A record change; no metric was touched.
    Ignored,
}

/// Thread-safe set of observed regions and their metric tasks.
pub struct Monitor {
    config: MonitorConfig,
    source: Arc<dyn ReadingSource>,
    regions: Mutex<HashMap<String, Arc<RegionTasks>>>,
}

impl Monitor {
    /// Fails if `config` does not pass [`MonitorConfig::validate`].
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn ReadingSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            regions: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Name of the reading source used for polls.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Start observing `region`. Returns `false` if it was already observed.
    ///
    /// Blocks (asynchronously) on one fetch from the reading source to pick
    /// seed bases. A failed fetch still seeds the windows, around each
    /// metric's default base.
    pub async fn observe(&self, region: &str) -> bool {
        let name = region.trim().to_string();
        let key = region_key(&name);
        if self.is_observed(&key) {
            return false;
        }

        let reading = self.fetch_initial(&name).await;
        let now = now_ms();
        let mut metrics = Vec::with_capacity(MetricKind::ALL.len());
        for kind in MetricKind::ALL {
            let state = self.seed_state(&key, kind, reading.as_ref(), now);
            let cadence = Cadence::from_config(&self.config, kind);
            metrics.push(MetricHandle::spawn(
                &name,
                state,
                Arc::clone(&self.source),
                cadence,
            ));
        }
        let tasks = Arc::new(RegionTasks { name, metrics });

        match self.lock().entry(key) {
            Entry::Vacant(slot) => {
                info!("observing {}", tasks.name);
                slot.insert(tasks);
                true
            }
            // Lost a race with a concurrent observe; ours are dropped and aborted.
            Entry::Occupied(_) => false,
        }
    }

    /// Observe every region listed in the config. Returns how many were new.
    pub async fn observe_all(&self) -> usize {
        let mut added = 0;
        for region in self.config.regions.clone() {
            if self.observe(&region).await {
                added += 1;
            }
        }
        added
    }

    /// Stop observing `region`. Returns `false` if it was not observed.
    pub fn forget(&self, region: &str) -> bool {
        let removed = self.lock().remove(&region_key(region));
        match removed {
            Some(tasks) => {
                tasks.stop();
                info!("forgot {}", tasks.name);
                true
            }
            None => false,
        }
    }

    pub fn is_observed(&self, region: &str) -> bool {
        self.lock().contains_key(&region_key(region))
    }

    /// Display names of observed regions, sorted.
    pub fn regions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().values().map(|t| t.name.clone()).collect();
        names.sort();
        names
    }

    pub fn snapshot(&self, region: &str) -> Option<RegionSnapshot> {
        self.tasks(region).map(|t| t.snapshot())
    }

    /// Snapshots of every observed region, sorted by name.
    pub fn snapshots(&self) -> Vec<RegionSnapshot> {
        let tasks: Vec<Arc<RegionTasks>> = self.lock().values().cloned().collect();
        let mut snaps: Vec<RegionSnapshot> = tasks.iter().map(|t| t.snapshot()).collect();
        snaps.sort_by(|a, b| a.region.cmp(&b.region));
        snaps
    }

    /// Route an authoritative value to its metric task.
    pub async fn push(&self, update: MetricUpdate) -> Result<Reconciled, MonitorError> {
        let tasks = self
            .tasks(&update.region)
            .ok_or_else(|| MonitorError::UnknownRegion(update.region.clone()))?;
        let handle = tasks
            .handle(update.kind)
            .ok_or_else(|| MonitorError::UnknownRegion(update.region.clone()))?;
        handle.push_observed(update.value, update.observed_at_ms).await
    }

    /// Reconcile a full reading into every metric of `region` it carries a
    /// value for.
    pub async fn push_reading(
        &self,
        region: &str,
        reading: &Reading,
    ) -> Result<Vec<(MetricKind, Result<Reconciled, MonitorError>)>, MonitorError> {
        let tasks = self
            .tasks(region)
            .ok_or_else(|| MonitorError::UnknownRegion(region.to_string()))?;
        let mut outcomes = Vec::with_capacity(tasks.metrics.len());
        for handle in &tasks.metrics {
            let kind = handle.kind();
            let Some(value) = kind.extract(reading) else {
                continue;
            };
            let outcome = handle.push_observed(Some(value), reading.observed_at_ms).await;
            if let Err(e) = &outcome {
                warn!("{}/{kind} weather update not applied: {e}", tasks.name);
            }
            outcomes.push((kind, outcome));
        }
        Ok(outcomes)
    }

    /// Dispatch a push-channel event.
    pub async fn handle_event(&self, event: PushEvent) -> Result<EventOutcome, MonitorError> {
        match event {
            PushEvent::MetricUpdate(update) => self.push(update).await.map(EventOutcome::Metric),
            PushEvent::WeatherUpdate { region, reading } => self
                .push_reading(&region, &reading)
                .await
                .map(EventOutcome::Weather),
            PushEvent::RecordChange {
                record_type,
                action,
                ..
            } => {
                debug!("record change: {action:?} {record_type}");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    /// Stop every task and forget all regions.
    pub fn shutdown(&self) {
        let drained: Vec<Arc<RegionTasks>> = self.lock().drain().map(|(_, t)| t).collect();
        for tasks in &drained {
            tasks.stop();
        }
        if !drained.is_empty() {
            info!("stopped {} region(s)", drained.len());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<RegionTasks>>> {
        self.regions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self, region: &str) -> Option<Arc<RegionTasks>> {
        self.lock().get(&region_key(region)).cloned()
    }

    async fn fetch_initial(&self, region: &str) -> Result<Reading, FeedError> {
        let source = Arc::clone(&self.source);
        let owned = region.to_string();
        tokio::task::spawn_blocking(move || source.fetch(&owned))
            .await
            .map_err(|e| FeedError::Worker(e.to_string()))?
    }

    fn seed_state(
        &self,
        key: &str,
        kind: MetricKind,
        reading: Result<&Reading, &FeedError>,
        now: u64,
    ) -> MetricState {
        let spec = kind.spec();
        let value = reading.ok().and_then(|r| kind.extract(r));
        let base = value.filter(|v| spec.in_domain(*v));
        let rng = metric_rng(self.config.seed, key, kind);
        let mut state = MetricState::seeded(
            kind,
            base,
            self.config.window_capacity,
            now,
            self.config.utc_offset_hours,
            rng,
        );

        match reading {
            Ok(_) => {
                state.record_poll_success();
                // The newest seeded hour is replaced by the reading itself.
                if let Err(e) = state.reconcile(value, now) {
                    warn!("{key}/{kind} initial reading rejected: {e}");
                }
            }
            Err(e) => {
                state.record_poll_failure();
                warn!("{key}/{kind} seeding without a reading: {e}");
            }
        }
        state
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Independent generator per region and kind. A configured seed makes every
/// stream reproducible; otherwise each is seeded from the OS.
fn metric_rng(seed: Option<u64>, key: &str, kind: MetricKind) -> StdRng {
    match seed {
        Some(seed) => {
            // FNV-1a over the stream name, folded into the seed.
            let mut h: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
            for b in key.bytes().chain([b'/']).chain(kind.name().bytes()) {
                h ^= u64::from(b);
                h = h.wrapping_mul(0x0100_0000_01b3);
            }
            StdRng::seed_from_u64(h)
        }
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use crate::events::RecordAction;
    use crate::feed::StaticFeed;
    use rand::Rng;
    use std::time::Duration;

    fn reading() -> Reading {
        Reading {
            temperature: Some(31.0),
            humidity: Some(62.0),
            uv_index: Some(7.5),
            avg_temp: Some(27.4),
            description: Some("clear sky".into()),
            wind_speed: Some(2.0),
            observed_at_ms: None,
        }
    }

    fn monitor() -> Monitor {
        let feed = StaticFeed::new()
            .with("Liberia", reading())
            .with("Nicoya", reading());
        let config = MonitorConfig {
            seed: Some(42),
            ..MonitorConfig::default()
        };
        Monitor::new(config, Arc::new(feed)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Observe / forget
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_observe_seeds_every_metric_from_reading() {
        let m = monitor();
        assert!(m.observe("Liberia").await);
        let snap = m.snapshot("liberia").unwrap();
        assert_eq!(snap.region, "Liberia");
        assert_eq!(snap.metrics.len(), 3);
        for metric in &snap.metrics {
            assert_eq!(metric.samples.len(), 24);
            assert_eq!(metric.poll_failures, 0);
        }
        // Temperature tracks the average temperature.
        let temp = snap.metric(MetricKind::Temperature).unwrap();
        assert_eq!(temp.latest, Some(27.4));
        assert_eq!(temp.last_authoritative.map(|a| a.value), Some(27.4));
        assert_eq!(snap.metric(MetricKind::Humidity).unwrap().latest, Some(62.0));
        assert_eq!(snap.metric(MetricKind::UvIndex).unwrap().latest, Some(7.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_is_idempotent_and_case_insensitive() {
        let m = monitor();
        assert!(m.observe("Liberia").await);
        assert!(!m.observe("  LIBERIA ").await);
        assert_eq!(m.regions(), vec!["Liberia".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_without_reading_still_seeds() {
        let m = monitor();
        assert!(m.observe("Bagaces").await);
        let snap = m.snapshot("Bagaces").unwrap();
        for metric in &snap.metrics {
            assert_eq!(metric.samples.len(), 24);
            assert_eq!(metric.poll_failures, 1);
            assert!(metric.last_authoritative.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_stops_region() {
        let m = monitor();
        m.observe("Liberia").await;
        assert!(m.forget("liberia"));
        assert!(!m.forget("liberia"));
        assert!(m.snapshot("Liberia").is_none());

        let err = m
            .push(MetricUpdate {
                region: "Liberia".into(),
                kind: MetricKind::UvIndex,
                value: Some(3.0),
                observed_at_ms: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, MonitorError::UnknownRegion("Liberia".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_all_uses_config_regions() {
        let m = Monitor::new(
            MonitorConfig {
                regions: vec!["Liberia".into(), "Nicoya".into(), "liberia".into()],
                ..MonitorConfig::default()
            },
            Arc::new(StaticFeed::new().with("Liberia", reading())),
        )
        .unwrap();
        assert_eq!(m.observe_all().await, 2);
        let names: Vec<String> = m.snapshots().into_iter().map(|s| s.region).collect();
        assert_eq!(names, vec!["Liberia".to_string(), "Nicoya".to_string()]);
        m.shutdown();
        assert!(m.regions().is_empty());
    }

    // -----------------------------------------------------------------------
    // Push routing
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_push_routes_to_metric() {
        let m = monitor();
        m.observe("Nicoya").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let outcome = m
            .push(MetricUpdate {
                region: "nicoya".into(),
                kind: MetricKind::Humidity,
                value: Some(71.0),
                observed_at_ms: None,
            })
            .await
            .unwrap();
        assert_eq!(outcome, Reconciled::Appended);
        let snap = m.snapshot("Nicoya").unwrap();
        assert_eq!(snap.metric(MetricKind::Humidity).unwrap().latest, Some(71.0));
        // Other metrics untouched.
        assert_eq!(snap.metric(MetricKind::UvIndex).unwrap().latest, Some(7.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_validation_error_surfaces() {
        let m = monitor();
        m.observe("Nicoya").await;
        let err = m
            .push(MetricUpdate {
                region: "Nicoya".into(),
                kind: MetricKind::UvIndex,
                value: Some(-1.0),
                observed_at_ms: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Rejected(ReconcileError::OutOfDomain { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_event_dispatch() {
        let m = monitor();
        m.observe("Liberia").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let record = PushEvent::RecordChange {
            record_type: "weather".into(),
            action: RecordAction::Create,
            data: serde_json::json!({"id": 1}),
        };
        assert_eq!(m.handle_event(record).await, Ok(EventOutcome::Ignored));

        let update = PushEvent::MetricUpdate(MetricUpdate {
            region: "Liberia".into(),
            kind: MetricKind::Temperature,
            value: Some(29.0),
            observed_at_ms: None,
        });
        assert_eq!(
            m.handle_event(update).await,
            Ok(EventOutcome::Metric(Reconciled::Appended))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_weather_update_fans_out_to_every_metric() {
        let m = monitor();
        m.observe("Liberia").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let event = PushEvent::WeatherUpdate {
            region: "liberia".into(),
            reading: Reading {
                temperature: Some(33.0),
                avg_temp: Some(28.6),
                humidity: Some(140.0),
                uv_index: Some(9.1),
                ..Reading::default()
            },
        };
        let Ok(EventOutcome::Weather(outcomes)) = m.handle_event(event).await else {
            panic!("expected weather outcomes");
        };
        let kinds: Vec<MetricKind> = outcomes.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, MetricKind::ALL.to_vec());
        assert_eq!(outcomes[0].1, Ok(Reconciled::Appended));
        assert!(matches!(
            outcomes[1].1,
            Err(MonitorError::Rejected(ReconcileError::OutOfDomain { .. }))
        ));
        assert_eq!(outcomes[2].1, Ok(Reconciled::Appended));

        let snap = m.snapshot("Liberia").unwrap();
        assert_eq!(snap.metric(MetricKind::Temperature).unwrap().latest, Some(28.6));
        assert_eq!(snap.metric(MetricKind::Humidity).unwrap().latest, Some(62.0));
        assert_eq!(snap.metric(MetricKind::Humidity).unwrap().rejected, 1);
        assert_eq!(snap.metric(MetricKind::UvIndex).unwrap().latest, Some(9.1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_weather_update_skips_absent_values() {
        let m = monitor();
        m.observe("Nicoya").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let event = PushEvent::WeatherUpdate {
            region: "Nicoya".into(),
            reading: Reading {
                uv_index: Some(2.0),
                ..Reading::default()
            },
        };
        let outcome = m.handle_event(event).await.unwrap();
        assert_eq!(
            outcome,
            EventOutcome::Weather(vec![(MetricKind::UvIndex, Ok(Reconciled::Appended))])
        );
        let snap = m.snapshot("Nicoya").unwrap();
        assert!(snap.metrics.iter().all(|metric| metric.rejected == 0));

        let err = m
            .handle_event(PushEvent::WeatherUpdate {
                region: "Bagaces".into(),
                reading: Reading::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, MonitorError::UnknownRegion("Bagaces".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushed_observation_time_is_kept() {
        let m = monitor();
        m.observe("Liberia").await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let before = m.snapshot("Liberia").unwrap();
        let tail = before.metric(MetricKind::UvIndex).unwrap().samples[23].timestamp_ms;
        let update = MetricUpdate {
            region: "Liberia".into(),
            kind: MetricKind::UvIndex,
            value: Some(3.5),
            observed_at_ms: Some(tail + 2_000),
        };
        assert_eq!(m.push(update.clone()).await, Ok(Reconciled::Appended));
        assert_eq!(m.push(update).await, Ok(Reconciled::Duplicate));
        let snap = m.snapshot("Liberia").unwrap();
        let uv = snap.metric(MetricKind::UvIndex).unwrap();
        assert_eq!(uv.samples.last().unwrap().timestamp_ms, tail + 2_000);
        assert_eq!(uv.samples[22].timestamp_ms, tail);
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    #[test]
    fn test_new_rejects_invalid_config() {
        let feed: Arc<dyn ReadingSource> = Arc::new(StaticFeed::new());
        let zero_tick = MonitorConfig {
            tick_interval_secs: 0,
            ..MonitorConfig::default()
        };
        assert!(matches!(
            Monitor::new(zero_tick, Arc::clone(&feed)),
            Err(ConfigError::Invalid(_))
        ));

        let empty_window = MonitorConfig {
            window_capacity: 0,
            ..MonitorConfig::default()
        };
        assert!(matches!(
            Monitor::new(empty_window, feed),
            Err(ConfigError::Invalid(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Seeding streams
    // -----------------------------------------------------------------------

    #[test]
    fn test_metric_rng_streams() {
        let a: u64 = metric_rng(Some(7), "liberia", MetricKind::Humidity).random();
        let b: u64 = metric_rng(Some(7), "liberia", MetricKind::Humidity).random();
        let c: u64 = metric_rng(Some(7), "liberia", MetricKind::UvIndex).random();
        let d: u64 = metric_rng(Some(7), "nicoya", MetricKind::Humidity).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
