//! Scan cycle orchestration for the foreground loop and the background pass
//!
//! Both modes share [`ScanCycleOrchestrator::run_cycle`]. They differ in
//! cadence and in what happens on failure: the foreground loop emits an empty
//! tick and keeps going, the background pass reports [`CycleOutcome::Retry`]
//! to whoever scheduled it.

use crate::classifier::{FeatureExtractor, PublicNetworkMatcher, SecurityClassifier};
use crate::config::SentryConfig;
use crate::error::{CycleOutcome, ScanError, ScanResult};
use crate::network::{now_formatted, Location, NetworkRecord, RadioScanSample};
use crate::output::{AlertPayload, AlertSink, CycleEvent, NotificationManager};
use crate::scanner::detector::NewNetworkDetector;
use crate::scanner::merger::ScanMerger;
use crate::scanner::source::{LocationProvider, ScanSource};
use crate::settings::{Settings, SettingsStore};
use crate::store::NetworkStore;
use futures::FutureExt;
use log::{debug, error, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Where a cycle currently is. Extraction and classification happen inside
/// `Merging`, only for samples the merger decides to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Acquiring,
    Merging,
    Diffing,
    Persisting,
    Emitting,
    RetryWait,
}

/// Everything one cycle produced
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// One record per logical network, in first-seen order
    pub merged: Vec<NetworkRecord>,
    /// Records absent from the store when the cycle started
    pub new_networks: Vec<NetworkRecord>,
    /// Lines actually appended (0 when auto-save is off)
    pub persisted: usize,
    pub duration: Duration,
}

impl CycleReport {
    pub fn dangerous_new(&self) -> impl Iterator<Item = &NetworkRecord> {
        self.new_networks.iter().filter(|r| r.label.is_dangerous())
    }

    fn into_event(self) -> CycleEvent {
        CycleEvent::Completed {
            merged: self.merged,
            new_networks: self.new_networks,
            persisted: self.persisted,
        }
    }
}

/// Drives acquire, merge, diff, persist and emit
pub struct ScanCycleOrchestrator {
    source: Arc<dyn ScanSource>,
    locator: Arc<dyn LocationProvider>,
    extractor: FeatureExtractor,
    classifier: Arc<SecurityClassifier>,
    merger: ScanMerger,
    detector: NewNetworkDetector,
    store: Arc<NetworkStore>,
    settings: Arc<SettingsStore>,
    notifier: NotificationManager,
    alert_sink: Option<Arc<dyn AlertSink>>,
    interval: Duration,
    scan_settle: Duration,
    location_timeout: Duration,
    last_location: Mutex<Option<Location>>,
}

impl ScanCycleOrchestrator {
    /// Build an orchestrator. Loads the model now so a missing asset fails
    /// here instead of silently labelling every network DANGEROUS.
    pub fn new(
        source: Arc<dyn ScanSource>,
        locator: Arc<dyn LocationProvider>,
        extractor: FeatureExtractor,
        classifier: Arc<SecurityClassifier>,
        store: Arc<NetworkStore>,
        settings: Arc<SettingsStore>,
    ) -> ScanResult<Self> {
        classifier.initialize()?;

        let defaults = SentryConfig::default();
        Ok(Self {
            source,
            locator,
            extractor,
            classifier,
            merger: ScanMerger::default(),
            detector: NewNetworkDetector,
            store,
            settings,
            notifier: NotificationManager::default(),
            alert_sink: None,
            interval: defaults.scan_interval_duration(),
            scan_settle: defaults.scan_settle_duration(),
            location_timeout: defaults.location_timeout_duration(),
            last_location: Mutex::new(None),
        })
    }

    /// Wire everything from a config file's paths
    pub fn from_config(
        config: &SentryConfig,
        source: Arc<dyn ScanSource>,
        locator: Arc<dyn LocationProvider>,
        settings: Arc<SettingsStore>,
    ) -> ScanResult<Self> {
        let matcher = Arc::new(PublicNetworkMatcher::load_or_default(&config.patterns_path));
        let classifier = Arc::new(SecurityClassifier::from_model_path(&config.model_path));
        let store = Arc::new(NetworkStore::new(config.store_path())?);

        Ok(Self::new(source, locator, FeatureExtractor::new(matcher), classifier, store, settings)?
            .with_config(config))
    }

    /// Apply timing and merge policy from `config`
    pub fn with_config(self, config: &SentryConfig) -> Self {
        self.with_merger(ScanMerger::new(config.rssi_hysteresis, config.merge_key))
            .with_timing(
                config.scan_interval_duration(),
                config.scan_settle_duration(),
                config.location_timeout_duration(),
            )
    }

    pub fn with_merger(mut self, merger: ScanMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn with_timing(mut self, interval: Duration, scan_settle: Duration, location_timeout: Duration) -> Self {
        self.interval = interval;
        self.scan_settle = scan_settle;
        self.location_timeout = location_timeout;
        self
    }

    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    pub fn with_notifier(mut self, notifier: NotificationManager) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn notifier(&self) -> &NotificationManager {
        &self.notifier
    }

    pub fn store(&self) -> &NetworkStore {
        &self.store
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    fn enter(&self, phase: CyclePhase) {
        debug!("[{}] -> {:?}", self.source.name(), phase);
    }

    /// Bounded wait for a fix; falls back to the last fix, then (0, 0)
    pub async fn acquire_location(&self) -> Location {
        match timeout(self.location_timeout, self.locator.current_location()).await {
            Ok(Some(location)) => {
                *self.last_location.lock().await = Some(location);
                location
            }
            Ok(None) => {
                warn!("Location unavailable, using last known fix");
                self.last_location.lock().await.unwrap_or_default()
            }
            Err(_) => {
                warn!("Location request timed out after {:?}", self.location_timeout);
                self.last_location.lock().await.unwrap_or_default()
            }
        }
    }

    /// Location plus one batch of raw samples
    async fn acquire(&self) -> ScanResult<(Location, Vec<RadioScanSample>)> {
        self.enter(CyclePhase::Acquiring);

        if !self.source.permission_granted() {
            return Err(ScanError::PermissionDenied(format!(
                "{} cannot scan without location permission",
                self.source.name()
            )));
        }
        if !self.source.radio_enabled() {
            return Err(ScanError::RadioDisabled);
        }

        let location = self.acquire_location().await;

        self.source.start_scan().await?;
        if !self.scan_settle.is_zero() {
            sleep(self.scan_settle).await;
        }
        let samples = self.source.scan_results().await?.ok_or(ScanError::NoResults)?;
        debug!("Acquired {} samples at {:?}", samples.len(), location);

        Ok((location, samples))
    }

    /// Merge, diff and (optionally) persist one batch
    pub fn process(&self, samples: &[RadioScanSample], location: Location) -> ScanResult<CycleReport> {
        let started = Instant::now();
        let settings = self.settings.current();

        self.enter(CyclePhase::Merging);
        let timestamp = now_formatted();
        let batch = self.merger.merge(samples, location, &timestamp, |sample| {
            let features = self.extractor.extract(sample);
            self.classifier.classify(&features)
        });

        self.enter(CyclePhase::Diffing);
        let known = self.store.known_keys()?;
        let new_networks = self.detector.detect(batch.records(), &known);

        let persisted = if settings.auto_save {
            self.enter(CyclePhase::Persisting);
            self.store.append(batch.records())?
        } else {
            0
        };

        Ok(CycleReport {
            merged: batch.into_records(),
            new_networks,
            persisted,
            duration: started.elapsed(),
        })
    }

    /// One full pass through the pipeline
    pub async fn run_cycle(&self) -> ScanResult<CycleReport> {
        let (location, samples) = self.acquire().await?;
        let report = self.process(&samples, location)?;
        info!(
            "Cycle complete: {} networks, {} new, {} saved in {:?}",
            report.merged.len(),
            report.new_networks.len(),
            report.persisted,
            report.duration
        );
        Ok(report)
    }

    /// One foreground tick. Always emits an event, even when acquisition fails
    /// or the pipeline panics.
    pub async fn tick(&self) -> CycleEvent {
        let event = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(Ok(report)) => report.into_event(),
            Ok(Err(e)) => {
                warn!("Foreground scan produced no batch: {}", e);
                CycleEvent::Failed { error: e.to_string() }
            }
            Err(_) => {
                error!("Foreground cycle panicked");
                CycleEvent::Failed {
                    error: "scan cycle panicked".to_string(),
                }
            }
        };

        self.enter(CyclePhase::Emitting);
        self.notifier.notify(event.clone());
        event
    }

    /// Loop while `run_flag` is true until `shutdown` fires. Clearing the flag
    /// lets the in-flight cycle finish and then parks the loop.
    pub async fn run_foreground(&self, mut run_flag: watch::Receiver<bool>, shutdown: CancellationToken) {
        info!("Foreground scanning with {} every {:?}", self.source.name(), self.interval);

        loop {
            loop {
                let running = *run_flag.borrow_and_update();
                if running {
                    break;
                }
                self.enter(CyclePhase::Idle);
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    changed = run_flag.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }

            if shutdown.is_cancelled() {
                return;
            }

            self.tick().await;

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = sleep(self.interval) => {}
            }
        }
    }

    /// Single scheduled pass. Never fails: errors and panics become `Retry`.
    pub async fn run_background(&self) -> CycleOutcome {
        let settings = self.settings.current();
        if !settings.auto_scan {
            info!("Auto-scan disabled, skipping background pass");
            return CycleOutcome::Skip;
        }

        match AssertUnwindSafe(self.background_pass(settings)).catch_unwind().await {
            Ok(Ok(report)) => {
                info!(
                    "Background pass found {} networks ({} new)",
                    report.merged.len(),
                    report.new_networks.len()
                );
                CycleOutcome::Success
            }
            Ok(Err(e)) => {
                self.enter(CyclePhase::RetryWait);
                if e.is_retryable() {
                    warn!("Background pass failed ({}): {}", e.kind(), e);
                } else {
                    error!("Background pass failed ({}): {}", e.kind(), e);
                }
                CycleOutcome::Retry
            }
            Err(_) => {
                self.enter(CyclePhase::RetryWait);
                error!("Background pass panicked");
                CycleOutcome::Retry
            }
        }
    }

    async fn background_pass(&self, settings: Settings) -> ScanResult<CycleReport> {
        let report = self.run_cycle().await?;

        if settings.notifications {
            if let Some(payload) = AlertPayload::from_new_networks(&report.new_networks) {
                self.enter(CyclePhase::Emitting);
                match &self.alert_sink {
                    Some(sink) => {
                        // Logged only: the pass already persisted its records
                        if let Err(e) = sink.send_alert(&payload, settings.vibration).await {
                            error!("Failed to deliver alert '{}': {}", payload.title(), e);
                        }
                    }
                    None => warn!("{} but no alert sink is attached", payload.title()),
                }
            }
        }

        Ok(report)
    }
}

impl std::fmt::Debug for ScanCycleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCycleOrchestrator")
            .field("source", &self.source.name())
            .field("merger", &self.merger)
            .field("store", &self.store.path())
            .field("interval", &self.interval)
            .finish()
    }
}
