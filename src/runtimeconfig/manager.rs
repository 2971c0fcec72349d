//! Periodic reload of the runtime config file.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use prometheus::Registry;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::cell::ConfigCell;
use super::decoder::Loader;
use super::listeners::{Listener, ListenerRegistry};
use super::metrics::ReloadMetrics;
use crate::config::RuntimeConfigSettings;
use crate::error::{LoadError, ManagerError};
use crate::service::Service;
use crate::storage::{Bucket, BucketClientFactory};

/// Snapshot of recent reload activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReloadStatus {
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// sha256 of the file behind the active config.
    pub active_hash: Option<String>,
    pub successful_reloads: u64,
    pub failed_reloads: u64,
}

/// Periodically reloads the runtime config file and keeps the decoded value
/// available to readers and listeners.
///
/// With an empty file path the manager starts successfully but never loads
/// anything, and [`get_config`](Self::get_config) always returns `None`.
pub struct Manager<T> {
    settings: RuntimeConfigSettings,
    loader: Loader<T>,
    bucket_factory: BucketClientFactory,
    bucket: OnceLock<Arc<dyn Bucket>>,
    config: ConfigCell<T>,
    listeners: ListenerRegistry<T>,
    metrics: ReloadMetrics,
    status: RwLock<ReloadStatus>,
    /// Serializes reload cycles so the cell only ever has one writer.
    reload_lock: tokio::sync::Mutex<()>,
}

impl<T: Send + Sync + 'static> Manager<T> {
    /// Creates a manager and registers its gauges with `registry`.
    ///
    /// Nothing is fetched until the manager is started.
    pub fn new(
        settings: RuntimeConfigSettings,
        loader: Loader<T>,
        registry: &Registry,
        bucket_factory: BucketClientFactory,
    ) -> Result<Self, ManagerError> {
        settings.validate()?;
        let metrics = ReloadMetrics::new(registry)?;

        Ok(Self {
            settings,
            loader,
            bucket_factory,
            bucket: OnceLock::new(),
            config: ConfigCell::new(),
            listeners: ListenerRegistry::new(),
            metrics,
            status: RwLock::new(ReloadStatus::default()),
            reload_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Settings the manager was created with.
    pub fn settings(&self) -> &RuntimeConfigSettings {
        &self.settings
    }

    /// Returns the last successfully loaded config, if any.
    pub fn get_config(&self) -> Option<Arc<T>> {
        self.config.get()
    }

    /// Creates a listener that receives each newly loaded config.
    ///
    /// If the listener's buffer is full (or, with `buffer == 0`, nobody is
    /// waiting in `recv`) when a config is published, that update is discarded
    /// for this listener. All listeners are closed when the manager stops.
    pub fn subscribe(&self, buffer: usize) -> Listener<T> {
        self.listeners.subscribe(buffer)
    }

    /// Stops sending updates to `listener` and closes its channel.
    pub fn unsubscribe(&self, listener: &Listener<T>) {
        self.listeners.unsubscribe(listener.id());
    }

    /// Returns a snapshot of recent reload activity.
    pub fn status(&self) -> ReloadStatus {
        self.status.read().clone()
    }

    /// Runs one reload cycle immediately, after any cycle already in flight.
    ///
    /// Fails with [`LoadError::NotStarted`] if the manager has not created its
    /// bucket client yet, and with [`LoadError::Stopped`] once it has stopped.
    pub async fn reload(&self) -> Result<(), LoadError> {
        self.load_config().await
    }

    /// Fetches and decodes the file; on success stores it as current config
    /// and notifies listeners.
    async fn load_config(&self) -> Result<(), LoadError> {
        let bucket = self.bucket.get().ok_or(LoadError::NotStarted)?;
        let _cycle = self.reload_lock.lock().await;
        if self.listeners.is_closed() {
            return Err(LoadError::Stopped);
        }
        let attempt_at = Utc::now();

        let buf = match bucket.get(&self.settings.file).await {
            Ok(buf) => buf,
            Err(e) => return Err(self.record_failure(attempt_at, LoadError::Fetch(e))),
        };
        let hash = content_hash(&buf);

        let value = match (self.loader)(&buf) {
            Ok(value) => Arc::new(value),
            Err(e) => return Err(self.record_failure(attempt_at, LoadError::Decode(e))),
        };
        self.metrics.record_success();

        // The cell is updated before listeners hear about the new value.
        self.config.set(Arc::clone(&value));
        let notified = self.listeners.publish(&value);

        self.metrics.set_active_hash(&hash);

        {
            let mut status = self.status.write();
            status.last_attempt_at = Some(attempt_at);
            status.last_success_at = Some(attempt_at);
            status.last_error = None;
            status.active_hash = Some(hash.clone());
            status.successful_reloads += 1;
        }

        info!(
            file = %self.settings.file,
            bucket = bucket.name(),
            sha256 = %hash,
            notified,
            "runtime config loaded"
        );
        Ok(())
    }

    fn record_failure(&self, attempt_at: DateTime<Utc>, err: LoadError) -> LoadError {
        self.metrics.record_failure();

        let mut status = self.status.write();
        status.last_attempt_at = Some(attempt_at);
        status.last_error = Some(err.to_string());
        status.failed_reloads += 1;

        err
    }

    async fn start_manager(&self) -> Result<(), ManagerError> {
        if !self.settings.is_enabled() {
            return Ok(());
        }

        let bucket = (self.bucket_factory)().map_err(ManagerError::BucketClient)?;
        // A restarted manager keeps the client from its first start.
        let _ = self.bucket.set(bucket);

        self.load_config().await.map_err(ManagerError::Startup)?;

        info!(
            file = %self.settings.file,
            period = ?self.settings.reload_period(),
            "runtime config manager started"
        );
        Ok(())
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Service for Manager<T> {
    fn name(&self) -> &str {
        "runtime-config"
    }

    async fn starting(&self, _token: CancellationToken) -> anyhow::Result<()> {
        Ok(self.start_manager().await?)
    }

    async fn running(&self, token: CancellationToken) -> anyhow::Result<()> {
        if !self.settings.is_enabled() {
            info!("runtime config disabled: file not specified");
            token.cancelled().await;
            return Ok(());
        }

        let mut ticker = tokio::time::interval(self.settings.reload_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the config was just loaded in `starting`.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    let result = tokio::select! {
                        result = self.load_config() => result,
                        _ = token.cancelled() => return Ok(()),
                    };

                    // Per-cycle failures are only logged; the last good config stays active.
                    if let Err(e) = result {
                        error!(
                            file = %self.settings.file,
                            bucket = self.bucket.get().map(|b| b.name()).unwrap_or_default(),
                            error = %e,
                            "failed to load config"
                        );
                    }
                }
            }
        }
    }

    async fn stopping(&self, _failure: Option<&anyhow::Error>) -> anyhow::Result<()> {
        // Waits for an in-flight cycle so nothing is swapped in after stopping.
        let _cycle = self.reload_lock.lock().await;
        self.listeners.close_all();
        Ok(())
    }
}

/// Hex-encoded sha256 of `content`.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
