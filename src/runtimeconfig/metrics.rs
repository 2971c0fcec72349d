//! Prometheus gauges describing reload outcomes.

use prometheus::{Gauge, GaugeVec, Opts, Registry};

use crate::error::MetricsError;

/// Gauges exported by the runtime config manager.
pub struct ReloadMetrics {
    /// 1 if the last reload attempt succeeded, 0 otherwise.
    last_reload_successful: Gauge,
    /// Set to 1 for the sha256 of the active config; all other labels are cleared.
    config_hash: GaugeVec,
}

impl ReloadMetrics {
    /// Creates the gauges and registers them with `registry`.
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let last_reload_successful = Gauge::new(
            "runtime_config_last_reload_successful",
            "Whether the last runtime-config reload attempt was successful.",
        )?;

        let config_hash = GaugeVec::new(
            Opts::new(
                "runtime_config_hash",
                "Hash of the currently active runtime config file.",
            ),
            &["sha256"],
        )?;

        registry.register(Box::new(last_reload_successful.clone()))?;
        registry.register(Box::new(config_hash.clone()))?;

        Ok(Self {
            last_reload_successful,
            config_hash,
        })
    }

    pub fn record_failure(&self) {
        self.last_reload_successful.set(0.0);
    }

    pub fn record_success(&self) {
        self.last_reload_successful.set(1.0);
    }

    /// Points the hash gauge at `hash`, dropping every previous label.
    pub fn set_active_hash(&self, hash: &str) {
        self.config_hash.reset();
        self.config_hash.with_label_values(&[hash]).set(1.0);
    }

    pub fn last_reload_successful(&self) -> f64 {
        self.last_reload_successful.get()
    }
}
