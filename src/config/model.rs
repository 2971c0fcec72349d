//! Settings data structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SettingsError;

/// Root settings structure for the runtime-config binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    /// Runtime configuration reload settings.
    #[serde(default)]
    pub runtime_config: RuntimeConfigSettings,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Settings for a runtime configuration manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfigSettings {
    /// Object path of the runtime config file. Empty disables reloading.
    #[serde(default)]
    pub file: String,

    /// How often to check the runtime config file, in seconds.
    #[serde(default = "default_reload_period")]
    pub period_seconds: u64,

    /// Storage backend the file is fetched from.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Object storage backend selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default)]
    pub filesystem: FilesystemConfig,
}

/// Storage backends selectable from settings.
///
/// In-process buckets such as [`MemoryBucket`](crate::storage::MemoryBucket)
/// hold no objects until their owner uploads some, so they are handed to the
/// manager through a bucket factory instead of being selectable here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Objects are files below a local directory.
    #[default]
    Filesystem,
}

/// Filesystem backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Directory object paths are resolved against.
    #[serde(default = "default_filesystem_dir")]
    pub dir: PathBuf,
}

/// Prometheus metrics endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Whether to serve the Prometheus metrics endpoint.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Port for the Prometheus metrics HTTP server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl RuntimeConfigSettings {
    /// Returns true when a runtime config file is configured.
    pub fn is_enabled(&self) -> bool {
        !self.file.is_empty()
    }

    /// Returns the reload period as a duration.
    pub fn reload_period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }

    /// Checks the settings for values the manager cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.period_seconds == 0 {
            return Err(SettingsError::Invalid(
                "runtime_config.period_seconds must be greater than zero".to_string(),
            ));
        }

        match self.storage.backend {
            Backend::Filesystem if self.storage.filesystem.dir.as_os_str().is_empty() => {
                return Err(SettingsError::Invalid(
                    "runtime_config.storage.filesystem.dir must not be empty".to_string(),
                ));
            }
            Backend::Filesystem => {}
        }

        Ok(())
    }
}

fn default_reload_period() -> u64 {
    10
}

fn default_filesystem_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_true() -> bool {
    true
}

impl Default for RuntimeConfigSettings {
    fn default() -> Self {
        Self {
            file: String::new(),
            period_seconds: default_reload_period(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            dir: default_filesystem_dir(),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_reloading() {
        let settings = RuntimeConfigSettings::default();
        assert!(!settings.is_enabled());
        assert_eq!(settings.reload_period(), Duration::from_secs(10));
        assert_eq!(settings.storage.backend, Backend::Filesystem);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_period_is_rejected() {
        let settings = RuntimeConfigSettings {
            period_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn empty_filesystem_dir_is_rejected() {
        let mut settings = RuntimeConfigSettings::default();
        settings.storage.filesystem.dir = PathBuf::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "runtime_config:\n  file: overrides.yaml\n  storage:\n    filesystem:\n      dir: /srv/config\n";
        let settings: AppSettings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.runtime_config.file, "overrides.yaml");
        assert_eq!(settings.runtime_config.period_seconds, 10);
        assert_eq!(settings.runtime_config.storage.backend, Backend::Filesystem);
        assert_eq!(
            settings.runtime_config.storage.filesystem.dir,
            PathBuf::from("/srv/config")
        );
        assert!(settings.metrics.enabled);
        assert_eq!(settings.metrics.port, 9090);
    }

    #[test]
    fn in_process_backend_is_not_selectable() {
        let yaml = "runtime_config:\n  file: overrides.yaml\n  storage:\n    backend: memory\n";
        assert!(serde_yaml::from_str::<AppSettings>(yaml).is_err());
    }
}
