//! Settings for the runtime configuration manager and the binary hosting it.

pub mod loader;
pub mod model;

pub use model::{
    AppSettings, Backend, FilesystemConfig, MetricsSettings, RuntimeConfigSettings, StorageConfig,
};
