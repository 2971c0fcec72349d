//! Decoders turning fetched bytes into configuration values.

use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Parses the raw runtime config file into a caller-defined value.
pub type Loader<T> = Arc<dyn Fn(&[u8]) -> anyhow::Result<T> + Send + Sync>;

/// Decodes YAML into `T`.
pub fn yaml_loader<T: DeserializeOwned + 'static>() -> Loader<T> {
    Arc::new(|bytes: &[u8]| {
        serde_yaml::from_slice::<T>(bytes).context("invalid YAML runtime config")
    })
}

/// Decodes JSON into `T`.
pub fn json_loader<T: DeserializeOwned + 'static>() -> Loader<T> {
    Arc::new(|bytes: &[u8]| {
        serde_json::from_slice::<T>(bytes).context("invalid JSON runtime config")
    })
}
