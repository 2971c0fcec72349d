//! Runtime configuration that can change without restarting the process.
//!
//! A [`Manager`] fetches a file from object storage every reload period,
//! decodes it with a caller-supplied [`Loader`], and keeps the result
//! available through [`Manager::get_config`] and listener channels.

pub mod cell;
pub mod decoder;
pub mod listeners;
pub mod manager;
pub mod metrics;

pub use cell::ConfigCell;
pub use decoder::{json_loader, yaml_loader, Loader};
pub use listeners::{Listener, ListenerId, ListenerRegistry};
pub use manager::{content_hash, Manager, ReloadStatus};
pub use metrics::ReloadMetrics;
