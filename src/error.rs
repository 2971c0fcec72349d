//! Error types for the runtime configuration manager.

use std::path::PathBuf;
use thiserror::Error;

/// Settings file loading and validation errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Object storage errors. Always treated as transient by the reload loop.
#[derive(Error, Debug)]
pub enum BucketError {
    #[error("object '{path}' not found")]
    NotFound { path: String },

    #[error("failed to read object '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("bucket unavailable: {0}")]
    Unavailable(String),
}

/// Errors from a single reload cycle.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read file: {0}")]
    Fetch(#[from] BucketError),

    #[error("load file: {0:#}")]
    Decode(#[source] anyhow::Error),

    #[error("bucket client not initialized")]
    NotStarted,

    #[error("runtime config manager stopped")]
    Stopped,
}

/// Errors raised while creating or starting the manager.
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("invalid runtime config settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("failed to register runtime config metrics: {0}")]
    Metrics(#[from] MetricsError),

    #[error("failed to create bucket client: {0}")]
    BucketClient(#[source] BucketError),

    #[error("failed to load runtime config: {0}")]
    Startup(#[source] LoadError),
}

/// Lifecycle failures reported by a service host.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("service '{service}' failed to start: {source:#}")]
    Starting {
        service: String,
        source: anyhow::Error,
    },

    #[error("service '{service}' failed while running: {source:#}")]
    Running {
        service: String,
        source: anyhow::Error,
    },

    #[error("service '{service}' failed to stop: {source:#}")]
    Stopping {
        service: String,
        source: anyhow::Error,
    },

    #[error("service '{service}' terminated before reaching the running state")]
    NotRunning { service: String },

    #[error("service '{service}' task aborted: {message}")]
    TaskAborted { service: String, message: String },
}

/// Metrics registration and export errors.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to register collector: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("Failed to encode metrics: {0}")]
    Encode(String),

    #[error("Metrics server failed: {0}")]
    Server(String),
}
