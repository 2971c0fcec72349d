//! Runtime Config - periodically reloaded configuration with listener fan-out.
//!
//! This library provides a runtime configuration manager that polls a file in
//! object storage, decodes it, and hands the latest value to readers and
//! subscribed listeners, together with the binary that hosts it.

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod runtimeconfig;
pub mod service;
pub mod storage;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cli::{Cli, Commands, RunArgs};
use crate::config::AppSettings;
use crate::error::LoadError;
use crate::metrics::MetricsServer;
use crate::runtimeconfig::{content_hash, yaml_loader, Manager};
use crate::service::ServiceHandle;
use crate::storage::{bucket_client_factory, new_bucket_client, Bucket};

/// Runs the runtime-config binary with the provided CLI arguments.
pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.log_level())?;

    let mut settings = config::loader::load_or_default(cli.config.as_deref())
        .context("Failed to load settings")?;
    cli.overrides.apply(&mut settings);
    settings
        .runtime_config
        .validate()
        .context("Invalid settings")?;

    match cli.command {
        Commands::Run(args) => run_manager(settings, args).await,
        Commands::Check => check_config(settings).await,
    }
}

/// Initializes the tracing subscriber for structured logging.
fn setup_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(())
}

/// Runs the manager until Ctrl-C, logging every config update.
async fn run_manager(settings: AppSettings, args: RunArgs) -> Result<()> {
    info!("Starting runtime config manager");

    let registry = Registry::new();
    let manager = Arc::new(Manager::new(
        settings.runtime_config.clone(),
        yaml_loader::<serde_yaml::Value>(),
        &registry,
        bucket_client_factory(settings.runtime_config.storage.clone()),
    )?);

    let updates = manager.subscribe(1);
    let handle = ServiceHandle::start(Arc::clone(&manager));

    if handle.await_running().await.is_err() {
        handle
            .await_terminated()
            .await
            .context("Runtime config manager failed to start")?;
        anyhow::bail!("Runtime config manager stopped during startup");
    }

    let metrics_token = handle.cancellation_token().child_token();
    if settings.metrics.enabled && !args.no_metrics {
        let metrics_server = MetricsServer::new(registry.clone(), settings.metrics.port);
        let token = metrics_token.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics_server.start(token).await {
                error!(error = %e, "Prometheus server failed");
            }
        });
        info!(port = settings.metrics.port, "Prometheus metrics server started");
    }

    // Listener channels are blocking; the loop ends when the manager closes them.
    let update_logger = tokio::task::spawn_blocking(move || {
        while let Some(value) = updates.recv() {
            let keys = value.as_mapping().map(|m| m.len()).unwrap_or(0);
            info!(top_level_keys = keys, "Runtime config updated");
        }
    });

    info!("Runtime config manager is running. Press Ctrl+C to stop.");
    let outcome = stop_on_signal(tokio::signal::ctrl_c(), handle, metrics_token).await;
    update_logger
        .await
        .context("Update logger panicked")?;
    outcome?;

    info!("Runtime config manager stopped");
    Ok(())
}

/// Waits for `signal`, then stops the metrics server and the manager.
///
/// The manager is stopped even if waiting for the signal fails, so its
/// listeners are always closed.
async fn stop_on_signal<F>(
    signal: F,
    handle: ServiceHandle,
    metrics_token: CancellationToken,
) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let signal = signal
        .await
        .context("Failed to listen for shutdown signal");
    match &signal {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %format!("{e:#}"), "Stopping without a shutdown signal"),
    }

    metrics_token.cancel();
    let stopped = handle.stop_and_await().await;

    signal?;
    stopped?;
    Ok(())
}

/// Fetches and decodes the runtime config file once and prints it.
async fn check_config(settings: AppSettings) -> Result<()> {
    let runtime_config = &settings.runtime_config;
    if !runtime_config.is_enabled() {
        anyhow::bail!("runtime config file not specified");
    }

    let bucket = new_bucket_client(&runtime_config.storage)?;
    let buf = bucket
        .get(&runtime_config.file)
        .await
        .map_err(LoadError::Fetch)?;
    let hash = content_hash(&buf);

    let loader = yaml_loader::<serde_yaml::Value>();
    let value = loader(&buf).map_err(LoadError::Decode)?;

    println!("sha256: {}", hash);
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfigSettings;
    use crate::storage::{static_bucket_factory, MemoryBucket};

    #[tokio::test]
    async fn failed_signal_still_stops_the_manager() {
        let bucket = MemoryBucket::new();
        bucket.upload("cfg.yaml", "limits:\n  max_series: 10\n");
        let settings = RuntimeConfigSettings {
            file: "cfg.yaml".to_string(),
            ..Default::default()
        };
        let manager = Arc::new(
            Manager::new(
                settings,
                yaml_loader::<serde_yaml::Value>(),
                &Registry::new(),
                static_bucket_factory(Arc::new(bucket)),
            )
            .unwrap(),
        );
        let updates = manager.subscribe(1);

        let handle = ServiceHandle::start(Arc::clone(&manager));
        handle.await_running().await.unwrap();
        let metrics_token = handle.cancellation_token().child_token();

        let signal = async {
            Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no signal handler",
            ))
        };
        let err = stop_on_signal(signal, handle, metrics_token.clone())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("no signal handler"));
        assert!(metrics_token.is_cancelled());
        assert!(matches!(manager.reload().await, Err(LoadError::Stopped)));
        while updates.try_recv().is_some() {}
        assert!(updates.recv().is_none());
    }
}
