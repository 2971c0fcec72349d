//! Three-phase service lifecycle host.
//!
//! A [`Service`] is driven through `starting`, `running` and `stopping` on a
//! dedicated tokio task. Cancelling the handle's token ends `running`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;

/// Lifecycle hooks of a long-running component.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Prepares the service. A failure here prevents `running` from being called.
    async fn starting(&self, token: CancellationToken) -> anyhow::Result<()>;

    /// Main body. Should return once `token` is cancelled.
    async fn running(&self, token: CancellationToken) -> anyhow::Result<()>;

    /// Releases resources. `failure` carries the error that ended the service, if any.
    async fn stopping(&self, failure: Option<&anyhow::Error>) -> anyhow::Result<()>;
}

/// Lifecycle state of a hosted service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    New,
    Starting,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl ServiceState {
    /// Returns true for states the service never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, ServiceState::Terminated | ServiceState::Failed)
    }
}

/// Handle to a service running on the tokio runtime.
pub struct ServiceHandle {
    name: String,
    token: CancellationToken,
    state_rx: watch::Receiver<ServiceState>,
    task: JoinHandle<Result<(), ServiceError>>,
}

impl ServiceHandle {
    /// Spawns the lifecycle of `service`.
    pub fn start<S: Service>(service: Arc<S>) -> Self {
        let name = service.name().to_string();
        let token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ServiceState::New);

        let task = tokio::spawn(run_lifecycle(service, token.clone(), state_tx));

        Self {
            name,
            token,
            state_rx,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        *self.state_rx.borrow()
    }

    /// Token cancelled by [`stop`](Self::stop). Cancelling it directly has the same effect.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits until the service is running.
    ///
    /// Returns an error if the service ends up anywhere else; the cause is
    /// reported by [`await_terminated`](Self::await_terminated).
    pub async fn await_running(&self) -> Result<(), ServiceError> {
        let mut rx = self.state_rx.clone();
        let state = *rx
            .wait_for(|s| !matches!(s, ServiceState::New | ServiceState::Starting))
            .await
            .map_err(|_| ServiceError::NotRunning {
                service: self.name.clone(),
            })?;

        match state {
            ServiceState::Running => Ok(()),
            _ => Err(ServiceError::NotRunning {
                service: self.name.clone(),
            }),
        }
    }

    /// Requests the service to stop.
    pub fn stop(&self) {
        debug!(service = %self.name, "stop requested");
        self.token.cancel();
    }

    /// Waits for the service to finish and returns its outcome.
    pub async fn await_terminated(self) -> Result<(), ServiceError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ServiceError::TaskAborted {
                service: self.name,
                message: e.to_string(),
            }),
        }
    }

    /// Stops the service and waits for it to finish.
    pub async fn stop_and_await(self) -> Result<(), ServiceError> {
        self.stop();
        self.await_terminated().await
    }
}

async fn run_lifecycle<S: Service>(
    service: Arc<S>,
    token: CancellationToken,
    state_tx: watch::Sender<ServiceState>,
) -> Result<(), ServiceError> {
    let name = service.name().to_string();

    state_tx.send_replace(ServiceState::Starting);
    if let Err(e) = service.starting(token.clone()).await {
        error!(service = %name, error = %format!("{e:#}"), "service failed to start");

        // Stopping runs after a failed start too, closing anything handed out earlier.
        if let Err(stop_err) = service.stopping(Some(&e)).await {
            warn!(
                service = %name,
                error = %format!("{stop_err:#}"),
                "stopping after failed start also failed"
            );
        }
        state_tx.send_replace(ServiceState::Failed);
        return Err(ServiceError::Starting {
            service: name,
            source: e,
        });
    }

    state_tx.send_replace(ServiceState::Running);
    info!(service = %name, "service running");

    let failure = service.running(token).await.err();

    state_tx.send_replace(ServiceState::Stopping);
    let stopped = service.stopping(failure.as_ref()).await;

    match (failure, stopped) {
        (Some(e), stopped) => {
            if let Err(stop_err) = stopped {
                warn!(
                    service = %name,
                    error = %format!("{stop_err:#}"),
                    "stopping after failure also failed"
                );
            }
            error!(service = %name, error = %format!("{e:#}"), "service failed");
            state_tx.send_replace(ServiceState::Failed);
            Err(ServiceError::Running {
                service: name,
                source: e,
            })
        }
        (None, Err(e)) => {
            state_tx.send_replace(ServiceState::Failed);
            Err(ServiceError::Stopping {
                service: name,
                source: e,
            })
        }
        (None, Ok(())) => {
            state_tx.send_replace(ServiceState::Terminated);
            info!(service = %name, "service stopped");
            Ok(())
        }
    }
}
