//! Handles to running services
//!
//! A [`ServiceHandle`] is the only way into a service task: every request
//! becomes a [`ServiceCommand`] on the task's queue, so it is ordered with
//! respect to ticks and other requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{mpsc, oneshot};

use super::{Event, ServiceError, ServiceResult};

// ─────────────────────────────────────────────────────────────────────────────
// Service State
// ─────────────────────────────────────────────────────────────────────────────

/// Where a service task is in its lifecycle
///
/// `Starting -> Running -> Stopping -> Stopped`, with `Failed` reachable from
/// `Starting` (start hook failed) or `Stopping` (stop hook failed or timed out).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    Starting = 0,
    Running = 1,
    /// No further ticks; `on_stop` is in progress
    Stopping = 2,
    Stopped = 3,
    Failed = 4,
}

impl ServiceState {
    /// Unknown values decode as `Failed`
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Stopping,
            3 => Self::Stopped,
            _ => Self::Failed,
        }
    }

    /// The task has finished and will never tick again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Stopped | ServiceState::Failed)
    }

    pub fn is_running(&self) -> bool {
        *self == ServiceState::Running
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Starting => write!(f, "starting"),
            ServiceState::Running => write!(f, "running"),
            ServiceState::Stopping => write!(f, "stopping"),
            ServiceState::Stopped => write!(f, "stopped"),
            ServiceState::Failed => write!(f, "failed"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Command
// ─────────────────────────────────────────────────────────────────────────────

/// Requests queued to a service task, handled in order
pub enum ServiceCommand {
    Event(Event),
    /// Run `on_tick` now, outside the regular cadence
    ForceTick,
    Shutdown,
    /// Answered once every earlier command has been handled
    GetState(oneshot::Sender<ServiceState>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable sender side of a service task
#[derive(Clone)]
pub struct ServiceHandle {
    pub service_id: String,
    command_tx: mpsc::Sender<ServiceCommand>,
    /// Written only by the service task
    state: Arc<AtomicU8>,
}

impl ServiceHandle {
    pub(crate) fn new(
        service_id: String,
        command_tx: mpsc::Sender<ServiceCommand>,
        state: Arc<AtomicU8>,
    ) -> Self {
        Self {
            service_id,
            command_tx,
            state,
        }
    }

    /// Last state published by the task, without waiting on it
    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Queue an event for `on_event`
    pub async fn send_event(&self, event: Event) -> ServiceResult<()> {
        self.send(ServiceCommand::Event(event)).await
    }

    /// Run one tick immediately
    pub async fn force_tick(&self) -> ServiceResult<()> {
        self.send(ServiceCommand::ForceTick).await
    }

    /// Ask the task to stop after the commands already queued
    ///
    /// Succeeds without doing anything if the service has already stopped.
    /// Use [`ServiceManager::stop`](super::ServiceManager::stop) to also wait
    /// for the task to finish.
    pub async fn shutdown(&self) -> ServiceResult<()> {
        if self.is_terminal() {
            return Ok(());
        }
        // A send error means the loop exited after the state check
        let _ = self.command_tx.send(ServiceCommand::Shutdown).await;
        Ok(())
    }

    /// State as seen by the task once it reaches this request in its queue
    pub async fn request_state(&self) -> ServiceResult<ServiceState> {
        let (tx, rx) = oneshot::channel();
        self.send(ServiceCommand::GetState(tx)).await?;

        rx.await.map_err(|_| ServiceError::ChannelClosed)
    }

    async fn send(&self, command: ServiceCommand) -> ServiceResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ServiceError::NotRunning(self.service_id.clone()))
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("service_id", &self.service_id)
            .field("state", &self.state())
            .finish()
    }
}
