//! Periodic services
//!
//! A service owns its state and is driven by one tokio task, which calls
//! `on_start` once, then `on_tick` on a fixed cadence and `on_event` for each
//! event sent through its handle, and finally `on_stop`. Ticks, events and
//! forced ticks are handled one at a time in arrival order. Once `on_stop`
//! has been entered, `on_tick` is never called again.

mod event;
mod handle;
mod manager;

pub use event::*;
pub use handle::*;
pub use manager::*;

use std::time::{Duration, Instant};

use async_trait::async_trait;

// ─────────────────────────────────────────────────────────────────────────────
// Service Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by services and the manager
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Service already running: {0}")]
    AlreadyRunning(String),

    #[error("Service not running: {0}")]
    NotRunning(String),

    #[error("Event handling failed: {0}")]
    EventError(String),

    #[error("Shutdown timeout")]
    ShutdownTimeout,

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

// ─────────────────────────────────────────────────────────────────────────────
// Service Spec
// ─────────────────────────────────────────────────────────────────────────────

/// How the manager should run a service
///
/// The id is unique among live services: spawning a second service with the
/// id of one that has not stopped fails with [`ServiceError::AlreadyRunning`].
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub id: String,
    pub name: String,

    /// Cadence of `on_tick`; `None` means the service only reacts to events
    pub tick_interval: Option<Duration>,

    /// How long `stop` waits for the task before aborting it
    pub shutdown_timeout: Duration,

    pub description: Option<String>,
}

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

impl ServiceSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tick_interval: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            description: None,
        }
    }

    /// Set tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Set shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context passed to service lifecycle methods
#[derive(Debug, Clone)]
pub struct ServiceContext {
    /// Service unique identifier
    pub service_id: String,

    started_at: Instant,
}

impl ServiceContext {
    /// Create a new service context
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            started_at: Instant::now(),
        }
    }

    /// Time elapsed since the service task was spawned
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A component with lifecycle hooks, run by the [`ServiceManager`]
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns the service specification
    fn spec(&self) -> ServiceSpec;

    /// Runs before anything else. On error the service moves to
    /// [`ServiceState::Failed`] and never ticks.
    async fn on_start(&mut self, ctx: &ServiceContext) -> ServiceResult<()>;

    /// Runs after the last tick. The task ends even if this fails.
    async fn on_stop(&mut self, ctx: &ServiceContext) -> ServiceResult<()>;

    /// Handles one event sent through the handle. An error is logged and the
    /// service keeps running.
    async fn on_event(&mut self, _ctx: &ServiceContext, _event: Event) -> ServiceResult<()> {
        Ok(())
    }

    /// Runs once per tick interval, and on [`ServiceHandle::force_tick`]
    async fn on_tick(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_spec_builder() {
        let spec = ServiceSpec::new("zones", "Zone Simulation")
            .with_tick_interval(Duration::from_millis(2200))
            .with_shutdown_timeout(Duration::from_secs(1))
            .with_description("Simulated climate zones");

        assert_eq!(spec.id, "zones");
        assert_eq!(spec.name, "Zone Simulation");
        assert_eq!(spec.tick_interval, Some(Duration::from_millis(2200)));
        assert_eq!(spec.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(spec.description.as_deref(), Some("Simulated climate zones"));
    }

    #[test]
    fn test_service_spec_defaults() {
        let spec = ServiceSpec::new("plain", "Plain");

        assert_eq!(spec.tick_interval, None);
        assert_eq!(spec.description, None);
        assert_eq!(spec.shutdown_timeout, Duration::from_secs(5));
    }
}
