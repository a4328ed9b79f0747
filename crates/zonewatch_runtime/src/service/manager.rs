//! Service Manager
//!
//! Manages the lifecycle of all services, including spawning, stopping, and
//! the per-service tick loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::{
    Service, ServiceCommand, ServiceContext, ServiceError, ServiceHandle, ServiceResult,
    ServiceSpec, ServiceState,
};

// ─────────────────────────────────────────────────────────────────────────────
// Running Service
// ─────────────────────────────────────────────────────────────────────────────

/// Internal representation of a running service
struct RunningService {
    handle: ServiceHandle,
    join_handle: JoinHandle<ServiceResult<()>>,
    spec: ServiceSpec,
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Central manager for all services
///
/// The ServiceManager is responsible for:
/// - Spawning new services
/// - Stopping services, individually or all at once
/// - Aborting whatever is still running when it is dropped
pub struct ServiceManager {
    /// All running services indexed by service_id
    services: DashMap<String, RunningService>,

    /// Broadcast channel for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    /// Create a new service manager
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            services: DashMap::new(),
            shutdown_tx,
        }
    }

    /// Create a new service manager wrapped in an Arc
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Spawn a new service
    ///
    /// Returns a handle to the running service.
    pub async fn spawn<S: Service>(&self, service: S) -> ServiceResult<ServiceHandle> {
        let spec = service.spec();
        let service_id = spec.id.clone();

        // An id may be reused once the previous instance is gone
        if let Some(existing) = self.services.get(&service_id) {
            if !existing.handle.is_terminal() {
                return Err(ServiceError::AlreadyRunning(service_id));
            }
        }
        self.services.remove(&service_id);

        let (command_tx, command_rx) = mpsc::channel(256);
        let state = Arc::new(AtomicU8::new(ServiceState::Starting as u8));

        let handle = ServiceHandle::new(service_id.clone(), command_tx, Arc::clone(&state));
        let ctx = ServiceContext::new(service_id.clone());
        let shutdown_rx = self.shutdown_tx.subscribe();

        let tick_interval = spec.tick_interval;
        let shutdown_timeout = spec.shutdown_timeout;

        let join_handle = tokio::spawn(async move {
            run_service_loop(
                service,
                ctx,
                command_rx,
                shutdown_rx,
                state,
                tick_interval,
                shutdown_timeout,
            )
            .await
        });

        self.services.insert(
            service_id,
            RunningService {
                handle: handle.clone(),
                join_handle,
                spec,
            },
        );

        Ok(handle)
    }

    /// Stop a specific service and wait for its task to finish
    ///
    /// Stopping a service that is unknown or already stopped is a no-op.
    /// Once this returns, the service will not tick again.
    pub async fn stop(&self, service_id: &str) -> ServiceResult<()> {
        let Some((_, mut running)) = self.services.remove(service_id) else {
            tracing::debug!(service_id, "Stop requested for a service that is not running");
            return Ok(());
        };

        let _ = running.handle.shutdown().await;

        let timeout = running.spec.shutdown_timeout;
        match tokio::time::timeout(timeout, &mut running.join_handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(service_id, error = ?e, "Service task panicked");
                Err(ServiceError::Internal(format!("Task panicked: {:?}", e)))
            }
            Err(_) => {
                running.join_handle.abort();
                tracing::warn!(service_id, "Service shutdown timed out, task aborted");
                Err(ServiceError::ShutdownTimeout)
            }
        }
    }

    /// Initiate graceful shutdown of all services
    ///
    /// Every service is stopped even if an earlier one fails; the last error is
    /// returned.
    pub async fn shutdown_all(&self) -> ServiceResult<()> {
        tracing::info!("Initiating shutdown of all services");

        let _ = self.shutdown_tx.send(());

        let service_ids: Vec<String> = self
            .services
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut result = Ok(());
        for service_id in service_ids {
            if let Err(e) = self.stop(&service_id).await {
                result = Err(e);
            }
        }
        result
    }

    /// Managed services and their current state, sorted by id
    ///
    /// A service stays listed until it is stopped through the manager, so a
    /// service whose `on_start` failed shows up as [`ServiceState::Failed`].
    pub fn list(&self) -> Vec<(String, ServiceState)> {
        let mut services: Vec<_> = self
            .services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().handle.state()))
            .collect();
        services.sort_by(|a, b| a.0.cmp(&b.0));
        services
    }
}

impl Drop for ServiceManager {
    fn drop(&mut self) {
        for entry in self.services.iter() {
            if !entry.handle.is_terminal() {
                tracing::debug!(service_id = %entry.key(), "Aborting service on manager drop");
            }
            entry.join_handle.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Task Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Build the tick timer. The first tick fires one period after start.
fn tick_timer(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Run the main service loop
async fn run_service_loop<S: Service>(
    mut service: S,
    ctx: ServiceContext,
    mut command_rx: mpsc::Receiver<ServiceCommand>,
    mut shutdown_rx: broadcast::Receiver<()>,
    state: Arc<AtomicU8>,
    tick_interval: Option<Duration>,
    shutdown_timeout: Duration,
) -> ServiceResult<()> {
    state.store(ServiceState::Starting as u8, Ordering::SeqCst);

    if let Err(e) = service.on_start(&ctx).await {
        tracing::error!(
            service_id = %ctx.service_id,
            error = %e,
            "Service failed to start"
        );
        state.store(ServiceState::Failed as u8, Ordering::SeqCst);
        return Err(e);
    }

    state.store(ServiceState::Running as u8, Ordering::SeqCst);
    tracing::info!(service_id = %ctx.service_id, "Service started");

    let mut tick_timer = match tick_interval {
        Some(period) if period.is_zero() => {
            tracing::warn!(service_id = %ctx.service_id, "Zero tick interval, ticking disabled");
            None
        }
        Some(period) => Some(tick_timer(period)),
        None => None,
    };

    loop {
        tokio::select! {
            // Shutdown and commands win over a tick that is ready at the same time
            biased;

            _ = shutdown_rx.recv() => {
                tracing::debug!(service_id = %ctx.service_id, "Received global shutdown signal");
                break;
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(ServiceCommand::Shutdown) | None => {
                        tracing::debug!(service_id = %ctx.service_id, "Received shutdown command");
                        break;
                    }
                    Some(ServiceCommand::Event(event)) => {
                        if let Err(e) = service.on_event(&ctx, event).await {
                            tracing::warn!(
                                service_id = %ctx.service_id,
                                error = %e,
                                "Error handling event"
                            );
                        }
                    }
                    Some(ServiceCommand::GetState(tx)) => {
                        let current = ServiceState::from_u8(state.load(Ordering::SeqCst));
                        let _ = tx.send(current);
                    }
                    Some(ServiceCommand::ForceTick) => {
                        if let Err(e) = service.on_tick(&ctx).await {
                            tracing::warn!(
                                service_id = %ctx.service_id,
                                error = %e,
                                "Error during forced tick"
                            );
                        }
                    }
                }
            }

            _ = async {
                if let Some(ref mut timer) = tick_timer {
                    timer.tick().await
                } else {
                    std::future::pending::<Instant>().await
                }
            } => {
                if let Err(e) = service.on_tick(&ctx).await {
                    tracing::warn!(
                        service_id = %ctx.service_id,
                        error = %e,
                        "Error during tick"
                    );
                }
            }
        }
    }

    // The timer is released here; nothing below may tick
    drop(tick_timer);
    state.store(ServiceState::Stopping as u8, Ordering::SeqCst);
    tracing::debug!(service_id = %ctx.service_id, "Service stopping");

    let stop_result = tokio::time::timeout(shutdown_timeout, service.on_stop(&ctx)).await;

    match stop_result {
        Ok(Ok(())) => {
            state.store(ServiceState::Stopped as u8, Ordering::SeqCst);
            tracing::info!(service_id = %ctx.service_id, "Service stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            state.store(ServiceState::Failed as u8, Ordering::SeqCst);
            tracing::error!(service_id = %ctx.service_id, error = %e, "Service stop failed");
            Err(e)
        }
        Err(_) => {
            state.store(ServiceState::Failed as u8, Ordering::SeqCst);
            tracing::error!(service_id = %ctx.service_id, "Service stop timed out");
            Err(ServiceError::ShutdownTimeout)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Event;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Default)]
    struct Counters {
        start: Arc<AtomicUsize>,
        stop: Arc<AtomicUsize>,
        event: Arc<AtomicUsize>,
        tick: Arc<AtomicUsize>,
    }

    struct CountingService {
        id: String,
        tick_interval: Option<Duration>,
        fail_start: bool,
        counters: Counters,
    }

    impl CountingService {
        fn new(id: &str, tick_interval: Option<Duration>) -> (Self, Counters) {
            let counters = Counters::default();
            (
                Self {
                    id: id.to_string(),
                    tick_interval,
                    fail_start: false,
                    counters: counters.clone(),
                },
                counters,
            )
        }
    }

    #[async_trait::async_trait]
    impl Service for CountingService {
        fn spec(&self) -> ServiceSpec {
            let spec = ServiceSpec::new(&self.id, "Counting Service");
            match self.tick_interval {
                Some(interval) => spec.with_tick_interval(interval),
                None => spec,
            }
        }

        async fn on_start(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
            if self.fail_start {
                return Err(ServiceError::Internal("refused".to_string()));
            }
            self.counters.start.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_stop(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
            self.counters.stop.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_event(&mut self, _ctx: &ServiceContext, _event: Event) -> ServiceResult<()> {
            self.counters.event.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_tick(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
            self.counters.tick.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_spawn_and_stop_service() {
        let manager = ServiceManager::new();
        let (service, counters) = CountingService::new("test-service", None);

        let handle = manager.spawn(service).await.unwrap();

        // GetState is only answered once on_start has completed
        assert_eq!(handle.request_state().await.unwrap(), ServiceState::Running);
        assert_eq!(counters.start.load(Ordering::SeqCst), 1);
        assert!(handle.is_running());
        assert_eq!(
            manager.list(),
            vec![("test-service".to_string(), ServiceState::Running)]
        );

        manager.stop("test-service").await.unwrap();

        assert_eq!(counters.stop.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), ServiceState::Stopped);
        assert!(manager.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_interval_and_stop_after_cancel() {
        let manager = ServiceManager::new();
        let (service, counters) =
            CountingService::new("ticker", Some(Duration::from_millis(100)));

        manager.spawn(service).await.unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(counters.tick.load(Ordering::SeqCst), 3);

        manager.stop("ticker").await.unwrap();
        let ticks_at_stop = counters.tick.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counters.tick.load(Ordering::SeqCst), ticks_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let manager = ServiceManager::new();
        let (service, counters) =
            CountingService::new("patient", Some(Duration::from_millis(2200)));

        let handle = manager.spawn(service).await.unwrap();
        handle.request_state().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(counters.tick.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counters.tick.load(Ordering::SeqCst), 1);

        manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let manager = ServiceManager::new();
        let (service, counters) = CountingService::new("twice", None);

        let handle = manager.spawn(service).await.unwrap();

        manager.stop("twice").await.unwrap();
        manager.stop("twice").await.unwrap();
        manager.stop("never-spawned").await.unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(counters.stop.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_event_delivery_and_force_tick() {
        let manager = ServiceManager::new();
        let (service, counters) = CountingService::new("event-service", None);

        let handle = manager.spawn(service).await.unwrap();

        handle
            .send_event(Event::now("Intent/Escape", "test"))
            .await
            .unwrap();
        handle.force_tick().await.unwrap();

        // Commands are handled in order, so this waits for both above
        handle.request_state().await.unwrap();

        assert_eq!(counters.event.load(Ordering::SeqCst), 1);
        assert_eq!(counters.tick.load(Ordering::SeqCst), 1);

        manager.shutdown_all().await.unwrap();
        assert!(matches!(
            handle.force_tick().await,
            Err(ServiceError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected_while_running() {
        let manager = ServiceManager::new();
        let (first, _) = CountingService::new("zones", None);
        let (second, _) = CountingService::new("zones", None);
        let (other, _) = CountingService::new("alarms", None);

        let handle = manager.spawn(first).await.unwrap();
        handle.request_state().await.unwrap();

        let result = manager.spawn(second).await;
        assert!(matches!(result, Err(ServiceError::AlreadyRunning(_))));

        let other = manager.spawn(other).await.unwrap();
        other.request_state().await.unwrap();
        assert_eq!(
            manager.list(),
            vec![
                ("alarms".to_string(), ServiceState::Running),
                ("zones".to_string(), ServiceState::Running),
            ]
        );

        // The id is free again once the first instance has stopped
        manager.stop("zones").await.unwrap();
        let (again, _) = CountingService::new("zones", None);
        manager.spawn(again).await.unwrap();

        manager.shutdown_all().await.unwrap();
        assert!(manager.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_never_ticks() {
        let manager = ServiceManager::new();
        let (mut service, counters) =
            CountingService::new("broken", Some(Duration::from_millis(10)));
        service.fail_start = true;

        manager.spawn(service).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counters.tick.load(Ordering::SeqCst), 0);
        assert_eq!(
            manager.list(),
            vec![("broken".to_string(), ServiceState::Failed)]
        );
        assert!(matches!(
            manager.stop("broken").await,
            Err(ServiceError::Internal(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_running_services() {
        let manager = ServiceManager::new();
        let (service, counters) =
            CountingService::new("orphan", Some(Duration::from_millis(100)));

        manager.spawn(service).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let ticks_before_drop = counters.tick.load(Ordering::SeqCst);

        drop(manager);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(counters.tick.load(Ordering::SeqCst), ticks_before_drop);
    }
}
