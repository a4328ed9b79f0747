//! Zone Simulation Service
//!
//! Runs a [`ZoneSimulationStore`] inside the service runtime: every tick
//! advances the random walk, and intent events update the filter or the
//! selection. Ticks and intents are handled one at a time on the service
//! task, so the store has a single writer.

use std::collections::BTreeSet;

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use zonewatch_runtime::{Event, Service, ServiceContext, ServiceError, ServiceResult, ServiceSpec};

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::intent::{ANY_INTENT, UserIntent};
use crate::store::{DashboardSnapshot, ZoneSimulationStore};
use crate::zone::ZoneId;

pub const SERVICE_ID: &str = "zone-simulation";

pub struct ZoneSimulationService<R = StdRng> {
    store: ZoneSimulationStore<R>,
    /// Zones that were alerting after the last tick
    active_alerts: BTreeSet<ZoneId>,
}

impl ZoneSimulationService<StdRng> {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_store(ZoneSimulationStore::new(config)?))
    }
}

impl<R: Rng> ZoneSimulationService<R> {
    pub fn from_store(store: ZoneSimulationStore<R>) -> Self {
        Self {
            store,
            active_alerts: BTreeSet::new(),
        }
    }

    /// Subscribe to snapshots; call before handing the service to a manager
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &ZoneSimulationStore<R> {
        &self.store
    }

    /// Log alerts that appeared or cleared since the previous check
    fn track_alerts(&mut self) {
        let current: BTreeSet<ZoneId> = self.store.alerts().iter().map(|alert| alert.id).collect();

        for id in current.difference(&self.active_alerts) {
            if let Some(zone) = self.store.zones().get(*id) {
                warn!(
                    zone = %zone.name,
                    room = %zone.room,
                    performance = zone.performance,
                    "Maintenance alert raised"
                );
            }
        }
        for id in self.active_alerts.difference(&current) {
            info!(zone = %id, "Maintenance alert cleared");
        }

        self.active_alerts = current;
    }
}

#[async_trait]
impl<R: Rng + Send + Sync + 'static> Service for ZoneSimulationService<R> {
    fn spec(&self) -> ServiceSpec {
        ServiceSpec::new(SERVICE_ID, "Zone Simulation")
            .with_tick_interval(self.store.config().tick_interval())
            .with_description("Simulated climate-control zones on a bounded random walk")
    }

    async fn on_start(&mut self, ctx: &ServiceContext) -> ServiceResult<()> {
        info!(
            service_id = %ctx.service_id,
            zones = self.store.zones().len(),
            interval_ms = self.store.config().tick_interval_ms,
            "Zone simulation starting"
        );
        self.track_alerts();
        Ok(())
    }

    async fn on_stop(&mut self, ctx: &ServiceContext) -> ServiceResult<()> {
        info!(
            service_id = %ctx.service_id,
            generation = self.store.zones().generation(),
            uptime_secs = ctx.uptime().as_secs(),
            "Zone simulation stopped"
        );
        Ok(())
    }

    async fn on_tick(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
        let generation = self.store.advance().generation();
        debug!(generation, "Zones advanced");
        self.track_alerts();
        Ok(())
    }

    async fn on_event(&mut self, _ctx: &ServiceContext, event: Event) -> ServiceResult<()> {
        if !event.matches(ANY_INTENT) {
            debug!(event_type = %event.event_type, "Ignoring non-intent event");
            return Ok(());
        }

        let intent =
            UserIntent::try_from(&event).map_err(|e| ServiceError::EventError(e.to_string()))?;
        debug!(?intent, source = %event.source, "Applying intent");
        self.store.apply(intent);
        Ok(())
    }
}
