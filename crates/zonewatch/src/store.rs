//! ZoneSimulationStore
//!
//! Owns the zone collection, the filter text, the selection and the random
//! source. Every change publishes a fresh [`DashboardSnapshot`] on a watch
//! channel; presentation layers read the derived views from the snapshot.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::intent::UserIntent;
use crate::simulation::{Simulator, ZoneCollection};
use crate::view::{self, Alert, ZoneSummary};
use crate::zone::{Zone, ZoneId};

// ─────────────────────────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────────────────────────

/// Selected zone, held by id and resolved against the live collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    None,
    Selected(ZoneId),
}

impl Selection {
    pub fn id(&self) -> Option<ZoneId> {
        match self {
            Selection::None => None,
            Selection::Selected(id) => Some(*id),
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, Selection::Selected(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a presentation layer needs to draw one frame
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub zones: ZoneCollection,
    pub filter: String,
    pub selection: Selection,
    pub updated_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub fn filtered(&self) -> Vec<&Zone> {
        view::filtered_view(&self.zones, &self.filter)
    }

    pub fn alerts(&self) -> Vec<Alert> {
        view::alerts(&self.zones)
    }

    pub fn selected(&self) -> Option<&Zone> {
        view::resolve_selection(&self.zones, self.selection.id())
    }

    pub fn summary(&self) -> ZoneSummary {
        view::summary(&self.zones, &self.filter)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

pub struct ZoneSimulationStore<R = StdRng> {
    simulator: Simulator,
    rng: R,
    zones: ZoneCollection,
    filter: String,
    selection: Selection,
    updates: watch::Sender<DashboardSnapshot>,
}

impl ZoneSimulationStore<StdRng> {
    /// Build a store seeded from `config.seed`, or from entropy when unset
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> ZoneSimulationStore<R> {
    /// Build a store around a caller-supplied random source
    pub fn with_rng(config: SimulationConfig, mut rng: R) -> Result<Self, ConfigError> {
        let simulator = Simulator::new(config)?;
        let zones = simulator.initialize(&mut rng);
        let (updates, _) = watch::channel(DashboardSnapshot {
            zones: zones.clone(),
            filter: String::new(),
            selection: Selection::None,
            updated_at: Utc::now(),
        });

        Ok(Self {
            simulator,
            rng,
            zones,
            filter: String::new(),
            selection: Selection::None,
            updates,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        self.simulator.config()
    }

    pub fn zones(&self) -> &ZoneCollection {
        &self.zones
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Replace the collection with one tick of the random walk
    pub fn advance(&mut self) -> &ZoneCollection {
        self.zones = self.simulator.tick(&self.zones, &mut self.rng);
        self.publish();
        &self.zones
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter = text.into();
        self.publish();
    }

    /// Select a zone by id. An id outside the collection is kept and simply
    /// resolves to nothing.
    pub fn select(&mut self, id: ZoneId) {
        self.selection = Selection::Selected(id);
        self.publish();
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
        self.publish();
    }

    pub fn apply(&mut self, intent: UserIntent) {
        match intent {
            UserIntent::SetFilter(text) => self.set_filter(text),
            UserIntent::Select(id) => self.select(id),
            UserIntent::ClearSelection | UserIntent::Escape => self.clear_selection(),
        }
    }

    pub fn filtered_view(&self) -> Vec<&Zone> {
        view::filtered_view(&self.zones, &self.filter)
    }

    pub fn alerts(&self) -> Vec<Alert> {
        view::alerts(&self.zones)
    }

    pub fn resolved_selection(&self) -> Option<&Zone> {
        view::resolve_selection(&self.zones, self.selection.id())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            zones: self.zones.clone(),
            filter: self.filter.clone(),
            selection: self.selection,
            updated_at: Utc::now(),
        }
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.updates.subscribe()
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}
