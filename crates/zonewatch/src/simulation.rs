//! Zone generation and the bounded random walk applied on every tick.

use std::sync::Arc;

use rand::Rng;

use crate::config::{SimulationConfig, ValueRange};
use crate::error::ConfigError;
use crate::zone::{Zone, ZoneId, round1};

// ─────────────────────────────────────────────────────────────────────────────
// Zone Collection
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable snapshot of every zone, in ascending id order.
///
/// Cloning is cheap and never copies zone records. Each tick produces a new
/// collection with a higher generation, so a holder of an older collection
/// never observes a partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCollection {
    zones: Arc<[Zone]>,
    generation: u64,
}

impl ZoneCollection {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones: zones.into(),
            generation: 0,
        }
    }

    fn next(&self, zones: Vec<Zone>) -> Self {
        Self {
            zones: zones.into(),
            generation: self.generation + 1,
        }
    }

    /// Number of ticks applied since initialization
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Zone> {
        self.zones.iter()
    }

    pub fn as_slice(&self) -> &[Zone] {
        &self.zones
    }

    /// Look up a zone by id
    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        // Ids are dense, so the zone normally sits at index id - 1
        let index = (id.get() as usize).checked_sub(1)?;
        match self.zones.get(index) {
            Some(zone) if zone.id == id => Some(zone),
            _ => self.zones.iter().find(|zone| zone.id == id),
        }
    }

    /// True when both collections share the same underlying snapshot
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.zones, &other.zones)
    }
}

impl<'a> IntoIterator for &'a ZoneCollection {
    type Item = &'a Zone;
    type IntoIter = std::slice::Iter<'a, Zone>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulator
// ─────────────────────────────────────────────────────────────────────────────

/// Generates zones and advances them with a validated configuration.
///
/// The random source is always supplied by the caller.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Create `zone_count` zones with ids `1..=zone_count` and uniformly
    /// random readings inside the configured ranges
    pub fn initialize<R: Rng + ?Sized>(&self, rng: &mut R) -> ZoneCollection {
        // zone_count fits in u32, checked by validate()
        let count = self.config.zone_count as u32;
        let zones = (1..=count)
            .map(|id| {
                let temperature = settle(sample(&self.config.temperature, rng), &self.config.temperature);
                let performance = settle(sample(&self.config.performance, rng), &self.config.performance);
                Zone::new(ZoneId(id), temperature, performance)
            })
            .collect();

        tracing::debug!(zones = count, "Generated zone collection");
        ZoneCollection::new(zones)
    }

    /// Perturb every zone by a bounded random step
    ///
    /// Identity, labels, order and size are preserved; only temperature and
    /// performance change, and both stay inside their ranges.
    pub fn tick<R: Rng + ?Sized>(&self, current: &ZoneCollection, rng: &mut R) -> ZoneCollection {
        let config = &self.config;
        let zones = current
            .iter()
            .map(|zone| {
                let temperature = zone.temperature + sample(&config.temperature_step, rng);
                let performance = zone.performance + sample(&config.performance_step, rng);
                Zone {
                    temperature: settle(temperature, &config.temperature),
                    performance: settle(performance, &config.performance),
                    ..zone.clone()
                }
            })
            .collect();

        current.next(zones)
    }
}

fn sample<R: Rng + ?Sized>(range: &ValueRange, rng: &mut R) -> f64 {
    rng.gen_range(range.min..=range.max)
}

// Round first so clamping has the final word on the range
fn settle(value: f64, range: &ValueRange) -> f64 {
    range.clamp(round1(value))
}
