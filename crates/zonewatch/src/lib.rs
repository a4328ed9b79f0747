//! Zonewatch - Simulated climate-zone monitoring
//!
//! This crate provides the simulation core behind a zone dashboard:
//! - Zone generation and a bounded random walk over temperature and HVAC performance
//! - Derived read models: filtered list, maintenance alerts, selected zone
//! - A store that owns filter and selection state and publishes snapshots
//! - A runtime service that ticks the store on a fixed interval

pub mod config;
pub mod error;
pub mod intent;
pub mod service;
pub mod simulation;
pub mod store;
pub mod view;
pub mod zone;

pub use config::{SimulationConfig, ValueRange};
pub use error::{ConfigError, LoadError};
pub use intent::UserIntent;
pub use service::ZoneSimulationService;
pub use simulation::{Simulator, ZoneCollection};
pub use store::{DashboardSnapshot, Selection, ZoneSimulationStore};
pub use view::{Alert, PerformanceBand, TemperatureBand, ZoneSummary};
pub use zone::{Zone, ZoneId};
