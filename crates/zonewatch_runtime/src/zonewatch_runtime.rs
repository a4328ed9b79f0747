//! Zonewatch Runtime - Service lifecycle for periodic simulations
//!
//! This crate contains the service trait, the service manager and the
//! per-service task loop that drives `on_tick` on a fixed interval.

pub mod service;

pub use service::{
    Event, Service, ServiceContext, ServiceError, ServiceHandle, ServiceManager, ServiceResult,
    ServiceSpec, ServiceState,
};
