//! Simulation Configuration
//!
//! Zone count, tick cadence, value ranges and per-tick step bounds. Every
//! field has a default, so an empty TOML file is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::error::{ConfigError, LoadError};

/// Closed interval `[min, max]`. `min == max` is a valid single-valued range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Finite bounds, `min <= max`, and a width that fits in an `f64`
    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite()
            || !self.max.is_finite()
            || self.min > self.max
            || !self.width().is_finite()
        {
            return Err(ConfigError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

pub const DEFAULT_ZONE_COUNT: usize = 100;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2200;
pub const DEFAULT_TEMPERATURE: ValueRange = ValueRange::new(17.0, 32.0);
pub const DEFAULT_PERFORMANCE: ValueRange = ValueRange::new(30.0, 100.0);
pub const DEFAULT_TEMPERATURE_STEP: ValueRange = ValueRange::new(-0.6, 0.7);
pub const DEFAULT_PERFORMANCE_STEP: ValueRange = ValueRange::new(-3.0, 2.0);

/// Simulation configuration (zonewatch.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of zones, fixed for the lifetime of a store
    pub zone_count: usize,
    /// Milliseconds between simulation ticks
    pub tick_interval_ms: u64,
    /// Allowed temperature values (°C)
    pub temperature: ValueRange,
    /// Allowed HVAC performance values (%)
    pub performance: ValueRange,
    /// Bounds of the per-tick temperature delta
    pub temperature_step: ValueRange,
    /// Bounds of the per-tick performance delta
    pub performance_step: ValueRange,
    /// Seed for a reproducible run; entropy-seeded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            zone_count: DEFAULT_ZONE_COUNT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            temperature: DEFAULT_TEMPERATURE,
            performance: DEFAULT_PERFORMANCE,
            temperature_step: DEFAULT_TEMPERATURE_STEP,
            performance_step: DEFAULT_PERFORMANCE_STEP,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn with_zone_count(mut self, zone_count: usize) -> Self {
        self.zone_count = zone_count;
        self
    }

    pub fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check every field, reporting the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zone_count == 0 || u32::try_from(self.zone_count).is_err() {
            return Err(ConfigError::InvalidZoneCount(self.zone_count));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        self.temperature.validate("temperature")?;
        self.performance.validate("performance")?;
        self.temperature_step.validate("temperature step")?;
        self.performance_step.validate("performance step")?;
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::PathNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "Loaded simulation config from {}: {} zones every {} ms",
            path.display(),
            config.zone_count,
            config.tick_interval_ms
        );
        Ok(config)
    }
}
