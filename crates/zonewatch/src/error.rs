//! Error types for configuring and loading a zone simulation.

use std::path::PathBuf;

/// Rejected simulation configuration.
///
/// Raised only while building a simulator or store; every operation on a
/// store that was built successfully is infallible.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Zone count must be between 1 and {}, got {0}", u32::MAX)]
    InvalidZoneCount(usize),

    #[error("Tick interval must be positive")]
    InvalidTickInterval,

    #[error("Invalid {name} range: min {min} > max {max} or bound not finite")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },
}

/// Error type for loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Config file does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}
