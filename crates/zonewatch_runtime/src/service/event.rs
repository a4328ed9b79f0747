//! Service Events
//!
//! Events carry requests from the host (user intents, operator commands) into
//! a running service.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

/// An event delivered to a service through its handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type identifier (e.g., "Intent/Select")
    pub event_type: String,

    /// Source that generated the event (e.g., "stdin")
    pub source: String,

    /// Event payload data
    pub data: serde_json::Value,

    /// Timestamp when event was created (Unix milliseconds)
    pub timestamp: u64,
}

impl Event {
    /// Create a new event
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            data,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }

    /// Create an event without payload
    pub fn now(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(event_type, source, serde_json::Value::Null)
    }

    /// Check if this event matches a pattern
    ///
    /// Patterns support:
    /// - Exact match: "Intent/Escape" matches "Intent/Escape"
    /// - Wildcard suffix: "Intent/*" matches "Intent/Select", "Intent/Escape"
    /// - Global wildcard: "*" matches everything
    pub fn matches(&self, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if let Some(prefix) = pattern.strip_suffix('*') {
            if prefix.ends_with('/') {
                return self.event_type.starts_with(prefix);
            }
        }

        self.event_type == pattern
    }

    /// Deserialize the event data to a specific type
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
