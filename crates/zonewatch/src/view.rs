//! Read models derived from a zone collection.
//!
//! Everything here is a pure function of its inputs; calling any of them twice
//! with the same arguments gives the same answer.

use serde::{Deserialize, Serialize};

use crate::simulation::ZoneCollection;
use crate::zone::{Zone, ZoneId};

/// Zones below this performance need maintenance
pub const MAINTENANCE_THRESHOLD: f64 = 50.0;
/// Zones below this performance are degraded but still serviceable
pub const DEGRADED_THRESHOLD: f64 = 65.0;
/// Temperatures below this are shown as cool
pub const COOL_BELOW: f64 = 20.0;
/// Temperatures above this are shown as hot
pub const HOT_ABOVE: f64 = 28.0;

// ─────────────────────────────────────────────────────────────────────────────
// Status Bands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureBand {
    Cool,
    Comfortable,
    Hot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceBand {
    /// Maintenance required
    Critical,
    Degraded,
    Good,
}

impl Zone {
    pub fn temperature_band(&self) -> TemperatureBand {
        if self.temperature > HOT_ABOVE {
            TemperatureBand::Hot
        } else if self.temperature < COOL_BELOW {
            TemperatureBand::Cool
        } else {
            TemperatureBand::Comfortable
        }
    }

    pub fn performance_band(&self) -> PerformanceBand {
        if self.performance < MAINTENANCE_THRESHOLD {
            PerformanceBand::Critical
        } else if self.performance < DEGRADED_THRESHOLD {
            PerformanceBand::Degraded
        } else {
            PerformanceBand::Good
        }
    }

    pub fn needs_maintenance(&self) -> bool {
        self.performance_band() == PerformanceBand::Critical
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Filtering
// ─────────────────────────────────────────────────────────────────────────────

/// Zones whose name or room contains `filter`, ignoring case, in id order.
///
/// An empty or whitespace-only filter returns every zone. Any other filter
/// is matched as-is, whitespace included.
pub fn filtered_view<'a>(zones: &'a ZoneCollection, filter: &str) -> Vec<&'a Zone> {
    if filter.trim().is_empty() {
        return zones.iter().collect();
    }
    let term = filter.to_lowercase();

    zones
        .iter()
        .filter(|zone| {
            zone.name.to_lowercase().contains(&term) || zone.room.to_lowercase().contains(&term)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Alerts
// ─────────────────────────────────────────────────────────────────────────────

/// Maintenance alert for one underperforming zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: ZoneId,
    pub message: String,
}

impl Alert {
    fn for_zone(zone: &Zone) -> Self {
        Self {
            id: zone.id,
            message: format!(
                "Maintenance Required: {} ({}) -- Performance at {}%",
                zone.name,
                zone.room,
                zone.performance.round() as i64
            ),
        }
    }
}

/// One alert per zone with performance below 50 %, in id order
pub fn alerts(zones: &ZoneCollection) -> Vec<Alert> {
    zones
        .iter()
        .filter(|zone| zone.needs_maintenance())
        .map(Alert::for_zone)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────────────────────────

/// The current zone for a selected id, if it exists.
///
/// Resolution ignores the filter: a selected zone that is filtered out of the
/// list still resolves.
pub fn resolve_selection(zones: &ZoneCollection, id: Option<ZoneId>) -> Option<&Zone> {
    id.and_then(|id| zones.get(id))
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────────────────

/// Headline numbers for a dashboard header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub total: usize,
    pub shown: usize,
    pub alerting: usize,
    pub degraded: usize,
    pub mean_temperature: f64,
    pub mean_performance: f64,
}

pub fn summary(zones: &ZoneCollection, filter: &str) -> ZoneSummary {
    let total = zones.len();
    let count_band = |band| {
        zones
            .iter()
            .filter(|zone| zone.performance_band() == band)
            .count()
    };
    let mean = |value: fn(&Zone) -> f64| {
        if total == 0 {
            0.0
        } else {
            zones.iter().map(value).sum::<f64>() / total as f64
        }
    };

    ZoneSummary {
        total,
        shown: filtered_view(zones, filter).len(),
        alerting: count_band(PerformanceBand::Critical),
        degraded: count_band(PerformanceBand::Degraded),
        mean_temperature: mean(|zone| zone.temperature),
        mean_performance: mean(|zone| zone.performance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: u32, temperature: f64, performance: f64) -> Zone {
        Zone::new(ZoneId(id), temperature, performance)
    }

    fn collection(count: u32) -> ZoneCollection {
        ZoneCollection::new((1..=count).map(|id| zone(id, 22.0, 80.0)).collect())
    }

    fn ids(zones: &[&Zone]) -> Vec<u32> {
        zones.iter().map(|zone| zone.id.get()).collect()
    }

    #[test]
    fn test_empty_filter_returns_everything() {
        let zones = collection(30);

        for filter in ["", "   ", "\t"] {
            let view = filtered_view(&zones, filter);
            assert_eq!(view.len(), 30);
            assert!(view.iter().copied().eq(zones.iter()));
        }
    }

    #[test]
    fn test_filter_is_case_insensitive_on_name_and_room() {
        let zones = collection(60);

        // Room A5 is zone 5
        assert_eq!(ids(&filtered_view(&zones, "a5")), vec![5]);
        assert_eq!(ids(&filtered_view(&zones, "ROOM A5")), vec![5]);

        // Zone 5 and Zone 50..=59
        let view = filtered_view(&zones, "ZONE 5");
        assert_eq!(ids(&view), vec![5, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59]);

        assert!(filtered_view(&zones, "lobby").is_empty());
    }

    #[test]
    fn test_filter_whitespace_is_part_of_the_term() {
        let zones = collection(20);

        // No label ends in "Zone 1 "
        assert!(filtered_view(&zones, "zone 1 ").is_empty());
        assert!(filtered_view(&zones, "  zone 12 ").is_empty());

        // " 5" only matches names, never "Room A5"
        assert_eq!(ids(&filtered_view(&zones, " 5")), vec![5]);
        assert_eq!(ids(&filtered_view(&zones, "a5")), vec![5]);
    }

    #[test]
    fn test_filter_matches_room_letters() {
        let zones = collection(30);
        let view = filtered_view(&zones, "room c");
        assert_eq!(ids(&view), (21..=30).collect::<Vec<_>>());
    }

    #[test]
    fn test_alerts_use_a_strict_threshold() {
        let zones = ZoneCollection::new(vec![
            zone(1, 22.0, 49.9),
            zone(2, 22.0, 50.0),
            zone(3, 22.0, 30.0),
            zone(4, 22.0, 95.0),
        ]);

        let alerts = alerts(&zones);
        assert_eq!(alerts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![ZoneId(1), ZoneId(3)]);
        assert_eq!(
            alerts[0].message,
            "Maintenance Required: Zone 1 (Room A1) -- Performance at 50%"
        );
        assert_eq!(
            alerts[1].message,
            "Maintenance Required: Zone 3 (Room A3) -- Performance at 30%"
        );
    }

    #[test]
    fn test_alert_percentage_rounds_to_nearest() {
        let zones = ZoneCollection::new(vec![zone(1, 22.0, 42.5), zone(2, 22.0, 42.4)]);
        let alerts = alerts(&zones);
        assert!(alerts[0].message.ends_with("at 43%"));
        assert!(alerts[1].message.ends_with("at 42%"));
    }

    #[test]
    fn test_views_are_repeatable() {
        let zones = ZoneCollection::new(vec![zone(1, 18.0, 40.0), zone(2, 30.0, 60.0)]);

        assert_eq!(alerts(&zones), alerts(&zones));
        assert_eq!(filtered_view(&zones, "zone"), filtered_view(&zones, "zone"));
    }

    #[test]
    fn test_resolve_selection() {
        let zones = collection(10);

        assert!(resolve_selection(&zones, None).is_none());
        assert!(resolve_selection(&zones, Some(ZoneId(11))).is_none());
        assert_eq!(
            resolve_selection(&zones, Some(ZoneId(4))).map(|z| z.name.as_str()),
            Some("Zone 4")
        );
    }

    #[test]
    fn test_bands() {
        assert_eq!(zone(1, 19.9, 80.0).temperature_band(), TemperatureBand::Cool);
        assert_eq!(zone(1, 20.0, 80.0).temperature_band(), TemperatureBand::Comfortable);
        assert_eq!(zone(1, 28.0, 80.0).temperature_band(), TemperatureBand::Comfortable);
        assert_eq!(zone(1, 28.1, 80.0).temperature_band(), TemperatureBand::Hot);

        assert_eq!(zone(1, 22.0, 49.9).performance_band(), PerformanceBand::Critical);
        assert_eq!(zone(1, 22.0, 50.0).performance_band(), PerformanceBand::Degraded);
        assert_eq!(zone(1, 22.0, 64.9).performance_band(), PerformanceBand::Degraded);
        assert_eq!(zone(1, 22.0, 65.0).performance_band(), PerformanceBand::Good);
        assert!(zone(1, 22.0, 49.9).needs_maintenance());
    }

    #[test]
    fn test_summary() {
        let zones = ZoneCollection::new(vec![
            zone(1, 18.0, 40.0),
            zone(2, 22.0, 60.0),
            zone(3, 26.0, 80.0),
        ]);

        let summary = summary(&zones, "zone 1");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.shown, 1);
        assert_eq!(summary.alerting, 1);
        assert_eq!(summary.degraded, 1);
        assert!((summary.mean_temperature - 22.0).abs() < 1e-9);
        assert!((summary.mean_performance - 60.0).abs() < 1e-9);
    }
}
