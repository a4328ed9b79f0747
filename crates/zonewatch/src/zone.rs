//! Zone records and their deterministic labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Zone identifier, dense from 1 to the zone count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

impl ZoneId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ZoneId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// One monitored climate zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub room: String,
    /// Temperature in °C, one decimal
    pub temperature: f64,
    /// HVAC performance in %, one decimal
    pub performance: f64,
}

impl Zone {
    /// Build a zone whose labels are derived from `id`
    pub fn new(id: ZoneId, temperature: f64, performance: f64) -> Self {
        Self {
            id,
            name: zone_name(id),
            room: room_label(id),
            temperature,
            performance,
        }
    }
}

/// `"Zone {id}"`
pub fn zone_name(id: ZoneId) -> String {
    format!("Zone {}", id)
}

/// Room label: a letter block per ten zones, numbered 1..=10 inside the block.
///
/// Blocks past `Z` continue as `AA`, `AB`, ... so every id gets an
/// alphabetic label.
pub fn room_label(id: ZoneId) -> String {
    let index = id.get().saturating_sub(1);
    let number = index % 10 + 1;
    format!("Room {}{}", block_letters(index / 10), number)
}

// Bijective base-26: 0 -> A, 25 -> Z, 26 -> AA
fn block_letters(block: u32) -> String {
    let mut n = block + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
