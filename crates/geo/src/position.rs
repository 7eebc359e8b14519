//! Position values.
//!
//! Pure domain logic - no I/O.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for distance estimates.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A single observer position.
///
/// Immutable once produced; each new reading supersedes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Direction of travel in degrees clockwise from true north.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            heading: None,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_m(&self, other: &Position) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// A position reading stamped with its capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub position: Position,
    /// Capture time in milliseconds since epoch.
    pub timestamp_ms: i64,
}

impl Fix {
    pub fn new(position: Position, timestamp_ms: i64) -> Self {
        Self {
            position,
            timestamp_ms,
        }
    }

    /// A reading captured right now.
    pub fn now(position: Position) -> Self {
        Self::new(position, chrono::Utc::now().timestamp_millis())
    }

    /// Age of the reading relative to `now_ms` (never negative).
    pub fn age_ms(&self, now_ms: i64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms).max(0) as u64
    }
}
