//! Location source contract.
//!
//! Abstracts the device geolocation API so the orchestrator can be driven by
//! a real GPS, a replayed track, or a test harness.

use crate::position::Position;
use crate::watch::LocationWatch;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("no position acquired within {0:?}")]
    Timeout(Duration),
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, LocationError>;

/// Accuracy, timeout and staleness knobs for a position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    /// Ask the backend for its most precise fix.
    pub high_accuracy: bool,
    /// Upper bound on waiting for a reading.
    pub timeout: Duration,
    /// A cached reading older than this is not reused.
    pub maximum_age: Duration,
}

impl LocationOptions {
    /// Continuous tracking profile (driving / tracking mode).
    pub fn tracking() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5),
        }
    }

    /// One-shot profile: only a brand new reading is accepted.
    pub fn one_shot() -> Self {
        Self {
            high_accuracy: false,
            timeout: Duration::from_secs(30),
            maximum_age: Duration::ZERO,
        }
    }
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self::one_shot()
    }
}

/// Source of observer positions.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Resolve a single position.
    async fn current_position(&self, options: &LocationOptions) -> Result<Position>;

    /// Subscribe to continuous updates.
    ///
    /// A terminal error is delivered once and then the watch ends; retrying
    /// is the caller's business. Must be called within a tokio runtime.
    fn watch_position(&self, options: LocationOptions) -> LocationWatch;
}
