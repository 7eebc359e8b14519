//! Failure taxonomy surfaced by the explorer.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExplorerError {
    /// Provider credentials are missing. Fatal for the session.
    #[error("configuration missing: provider credentials are not set")]
    ConfigurationMissing,
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("lookup failed: {0}")]
    LookupFailed(String),
    /// Logged only, never surfaced.
    #[error("narration failed: {0}")]
    NarrationFailed(String),
    /// Logged only, never surfaced.
    #[error("playback failed: {0}")]
    PlaybackFailed(String),
    #[error("itinerary failed: {0}")]
    ItineraryFailed(String),
}

impl ExplorerError {
    /// Stable machine-readable kind, used in event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ExplorerError::ConfigurationMissing => "configuration_missing",
            ExplorerError::LocationUnavailable(_) => "location_unavailable",
            ExplorerError::LookupFailed(_) => "lookup_failed",
            ExplorerError::NarrationFailed(_) => "narration_failed",
            ExplorerError::PlaybackFailed(_) => "playback_failed",
            ExplorerError::ItineraryFailed(_) => "itinerary_failed",
        }
    }
}

impl Serialize for ExplorerError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<roadlore_context::LookupError> for ExplorerError {
    fn from(e: roadlore_context::LookupError) -> Self {
        match e {
            roadlore_context::LookupError::CredentialsMissing => ExplorerError::ConfigurationMissing,
            other => ExplorerError::LookupFailed(other.to_string()),
        }
    }
}

impl From<roadlore_context::NarrationError> for ExplorerError {
    fn from(e: roadlore_context::NarrationError) -> Self {
        ExplorerError::NarrationFailed(e.to_string())
    }
}

impl From<roadlore_geo::LocationError> for ExplorerError {
    fn from(e: roadlore_geo::LocationError) -> Self {
        ExplorerError::LocationUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
