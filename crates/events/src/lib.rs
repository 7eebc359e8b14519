//! Event contracts published by the exploration orchestrator.
//!
//! Shared DTOs keep producers and listeners agreeing on field names;
//! [`ExplorerEvent`] ties each DTO to its topic. Also provides the
//! `EventBus` trait the orchestrator publishes through.

mod bus;

pub use bus::{EventBus, EventBusRef, InMemoryEventBus, NullEventBus};

use roadlore_context::{ExploreMode, Phase, Place};
use serde::{Deserialize, Serialize};

/// Emitted whenever the lifecycle phase changes.
///
/// Producers: explorer
/// Consumers: presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChangedEvent {
    pub phase: Phase,
    pub previous: Phase,
    pub mode: ExploreMode,
}

/// Emitted when a lookup discovered places not seen before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacesAddedEvent {
    /// Only the newly added places, in insertion order.
    pub added: Vec<Place>,
    /// Size of the accumulated set afterwards.
    pub total: usize,
}

/// How a highlight reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightDelivery {
    /// Standing mode: show a popup.
    Popup,
    /// Driving mode: spoken narration.
    Narration,
}

/// Emitted when a lookup produced a highlight fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightReadyEvent {
    pub text: String,
    pub delivery: HighlightDelivery,
}

/// Emitted for failures the user should see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerErrorEvent {
    /// Error kind, e.g. "lookup_failed" or "location_unavailable".
    pub kind: String,
    pub message: String,
}

/// Emitted when narration playback starts or stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackChangedEvent {
    pub playing: bool,
}

/// A notification published by the explorer or its session.
///
/// Serializes as `{"event": <topic>, "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ExplorerEvent {
    #[serde(rename = "explorer:phase_changed")]
    PhaseChanged(PhaseChangedEvent),
    #[serde(rename = "explorer:places_added")]
    PlacesAdded(PlacesAddedEvent),
    #[serde(rename = "explorer:highlight_ready")]
    HighlightReady(HighlightReadyEvent),
    #[serde(rename = "explorer:error")]
    Error(ExplorerErrorEvent),
    #[serde(rename = "explorer:configuration_missing")]
    ConfigurationMissing(ExplorerErrorEvent),
    #[serde(rename = "audio:playback_changed")]
    PlaybackChanged(PlaybackChangedEvent),
    #[serde(rename = "location:unavailable")]
    LocationUnavailable(ExplorerErrorEvent),
}

impl ExplorerEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            ExplorerEvent::PhaseChanged(_) => event_names::PHASE_CHANGED,
            ExplorerEvent::PlacesAdded(_) => event_names::PLACES_ADDED,
            ExplorerEvent::HighlightReady(_) => event_names::HIGHLIGHT_READY,
            ExplorerEvent::Error(_) => event_names::ERROR,
            ExplorerEvent::ConfigurationMissing(_) => event_names::CONFIGURATION_MISSING,
            ExplorerEvent::PlaybackChanged(_) => event_names::PLAYBACK_CHANGED,
            ExplorerEvent::LocationUnavailable(_) => event_names::LOCATION_UNAVAILABLE,
        }
    }
}

/// Event names as constants to prevent typos.
pub mod event_names {
    pub const PHASE_CHANGED: &str = "explorer:phase_changed";
    pub const PLACES_ADDED: &str = "explorer:places_added";
    pub const HIGHLIGHT_READY: &str = "explorer:highlight_ready";
    pub const ERROR: &str = "explorer:error";
    pub const CONFIGURATION_MISSING: &str = "explorer:configuration_missing";
    pub const PLAYBACK_CHANGED: &str = "audio:playback_changed";
    pub const LOCATION_UNAVAILABLE: &str = "location:unavailable";
}
