//! Orchestrator state and the read-only snapshot handed to presentation.

use crate::error::ExplorerError;
use crate::places::PlaceSet;
use roadlore_context::{ExploreMode, Phase, Place, Position};
use serde::Serialize;

/// The single mutable record owned by the explorer.
#[derive(Debug, Default)]
pub(crate) struct ExplorerState {
    pub position: Option<Position>,
    pub places: PlaceSet,
    pub narrative: String,
    pub highlight: Option<String>,
    /// A standing-mode highlight waiting to be shown as a popup.
    pub highlight_pending: bool,
    pub selected_place: Option<String>,
    pub phase: Phase,
    pub last_error: Option<ExplorerError>,
    pub mode: ExploreMode,
    pub tracking: bool,
    /// Epoch marker for the driving auto-trigger.
    pub last_analyzed: Option<Position>,
    /// A location update arrived while a driving lookup was in flight.
    pub auto_deferred: bool,
    /// Bumped on every off→on driving transition.
    pub driving_epoch: u64,
}

impl ExplorerState {
    /// Driving-mode auto-trigger policy: one lookup per epoch.
    pub fn auto_trigger_due(&self) -> Option<Position> {
        if !self.mode.is_driving()
            || self.phase == Phase::Analyzing
            || self.phase.is_terminal()
            || self.last_analyzed.is_some()
        {
            return None;
        }
        self.position
    }

    pub fn snapshot(&self) -> ExplorerSnapshot {
        ExplorerSnapshot {
            phase: self.phase,
            mode: self.mode,
            tracking: self.tracking,
            position: self.position,
            places: self.places.as_slice().to_vec(),
            narrative: self.narrative.clone(),
            highlight: self.highlight.clone(),
            highlight_pending: self.highlight_pending,
            selected_place: self
                .selected_place
                .as_deref()
                .and_then(|id| self.places.get(id))
                .cloned(),
            last_error: self.last_error.clone(),
            last_analyzed: self.last_analyzed,
        }
    }
}

/// Point-in-time copy of the explorer state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerSnapshot {
    pub phase: Phase,
    pub mode: ExploreMode,
    pub tracking: bool,
    pub position: Option<Position>,
    pub places: Vec<Place>,
    pub narrative: String,
    pub highlight: Option<String>,
    pub highlight_pending: bool,
    pub selected_place: Option<Place>,
    /// Error to show the user, if any.
    pub last_error: Option<ExplorerError>,
    pub last_analyzed: Option<Position>,
}

impl ExplorerSnapshot {
    pub fn place_ids(&self) -> Vec<&str> {
        self.places.iter().map(|p| p.id.as_str()).collect()
    }

    /// Meters travelled since the last successful lookup.
    pub fn distance_since_analyzed_m(&self) -> Option<f64> {
        Some(self.position?.distance_m(&self.last_analyzed?))
    }
}
