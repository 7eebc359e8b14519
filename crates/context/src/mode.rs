//! Operating mode.
//!
//! Pure domain logic - no I/O.

use serde::{Deserialize, Serialize};

/// How the observer is exploring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExploreMode {
    /// Interactive: lookups are user-initiated, highlights pop up.
    #[default]
    Standing,

    /// Autonomous: lookups are auto-triggered, highlights are narrated.
    Driving,
}

impl ExploreMode {
    pub fn from_driving(driving: bool) -> Self {
        if driving {
            ExploreMode::Driving
        } else {
            ExploreMode::Standing
        }
    }

    pub fn is_driving(&self) -> bool {
        matches!(self, ExploreMode::Driving)
    }

    /// Returns a human-readable label for the mode.
    pub fn label(&self) -> &'static str {
        match self {
            ExploreMode::Standing => "Standing",
            ExploreMode::Driving => "Driving",
        }
    }
}

impl std::fmt::Display for ExploreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
