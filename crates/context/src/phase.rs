//! Exploration lifecycle phase.

use serde::{Deserialize, Serialize};

/// Where the orchestrator is in its lookup cycle.
///
/// ```text
/// Idle ─▶ Ready ─▶ Analyzing ─▶ Ready
///                      └──────▶ Error ─▶ Analyzing ...
/// (any) ─▶ ConfigurationMissing   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No position received yet.
    #[default]
    Idle,
    Ready,
    /// A lookup is in flight.
    Analyzing,
    /// The last lookup failed; recoverable.
    Error,
    /// Credentials are missing; nothing else will run this session.
    ConfigurationMissing,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Ready => "Ready",
            Phase::Analyzing => "Analyzing",
            Phase::Error => "Error",
            Phase::ConfigurationMissing => "ConfigurationMissing",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::ConfigurationMissing)
    }

    /// Phases an attempt may settle in.
    pub fn is_stable(&self) -> bool {
        matches!(self, Phase::Ready | Phase::Error | Phase::ConfigurationMissing)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
