//! Context lookup contracts for roadlore.
//!
//! This crate defines what the orchestrator consumes from the outside world:
//! - Context lookups (narrative text, highlight fact, nearby places)
//! - Narration (text to a playable audio asset)
//! - Itinerary summaries of the places seen so far
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  mode.rs      - ExploreMode (standing / driving)            │
//! │  phase.rs     - Phase lifecycle enum                        │
//! │  place.rs     - Place, ContextResult                        │
//! │  highlight.rs - highlight line extraction (pure)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Contracts                                │
//! │  provider.rs - provider traits, errors, NullProvider        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concrete adapters (e.g. `roadlore-gemini`) implement the traits.

mod highlight;
mod mode;
mod phase;
mod place;
mod provider;

pub use highlight::{extract_highlight, DEFAULT_HIGHLIGHT_PREFIX};
pub use mode::ExploreMode;
pub use phase::Phase;
pub use place::{ContextResult, Place};
pub use provider::{
    summarize_itinerary, ContextProvider, ItinerarySummarizer, LookupError, NarrationError,
    NarrationProvider, NullProvider, EMPTY_ITINERARY_MESSAGE,
};

pub use roadlore_geo::Position;
