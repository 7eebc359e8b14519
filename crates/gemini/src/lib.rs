//! Gemini adapter for the roadlore provider traits.
//!
//! One [`GeminiClient`] serves all three contracts: grounded context lookups
//! (`ContextProvider`), text-to-speech (`NarrationProvider`) and itinerary
//! summaries (`ItinerarySummarizer`). A missing or rejected API key surfaces
//! as `CredentialsMissing` so the orchestrator can shut exploration down.

mod client;
mod config;
mod error;
mod prompt;
mod wire;

pub use client::{derived_place_id, GeminiClient, NO_CONTEXT_TEXT, NO_ITINERARY_TEXT};
pub use config::{
    GeminiConfig, DEFAULT_BASE_URL, DEFAULT_TEXT_MODEL, DEFAULT_TTS_MODEL, DEFAULT_VOICE,
};
pub use error::{GeminiError, Result};
