//! Provider traits for context lookups, narration and itinerary summaries.
//!
//! These traits abstract the third-party services, allowing the orchestrator
//! to remain pure and testable.

use crate::mode::ExploreMode;
use crate::place::{ContextResult, Place};
use async_trait::async_trait;
use roadlore_audio::AudioAsset;
use roadlore_geo::Position;

/// Returned instead of calling the summarizer when nothing was visited.
pub const EMPTY_ITINERARY_MESSAGE: &str = "Nenhum local visitado para gerar roteiro.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No API key / credentials configured. Fatal for the session.
    #[error("provider credentials missing")]
    CredentialsMissing,
    #[error("provider error: {0}")]
    Provider(String),
}

impl LookupError {
    pub fn is_credentials_missing(&self) -> bool {
        matches!(self, LookupError::CredentialsMissing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrationError {
    #[error("narration credentials missing")]
    CredentialsMissing,
    #[error("no audio returned")]
    NoAudio,
    #[error("narration not supported by this provider")]
    Unsupported,
    #[error("narration failed: {0}")]
    Failed(String),
}

impl From<roadlore_audio::AudioError> for NarrationError {
    fn from(e: roadlore_audio::AudioError) -> Self {
        NarrationError::Failed(e.to_string())
    }
}

/// Source of narrative context for a position.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Look up context around `position`. `mode` lets the provider shorten
    /// its answer while driving.
    async fn lookup(
        &self,
        position: &Position,
        mode: ExploreMode,
    ) -> Result<ContextResult, LookupError>;
}

/// Text-to-speech.
#[async_trait]
pub trait NarrationProvider: Send + Sync {
    async fn narrate(&self, text: &str) -> Result<AudioAsset, NarrationError>;
}

/// Turns the visited places into a human-readable itinerary.
#[async_trait]
pub trait ItinerarySummarizer: Send + Sync {
    async fn summarize(&self, places: &[Place]) -> Result<String, LookupError>;
}

/// Summarize `places`, short-circuiting the provider when there are none.
pub async fn summarize_itinerary(
    summarizer: &dyn ItinerarySummarizer,
    places: &[Place],
) -> Result<String, LookupError> {
    if places.is_empty() {
        return Ok(EMPTY_ITINERARY_MESSAGE.to_string());
    }
    tracing::debug!(places = places.len(), "summarizing itinerary");
    summarizer.summarize(places).await
}

/// Null implementation for testing or offline use.
///
/// Lookups return an empty result, narration is unsupported, and the
/// itinerary is a plain bullet list.
pub struct NullProvider;

#[async_trait]
impl ContextProvider for NullProvider {
    async fn lookup(
        &self,
        _position: &Position,
        _mode: ExploreMode,
    ) -> Result<ContextResult, LookupError> {
        Ok(ContextResult::default())
    }
}

#[async_trait]
impl NarrationProvider for NullProvider {
    async fn narrate(&self, _text: &str) -> Result<AudioAsset, NarrationError> {
        Err(NarrationError::Unsupported)
    }
}

#[async_trait]
impl ItinerarySummarizer for NullProvider {
    async fn summarize(&self, places: &[Place]) -> Result<String, LookupError> {
        Ok(places
            .iter()
            .map(|p| format!("- {}", p.title))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSummarizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ItinerarySummarizer for CountingSummarizer {
        async fn summarize(&self, places: &[Place]) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} stops", places.len()))
        }
    }

    #[tokio::test]
    async fn test_empty_itinerary_skips_provider() {
        let summarizer = CountingSummarizer {
            calls: AtomicUsize::new(0),
        };
        let text = summarize_itinerary(&summarizer, &[]).await.unwrap();
        assert_eq!(text, EMPTY_ITINERARY_MESSAGE);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_itinerary_calls_provider() {
        let summarizer = CountingSummarizer {
            calls: AtomicUsize::new(0),
        };
        let places = vec![Place::new("p1", "Praça da Sé", Position::new(0.0, 0.0))];
        let text = summarize_itinerary(&summarizer, &places).await.unwrap();
        assert_eq!(text, "1 stops");
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_null_provider() {
        let result = NullProvider
            .lookup(&Position::new(0.0, 0.0), ExploreMode::Standing)
            .await
            .unwrap();
        assert!(result.places.is_empty());
        assert_eq!(
            NullProvider.narrate("hi").await.unwrap_err(),
            NarrationError::Unsupported
        );

        let places = vec![
            Place::new("a", "Pateo do Collegio", Position::new(0.0, 0.0)),
            Place::new("b", "Mosteiro de São Bento", Position::new(0.0, 0.0)),
        ];
        let list = NullProvider.summarize(&places).await.unwrap();
        assert_eq!(list, "- Pateo do Collegio\n- Mosteiro de São Bento");
    }
}
