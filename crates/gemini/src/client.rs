//! Generative Language REST adapter.

use crate::config::GeminiConfig;
use crate::error::{GeminiError, Result};
use crate::prompt;
use crate::wire::{ErrorEnvelope, GenerateRequest, GenerateResponse, MapsChunk};
use async_trait::async_trait;
use base64::Engine as _;
use roadlore_audio::AudioAsset;
use roadlore_context::{
    ContextProvider, ContextResult, ExploreMode, ItinerarySummarizer, LookupError,
    NarrationError, NarrationProvider, Place, Position, DEFAULT_HIGHLIGHT_PREFIX,
};
use serde_json::json;
use uuid::Uuid;

/// Narrative used when the model returns no text.
pub const NO_CONTEXT_TEXT: &str = "Sem dados históricos.";
/// Itinerary used when the model returns no text.
pub const NO_ITINERARY_TEXT: &str = "Roteiro indisponível.";

const DEFAULT_PLACE_TITLE: &str = "Local Histórico";
const PLACE_DESCRIPTION: &str = "Identificado pelo Google Maps.";

/// Client for context lookups, narration and itinerary summaries.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    highlight_prefix: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("roadlore/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config,
            highlight_prefix: DEFAULT_HIGHLIGHT_PREFIX.to_string(),
        })
    }

    /// Prefix the model is asked to put in front of the highlight line.
    pub fn with_highlight_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.highlight_prefix = prefix.into();
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        if !self.config.has_api_key() {
            return Err(GeminiError::MissingApiKey);
        }

        let resp = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.config.api_key.trim())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GeminiError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) if envelope.error.is_invalid_key() => {
                    GeminiError::Unauthorized(status.as_u16())
                }
                Ok(envelope) => GeminiError::Api {
                    status: status.as_u16(),
                    message: envelope.error.message,
                },
                Err(_) => GeminiError::Api {
                    status: status.as_u16(),
                    message: body,
                },
            });
        }

        Ok(resp.json::<GenerateResponse>().await?)
    }

    /// Grounded lookup around `position`. The narrative is returned raw,
    /// highlight line included.
    pub async fn lookup_context(
        &self,
        position: &Position,
        mode: ExploreMode,
    ) -> Result<ContextResult> {
        let mut request =
            GenerateRequest::text(prompt::context(position, mode, &self.highlight_prefix));
        request.tools = vec![json!({ "googleMaps": {} })];
        request.tool_config = Some(json!({
            "retrievalConfig": {
                "latLng": { "latitude": position.latitude, "longitude": position.longitude }
            }
        }));

        let response = self.generate(&self.config.text_model, &request).await?;
        let places: Vec<Place> = response
            .maps_chunks()
            .map(|chunk| place_from_chunk(chunk, position))
            .collect();
        let text = response.text().unwrap_or_else(|| NO_CONTEXT_TEXT.to_string());

        tracing::debug!(%position, %mode, places = places.len(), "context lookup complete");
        Ok(ContextResult {
            narrative_text: text,
            highlight: None,
            places,
        })
    }

    /// Text to speech. The API answers with base64 PCM16 mono.
    pub async fn synthesize(&self, text: &str) -> Result<AudioAsset> {
        let mut request = GenerateRequest::text(prompt::narration(text));
        request.contents[0].role = None;
        request.generation_config = Some(json!({
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.config.voice } }
            }
        }));

        let response = self.generate(&self.config.tts_model, &request).await?;
        let audio = response.inline_audio().ok_or(GeminiError::Empty("audio"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(audio.data.as_bytes())
            .map_err(|e| GeminiError::InvalidAudio(e.to_string()))?;
        let sample_rate = rate_from_mime(&audio.mime_type).unwrap_or(self.config.sample_rate);

        let asset = AudioAsset::from_pcm16_le(&bytes, sample_rate, 1)
            .map_err(|e| GeminiError::InvalidAudio(e.to_string()))?;
        tracing::debug!(duration = ?asset.duration(), sample_rate, "narration synthesized");
        Ok(asset)
    }

    pub async fn summarize_places(&self, places: &[Place]) -> Result<String> {
        let request = GenerateRequest::text(prompt::itinerary(places));
        let response = self.generate(&self.config.text_model, &request).await?;
        Ok(response
            .text()
            .unwrap_or_else(|| NO_ITINERARY_TEXT.to_string()))
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.config.base_url)
            .field("text_model", &self.config.text_model)
            .field("api_key_set", &self.config.has_api_key())
            .finish()
    }
}

/// Grid size, in cells per degree, for derived place ids (about 1 km).
const PLACE_AREA_CELLS_PER_DEGREE: f64 = 100.0;

/// Stable id for a place the service returned without one.
///
/// Keyed on the normalized title and the coarse area the observer is in, so
/// the same landmark seen from anywhere nearby keeps one id.
pub fn derived_place_id(title: &str, observer: &Position) -> String {
    let cell = |degrees: f64| (degrees * PLACE_AREA_CELLS_PER_DEGREE).round() as i64;
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let key = format!(
        "{}@{},{}",
        title,
        cell(observer.latitude),
        cell(observer.longitude)
    );
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

fn place_from_chunk(chunk: &MapsChunk, position: &Position) -> Place {
    let title = chunk
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_PLACE_TITLE);
    let id = chunk
        .place_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| derived_place_id(title, position));

    let mut place = Place::new(id, title, *position)
        .with_description(PLACE_DESCRIPTION);
    if let Some(uri) = &chunk.uri {
        place = place.with_external_map_uri(uri.clone());
    }
    place
}

/// `audio/L16;codec=pcm;rate=24000` -> 24000
fn rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

#[async_trait]
impl ContextProvider for GeminiClient {
    async fn lookup(
        &self,
        position: &Position,
        mode: ExploreMode,
    ) -> std::result::Result<ContextResult, LookupError> {
        Ok(self.lookup_context(position, mode).await?)
    }
}

#[async_trait]
impl NarrationProvider for GeminiClient {
    async fn narrate(&self, text: &str) -> std::result::Result<AudioAsset, NarrationError> {
        Ok(self.synthesize(text).await?)
    }
}

#[async_trait]
impl ItinerarySummarizer for GeminiClient {
    async fn summarize(&self, places: &[Place]) -> std::result::Result<String, LookupError> {
        Ok(self.summarize_places(places).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_mime() {
        assert_eq!(rate_from_mime("audio/L16;codec=pcm;rate=24000"), Some(24000));
        assert_eq!(rate_from_mime("audio/L16; rate=16000"), Some(16000));
        assert_eq!(rate_from_mime("audio/pcm"), None);
    }

    #[test]
    fn test_derived_id_survives_observer_movement() {
        let a = derived_place_id("Praça da Sé", &Position::new(-23.5505, -46.6333));
        let b = derived_place_id(" praça  da sé ", &Position::new(-23.5510, -46.6340));
        let c = derived_place_id("Pateo do Collegio", &Position::new(-23.5505, -46.6333));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_derived_id_differs_between_towns() {
        let sao_paulo = derived_place_id("Igreja Matriz", &Position::new(-23.5505, -46.6333));
        let santos = derived_place_id("Igreja Matriz", &Position::new(-23.9608, -46.3336));
        assert_ne!(sao_paulo, santos);
    }

    #[test]
    fn test_place_from_chunk_defaults() {
        let chunk = MapsChunk::default();
        let place = place_from_chunk(&chunk, &Position::new(1.0, 2.0));
        assert_eq!(place.title, DEFAULT_PLACE_TITLE);
        assert_eq!(place.description, PLACE_DESCRIPTION);
        assert!(place.external_map_uri.is_none());
        assert_eq!(place.id, derived_place_id(DEFAULT_PLACE_TITLE, &Position::new(1.0, 2.0)));
    }
}
