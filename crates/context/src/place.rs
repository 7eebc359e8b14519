//! Lookup result structures.

use roadlore_geo::Position;
use serde::{Deserialize, Serialize};

/// A point of interest discovered by a lookup.
///
/// Identity is `id`: two places with the same id are the same landmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Provider-assigned or deterministically derived id.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: Position,
    /// Link to the place in an external map service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_map_uri: Option<String>,
}

impl Place {
    pub fn new(id: impl Into<String>, title: impl Into<String>, location: Position) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            location,
            external_map_uri: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_external_map_uri(mut self, uri: impl Into<String>) -> Self {
        self.external_map_uri = Some(uri.into());
        self
    }
}

/// Outcome of one context lookup. Consumed once to update orchestrator state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResult {
    pub narrative_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    #[serde(default)]
    pub places: Vec<Place>,
}

impl ContextResult {
    pub fn new(narrative_text: impl Into<String>) -> Self {
        Self {
            narrative_text: narrative_text.into(),
            highlight: None,
            places: Vec::new(),
        }
    }

    pub fn with_highlight(mut self, highlight: impl Into<String>) -> Self {
        self.highlight = Some(highlight.into());
        self
    }

    pub fn with_place(mut self, place: Place) -> Self {
        self.places.push(place);
        self
    }

    /// Pull an embedded highlight line out of the narrative, unless the
    /// provider already supplied a structured one.
    pub fn normalize_highlight(mut self, prefix: &str) -> Self {
        if self.highlight.is_some() {
            return self;
        }

        let (highlight, body) = crate::highlight::extract_highlight(&self.narrative_text, prefix);
        if highlight.is_some() {
            self.highlight = highlight;
            self.narrative_text = body;
        }
        self
    }
}
