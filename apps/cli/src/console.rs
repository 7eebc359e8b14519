//! Terminal presentation of explorer events.

use roadlore_application::Phase;
use roadlore_events::{EventBus, ExplorerEvent, HighlightDelivery};
use std::io::Write;
use std::sync::Mutex;

/// Prints events as human-readable lines to stdout, or as JSON lines.
pub struct ConsoleEventBus {
    json: bool,
    out: Mutex<std::io::Stdout>,
}

impl ConsoleEventBus {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            out: Mutex::new(std::io::stdout()),
        }
    }
}

impl EventBus for ConsoleEventBus {
    fn publish(&self, event: ExplorerEvent) {
        let line = if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, topic = event.topic(), "unserializable event");
                    return;
                }
            }
        } else {
            match render(&event) {
                Some(line) => line,
                None => return,
            }
        };

        let mut out = self.out.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}") {
            tracing::debug!(error = %e, "stdout closed");
        }
    }
}

/// One line per event; `None` for events not worth showing.
pub fn render(event: &ExplorerEvent) -> Option<String> {
    match event {
        ExplorerEvent::PhaseChanged(changed) if changed.phase == Phase::Analyzing => {
            Some("… consultando o entorno".to_string())
        }
        ExplorerEvent::PlacesAdded(added) => {
            let titles: Vec<&str> = added.added.iter().map(|p| p.title.as_str()).collect();
            Some(format!("+ {} (total {})", titles.join(", "), added.total))
        }
        ExplorerEvent::HighlightReady(highlight) => {
            let marker = match highlight.delivery {
                HighlightDelivery::Narration => "♪",
                HighlightDelivery::Popup => "★",
            };
            Some(format!("{marker} {}", highlight.text))
        }
        ExplorerEvent::Error(error) | ExplorerEvent::LocationUnavailable(error) => {
            Some(format!("! {}", error.message))
        }
        ExplorerEvent::ConfigurationMissing(_) => Some(
            "! Chave de API ausente. Defina GEMINI_API_KEY ou \"gemini.apiKey\" no arquivo de configuração."
                .to_string(),
        ),
        ExplorerEvent::PhaseChanged(_) | ExplorerEvent::PlaybackChanged(_) => None,
    }
}
