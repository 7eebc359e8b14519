//! Where explorer events go.
//!
//! The orchestrator publishes typed [`ExplorerEvent`]s; a presentation layer
//! (terminal, GUI shell, test) implements [`EventBus`] to receive them.

use crate::{ExplorerErrorEvent, ExplorerEvent, HighlightReadyEvent, PlacesAddedEvent};
use roadlore_context::Phase;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receiver of explorer notifications. Called after the explorer released
/// its state lock, in publication order.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: ExplorerEvent);
}

pub type EventBusRef = Arc<dyn EventBus>;

/// Keeps every published event, with typed views per event kind.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<ExplorerEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ExplorerEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn select<T>(&self, pick: impl Fn(&ExplorerEvent) -> Option<T>) -> Vec<T> {
        self.lock().iter().filter_map(pick).collect()
    }

    pub fn events(&self) -> Vec<ExplorerEvent> {
        self.lock().clone()
    }

    /// Topics in publication order.
    pub fn topics(&self) -> Vec<&'static str> {
        self.select(|e| Some(e.topic()))
    }

    pub fn count(&self, topic: &str) -> usize {
        self.lock().iter().filter(|e| e.topic() == topic).count()
    }

    /// Every phase entered, in order.
    pub fn phases(&self) -> Vec<Phase> {
        self.select(|e| match e {
            ExplorerEvent::PhaseChanged(changed) => Some(changed.phase),
            _ => None,
        })
    }

    pub fn places_added(&self) -> Vec<PlacesAddedEvent> {
        self.select(|e| match e {
            ExplorerEvent::PlacesAdded(added) => Some(added.clone()),
            _ => None,
        })
    }

    pub fn highlights(&self) -> Vec<HighlightReadyEvent> {
        self.select(|e| match e {
            ExplorerEvent::HighlightReady(highlight) => Some(highlight.clone()),
            _ => None,
        })
    }

    /// Surfaced `explorer:error` events.
    pub fn errors(&self) -> Vec<ExplorerErrorEvent> {
        self.select(|e| match e {
            ExplorerEvent::Error(error) => Some(error.clone()),
            _ => None,
        })
    }

    pub fn location_failures(&self) -> Vec<ExplorerErrorEvent> {
        self.select(|e| match e {
            ExplorerEvent::LocationUnavailable(error) => Some(error.clone()),
            _ => None,
        })
    }

    /// Playback flags from `audio:playback_changed`, in order.
    pub fn playback(&self) -> Vec<bool> {
        self.select(|e| match e {
            ExplorerEvent::PlaybackChanged(changed) => Some(changed.playing),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(&self, event: ExplorerEvent) {
        self.lock().push(event);
    }
}

/// Drops every event.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn publish(&self, _event: ExplorerEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event_names, PhaseChangedEvent, PlaybackChangedEvent};
    use roadlore_context::ExploreMode;

    fn phase(phase: Phase, previous: Phase) -> ExplorerEvent {
        ExplorerEvent::PhaseChanged(PhaseChangedEvent {
            phase,
            previous,
            mode: ExploreMode::Standing,
        })
    }

    fn failure(kind: &str) -> ExplorerErrorEvent {
        ExplorerErrorEvent {
            kind: kind.to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_typed_views_keep_order() {
        let bus = InMemoryEventBus::new();

        bus.publish(phase(Phase::Analyzing, Phase::Ready));
        bus.publish(ExplorerEvent::Error(failure("lookup_failed")));
        bus.publish(phase(Phase::Error, Phase::Analyzing));
        bus.publish(ExplorerEvent::PlaybackChanged(PlaybackChangedEvent { playing: true }));

        assert_eq!(bus.len(), 4);
        assert_eq!(bus.phases(), vec![Phase::Analyzing, Phase::Error]);
        assert_eq!(bus.errors(), vec![failure("lookup_failed")]);
        assert_eq!(bus.playback(), vec![true]);
        assert!(bus.highlights().is_empty());
        assert_eq!(bus.count(event_names::PHASE_CHANGED), 2);
        assert_eq!(
            bus.topics(),
            vec![
                event_names::PHASE_CHANGED,
                event_names::ERROR,
                event_names::PHASE_CHANGED,
                event_names::PLAYBACK_CHANGED,
            ]
        );
    }

    #[test]
    fn test_error_kinds_stay_apart() {
        let bus = InMemoryEventBus::new();

        bus.publish(ExplorerEvent::LocationUnavailable(failure("location_unavailable")));
        bus.publish(ExplorerEvent::ConfigurationMissing(failure("configuration_missing")));

        assert!(bus.errors().is_empty());
        assert_eq!(bus.location_failures().len(), 1);
        assert_eq!(bus.count(event_names::CONFIGURATION_MISSING), 1);

        bus.clear();
        assert!(bus.is_empty());
    }
}
