//! The exploration orchestrator.
//!
//! Owns the observer state, decides when a context lookup runs, merges
//! results and drives the narration channel while in driving mode.
//!
//! Every transition happens under one state lock and never across an await:
//! `explore` claims the `Analyzing` phase, releases the lock while the
//! provider works, then re-locks to apply the outcome. Because a second
//! claim is refused while `Analyzing`, the completion handler always sees
//! the phase its own invocation set.

use crate::config::ExplorerConfig;
use crate::error::ExplorerError;
use crate::state::{ExplorerSnapshot, ExplorerState};
use crate::wake_lock::{NullWakeLock, WakeLock};
use roadlore_audio::{AudioAsset, AudioChannel, PlaybackStatus, SilentDevice};
use roadlore_context::{
    summarize_itinerary, ContextProvider, ContextResult, ExploreMode, ItinerarySummarizer,
    LookupError, NarrationProvider, NullProvider, Phase, Position,
};
use roadlore_events::{
    EventBusRef, ExplorerErrorEvent, ExplorerEvent, HighlightDelivery, HighlightReadyEvent,
    NullEventBus, PhaseChangedEvent, PlacesAddedEvent,
};
use roadlore_geo::LocationError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Why an `explore` call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Another lookup is outstanding.
    InFlight,
    /// The session is disabled by missing credentials.
    ConfigurationMissing,
    /// A driving auto-trigger after this epoch's lookup already succeeded.
    EpochAnalyzed,
}

/// Result of one `explore` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExploreOutcome {
    Completed(ExplorerSnapshot),
    Ignored(IgnoreReason),
    Failed(ExplorerError),
}

impl ExploreOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExploreOutcome::Completed(_))
    }
}

/// What happened to a highlight handed to the narration provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NarrationOutcome {
    Played,
    /// Generated after driving mode was left; dropped.
    Discarded,
    Failed,
}

type Outgoing = Vec<ExplorerEvent>;

fn error_event(error: &ExplorerError) -> ExplorerErrorEvent {
    ExplorerErrorEvent {
        kind: error.kind().to_string(),
        message: error.to_string(),
    }
}

struct Inner {
    config: ExplorerConfig,
    context: Arc<dyn ContextProvider>,
    narration: Arc<dyn NarrationProvider>,
    summarizer: Arc<dyn ItinerarySummarizer>,
    audio: AudioChannel,
    events: EventBusRef,
    wake_lock: Arc<dyn WakeLock>,
    state: Mutex<ExplorerState>,
    snapshot: watch::Sender<ExplorerSnapshot>,
}

/// Cheap to clone; all clones drive the same state.
#[derive(Clone)]
pub struct Explorer {
    inner: Arc<Inner>,
}

pub struct ExplorerBuilder {
    config: ExplorerConfig,
    context: Arc<dyn ContextProvider>,
    narration: Arc<dyn NarrationProvider>,
    summarizer: Arc<dyn ItinerarySummarizer>,
    audio: Option<AudioChannel>,
    events: EventBusRef,
    wake_lock: Arc<dyn WakeLock>,
}

impl ExplorerBuilder {
    pub fn config(mut self, config: ExplorerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context = provider;
        self
    }

    pub fn narration_provider(mut self, provider: Arc<dyn NarrationProvider>) -> Self {
        self.narration = provider;
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn ItinerarySummarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn audio(mut self, audio: AudioChannel) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn event_bus(mut self, events: EventBusRef) -> Self {
        self.events = events;
        self
    }

    pub fn wake_lock(mut self, wake_lock: Arc<dyn WakeLock>) -> Self {
        self.wake_lock = wake_lock;
        self
    }

    pub fn build(self) -> Explorer {
        let audio = self
            .audio
            .unwrap_or_else(|| AudioChannel::new(Arc::new(SilentDevice)));
        let (snapshot, _) = watch::channel(ExplorerSnapshot::default());

        Explorer {
            inner: Arc::new(Inner {
                config: self.config,
                context: self.context,
                narration: self.narration,
                summarizer: self.summarizer,
                audio,
                events: self.events,
                wake_lock: self.wake_lock,
                state: Mutex::new(ExplorerState::default()),
                snapshot,
            }),
        }
    }
}

impl Explorer {
    /// Builder with offline defaults: null providers, silent audio, no events.
    pub fn builder() -> ExplorerBuilder {
        let null = Arc::new(NullProvider);
        ExplorerBuilder {
            config: ExplorerConfig::default(),
            context: null.clone(),
            narration: null.clone(),
            summarizer: null,
            audio: None,
            events: Arc::new(NullEventBus),
            wake_lock: Arc::new(NullWakeLock),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ExplorerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one transition: mutate under the lock, publish the snapshot,
    /// then emit queued events once the lock is released.
    fn transition<R>(&self, f: impl FnOnce(&mut ExplorerState, &mut Outgoing) -> R) -> R {
        let mut outgoing = Outgoing::new();
        let result = {
            let mut state = self.lock();
            let previous = state.phase;
            let result = f(&mut state, &mut outgoing);

            if state.phase != previous {
                tracing::debug!(from = %previous, to = %state.phase, "phase changed");
                outgoing.insert(
                    0,
                    ExplorerEvent::PhaseChanged(PhaseChangedEvent {
                        phase: state.phase,
                        previous,
                        mode: state.mode,
                    }),
                );
            }
            self.inner.snapshot.send_replace(state.snapshot());
            result
        };

        for event in outgoing {
            self.inner.events.publish(event);
        }
        result
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> ExplorerSnapshot {
        self.lock().snapshot()
    }

    /// Observe every state change.
    pub fn subscribe(&self) -> watch::Receiver<ExplorerSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn mode(&self) -> ExploreMode {
        self.lock().mode
    }

    pub fn is_tracking(&self) -> bool {
        self.lock().tracking
    }

    pub fn position(&self) -> Option<Position> {
        self.lock().position
    }

    pub fn audio(&self) -> &AudioChannel {
        &self.inner.audio
    }

    /// Record a new reading. Leaves `Idle` on the first one; never triggers
    /// a lookup by itself.
    pub fn on_location_update(&self, position: Position) -> ExplorerSnapshot {
        self.transition(|state, _| {
            state.position = Some(position);
            if state.phase == Phase::Idle {
                state.phase = Phase::Ready;
            }
            if state.mode.is_driving()
                && state.phase == Phase::Analyzing
                && state.last_analyzed.is_none()
            {
                state.auto_deferred = true;
            }
            let snapshot = state.snapshot();
            if let Some(moved_m) = snapshot.distance_since_analyzed_m() {
                tracing::debug!(moved_m = moved_m.round(), "reading since last lookup");
            }
            snapshot
        })
    }

    /// Surface a terminal location failure.
    pub fn on_location_error(&self, error: &LocationError) -> ExplorerSnapshot {
        tracing::warn!(error = %error, "location unavailable");
        self.transition(|state, out| {
            if state.phase.is_terminal() {
                return state.snapshot();
            }
            // An in-flight lookup settles the phase on its own.
            if state.phase != Phase::Analyzing {
                state.phase = Phase::Error;
            }
            let surfaced = ExplorerError::LocationUnavailable(error.to_string());
            let event = error_event(&surfaced);
            out.push(ExplorerEvent::LocationUnavailable(event.clone()));
            out.push(ExplorerEvent::Error(event));
            state.last_error = Some(surfaced);
            state.snapshot()
        })
    }

    /// Run one context lookup at `position`.
    ///
    /// A call while another lookup is outstanding, or after credentials were
    /// found missing, is ignored. `auto` marks background driving triggers:
    /// they keep the current view, fail silently, and are refused once the
    /// current driving epoch has been analyzed.
    pub async fn explore(&self, position: Position, auto: bool) -> ExploreOutcome {
        let claimed = self.transition(|state, _| match state.phase {
            Phase::Analyzing => Err(IgnoreReason::InFlight),
            Phase::ConfigurationMissing => Err(IgnoreReason::ConfigurationMissing),
            _ if auto && state.mode.is_driving() && state.last_analyzed.is_some() => {
                Err(IgnoreReason::EpochAnalyzed)
            }
            _ => {
                state.phase = Phase::Analyzing;
                state.last_error = None;
                if !auto {
                    state.narrative.clear();
                    state.highlight = None;
                    state.highlight_pending = false;
                    state.selected_place = None;
                }
                Ok(state.mode)
            }
        });

        let mode = match claimed {
            Ok(mode) => mode,
            Err(reason) => {
                tracing::debug!(?reason, auto, "explore ignored");
                return ExploreOutcome::Ignored(reason);
            }
        };

        tracing::info!(%position, %mode, auto, "exploring");
        match self.inner.context.lookup(&position, mode).await {
            Ok(result) => self.apply_result(position, result).await,
            Err(e) => self.apply_failure(e, auto),
        }
    }

    async fn apply_result(&self, position: Position, result: ContextResult) -> ExploreOutcome {
        let result = result.normalize_highlight(&self.inner.config.highlight_prefix);

        let to_narrate = self.transition(|state, out| {
            let added = state.places.merge(result.places);
            if !added.is_empty() {
                tracing::info!(added = added.len(), total = state.places.len(), "new places");
                out.push(ExplorerEvent::PlacesAdded(PlacesAddedEvent {
                    added,
                    total: state.places.len(),
                }));
            }

            state.narrative = result.narrative_text;
            state.phase = Phase::Ready;
            state.last_analyzed = Some(position);
            state.auto_deferred = false;

            let highlight = result.highlight?;
            state.highlight = Some(highlight.clone());

            let delivery = if state.mode.is_driving() {
                state.highlight_pending = false;
                HighlightDelivery::Narration
            } else {
                state.highlight_pending = true;
                HighlightDelivery::Popup
            };
            out.push(ExplorerEvent::HighlightReady(HighlightReadyEvent {
                text: highlight.clone(),
                delivery,
            }));

            (delivery == HighlightDelivery::Narration).then_some((highlight, state.driving_epoch))
        });

        if let Some((text, epoch)) = to_narrate {
            let outcome = self.narrate(&text, epoch).await;
            tracing::debug!(?outcome, "highlight narration");
        }

        ExploreOutcome::Completed(self.snapshot())
    }

    fn apply_failure(&self, error: LookupError, auto: bool) -> ExploreOutcome {
        if error.is_credentials_missing() {
            self.configuration_missing();
            return ExploreOutcome::Failed(ExplorerError::ConfigurationMissing);
        }

        let surfaced = ExplorerError::from(error);
        if auto {
            tracing::debug!(error = %surfaced, "background lookup failed");
        } else {
            tracing::warn!(error = %surfaced, "lookup failed");
        }

        self.transition(|state, out| {
            state.phase = Phase::Error;
            if !auto {
                out.push(ExplorerEvent::Error(error_event(&surfaced)));
                state.last_error = Some(surfaced.clone());
            }
        });
        ExploreOutcome::Failed(surfaced)
    }

    /// Disable exploration for the rest of the session.
    ///
    /// Called when a provider rejects the credentials, or up front when none
    /// are configured, in which case the session never subscribes to location.
    pub fn configuration_missing(&self) -> ExplorerSnapshot {
        tracing::error!("provider credentials missing; exploration disabled for this session");
        let surfaced = ExplorerError::ConfigurationMissing;
        self.transition(|state, out| {
            if state.phase == Phase::ConfigurationMissing {
                return state.snapshot();
            }
            state.phase = Phase::ConfigurationMissing;
            state.auto_deferred = false;
            out.push(ExplorerEvent::ConfigurationMissing(error_event(&surfaced)));
            state.last_error = Some(surfaced.clone());
            state.snapshot()
        })
    }

    /// Generate narration for `text` and play it if the driving epoch that
    /// asked for it is still running.
    async fn narrate(&self, text: &str, epoch: u64) -> NarrationOutcome {
        let asset = match self.inner.narration.narrate(text).await {
            Ok(asset) => Arc::new(asset),
            Err(e) => {
                tracing::warn!(error = %ExplorerError::from(e), "narration unavailable");
                return NarrationOutcome::Failed;
            }
        };

        if !self.epoch_running(epoch) {
            tracing::info!("driving mode ended during narration; discarding audio");
            return NarrationOutcome::Discarded;
        }

        // Device start may block; it runs without the state lock. A driving
        // exit that lands meanwhile is caught by the second check.
        self.start_playback(asset);
        if !self.epoch_running(epoch) {
            tracing::info!("driving mode ended while playback started; stopping audio");
            self.inner.audio.release();
            return NarrationOutcome::Discarded;
        }
        NarrationOutcome::Played
    }

    fn epoch_running(&self, epoch: u64) -> bool {
        let state = self.lock();
        state.mode.is_driving() && state.driving_epoch == epoch
    }

    fn start_playback(&self, asset: Arc<AudioAsset>) {
        let duration = asset.duration();
        if self.inner.audio.play(asset) == PlaybackStatus::Stopped && !duration.is_zero() {
            let error = ExplorerError::PlaybackFailed("device did not start".into());
            tracing::warn!(error = %error, "narration playback");
        }
    }

    /// Switch between standing and driving.
    ///
    /// Entering driving starts a new auto-trigger epoch and takes the wake
    /// lock. Leaving it stops and releases narration audio before returning.
    pub fn set_mode(&self, mode: ExploreMode) -> ExplorerSnapshot {
        let (previous, snapshot) = self.transition(|state, _| {
            let previous = state.mode;
            state.mode = mode;
            match (previous.is_driving(), mode.is_driving()) {
                (false, true) => {
                    state.last_analyzed = None;
                    state.auto_deferred = false;
                    state.driving_epoch += 1;
                }
                (true, false) => {
                    state.auto_deferred = false;
                    self.inner.audio.release();
                }
                _ => {}
            }
            (previous, state.snapshot())
        });

        match (previous.is_driving(), mode.is_driving()) {
            (false, true) => {
                tracing::info!("driving mode on");
                if let Err(e) = self.inner.wake_lock.acquire() {
                    tracing::warn!(error = %e, "continuing without wake lock");
                }
            }
            (true, false) => {
                tracing::info!("driving mode off");
                self.inner.wake_lock.release();
            }
            _ => {}
        }
        snapshot
    }

    pub fn set_driving(&self, driving: bool) -> ExplorerSnapshot {
        self.set_mode(ExploreMode::from_driving(driving))
    }

    pub fn set_tracking(&self, tracking: bool) -> ExplorerSnapshot {
        self.transition(|state, _| {
            state.tracking = tracking;
            state.snapshot()
        })
    }

    /// Whether the source should be watched continuously.
    pub fn wants_watch(&self) -> bool {
        let state = self.lock();
        state.tracking || state.mode.is_driving()
    }

    /// Position for the driving auto-trigger, if one is due in this epoch.
    pub fn auto_trigger_due(&self) -> Option<Position> {
        self.lock().auto_trigger_due()
    }

    /// Consume the deferred-trigger flag set by updates that arrived while a
    /// driving lookup was in flight, returning the position to retry with.
    pub fn take_deferred_auto(&self) -> Option<Position> {
        let mut state = self.lock();
        if !std::mem::take(&mut state.auto_deferred) {
            return None;
        }
        state.auto_trigger_due()
    }

    pub fn stop_audio(&self) -> PlaybackStatus {
        self.inner.audio.stop()
    }

    /// Replay the last narration. `None` if nothing was narrated.
    pub fn replay_audio(&self) -> Option<PlaybackStatus> {
        self.inner.audio.replay()
    }

    /// Hide the highlight popup; the text stays available.
    pub fn dismiss_highlight(&self) -> ExplorerSnapshot {
        self.transition(|state, _| {
            state.highlight_pending = false;
            state.snapshot()
        })
    }

    /// Focus a known place. Unknown ids are ignored; returns whether the
    /// selection changed.
    pub fn select_place(&self, id: &str) -> bool {
        self.transition(|state, _| {
            if !state.places.contains(id) {
                tracing::debug!(id, "ignoring selection of unknown place");
                return false;
            }
            state.selected_place = Some(id.to_string());
            true
        })
    }

    pub fn clear_selection(&self) {
        self.transition(|state, _| state.selected_place = None);
    }

    /// Human-readable summary of every place seen this session.
    pub async fn itinerary(&self) -> crate::Result<String> {
        let places = self.lock().places.as_slice().to_vec();
        summarize_itinerary(self.inner.summarizer.as_ref(), &places)
            .await
            .map_err(|e| ExplorerError::ItineraryFailed(e.to_string()))
    }

    /// End of session: silence audio and drop the wake lock.
    pub fn shutdown(&self) {
        let driving = self.transition(|state, _| {
            self.inner.audio.release();
            state.mode.is_driving()
        });
        if driving {
            self.inner.wake_lock.release();
        }
        tracing::debug!("explorer shut down");
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Explorer")
            .field("phase", &state.phase)
            .field("mode", &state.mode)
            .field("places", &state.places.len())
            .finish()
    }
}
