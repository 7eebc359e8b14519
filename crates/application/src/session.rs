//! Session event loop.
//!
//! Connects a [`LocationSource`] and a command queue to an [`Explorer`]:
//! picks one-shot vs continuous location reads, applies the driving
//! auto-trigger, runs lookups in the background and forwards playback
//! status to the event bus. Events are handled one at a time in arrival
//! order.

use crate::explorer::{ExploreOutcome, Explorer};
use roadlore_audio::PlaybackStatus;
use roadlore_context::Position;
use roadlore_events::{EventBusRef, ExplorerEvent, NullEventBus, PlaybackChangedEvent};
use roadlore_geo::{LocationError, LocationSource, LocationWatch};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Requests from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Manual explore at the current position.
    Explore,
    SetDriving(bool),
    SetTracking(bool),
    StopAudio,
    ReplayAudio,
    DismissHighlight,
    SelectPlace(String),
    ClearSelection,
    /// Re-subscribe after a location failure.
    RetryLocation,
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
#[error("session has ended")]
pub struct SessionClosed;

/// Sending half of a session's command queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.tx.send(command).await.map_err(|_| SessionClosed)
    }

    pub async fn explore(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Explore).await
    }

    pub async fn set_driving(&self, driving: bool) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SetDriving(driving)).await
    }

    pub async fn set_tracking(&self, tracking: bool) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SetTracking(tracking)).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct Session {
    explorer: Explorer,
    source: Arc<dyn LocationSource>,
    events: EventBusRef,
    commands: mpsc::Receiver<SessionCommand>,
    watch: Option<LocationWatch>,
    one_shot: Option<JoinHandle<roadlore_geo::Result<Position>>>,
    lookups: JoinSet<ExploreOutcome>,
    /// Set after a location failure until the caller retries.
    location_failed: bool,
}

impl Session {
    pub fn new(explorer: Explorer, source: Arc<dyn LocationSource>) -> (Self, SessionHandle) {
        let (tx, commands) = mpsc::channel(explorer.config().command_buffer.max(1));
        let session = Self {
            explorer,
            source,
            events: Arc::new(NullEventBus),
            commands,
            watch: None,
            one_shot: None,
            lookups: JoinSet::new(),
            location_failed: false,
        };
        (session, SessionHandle { tx })
    }

    /// Bus for `audio:playback_changed` notifications.
    pub fn with_event_bus(mut self, events: EventBusRef) -> Self {
        self.events = events;
        self
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    /// Run until shutdown is requested or every handle is dropped.
    /// In-flight lookups are awaited before returning.
    pub async fn run(mut self) -> Explorer {
        let mut playback = self.explorer.audio().subscribe();
        tracing::info!("session started");

        // Missing credentials short-circuit before any location subscription.
        self.refresh_subscription(false);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(command) => self.handle_command(command),
                },
                reading = next_reading(&mut self.watch) => match reading {
                    Some(reading) => self.handle_reading(reading),
                    None => {
                        tracing::debug!("location watch ended");
                        self.watch = None;
                    }
                },
                reading = one_shot_result(&mut self.one_shot) => {
                    self.one_shot = None;
                    self.handle_reading(reading);
                }
                Some(done) = self.lookups.join_next(), if !self.lookups.is_empty() => {
                    self.handle_lookup_done(done);
                }
                Ok(()) = playback.changed() => {
                    let status = *playback.borrow_and_update();
                    forward_playback(&self.events, status);
                }
            }

            if self.explorer.phase().is_terminal() && self.is_subscribed() {
                tracing::info!("configuration missing; stopping location updates");
                self.unsubscribe();
            }
        }

        self.unsubscribe();
        while let Some(done) = self.lookups.join_next().await {
            self.handle_lookup_done(done);
        }
        self.explorer.shutdown();
        tracing::info!(places = self.explorer.snapshot().places.len(), "session ended");
        self.explorer
    }

    fn handle_command(&mut self, command: SessionCommand) {
        tracing::debug!(?command, "session command");
        match command {
            SessionCommand::Explore => match self.explorer.position() {
                Some(position) => self.spawn_lookup(position, false),
                None => tracing::debug!("no position yet; explore ignored"),
            },
            SessionCommand::SetDriving(driving) => {
                self.explorer.set_driving(driving);
                self.refresh_subscription(false);
                self.maybe_auto_explore();
            }
            SessionCommand::SetTracking(tracking) => {
                self.explorer.set_tracking(tracking);
                self.refresh_subscription(false);
            }
            SessionCommand::StopAudio => {
                self.explorer.stop_audio();
            }
            SessionCommand::ReplayAudio => {
                if self.explorer.replay_audio().is_none() {
                    tracing::debug!("nothing to replay");
                }
            }
            SessionCommand::DismissHighlight => {
                self.explorer.dismiss_highlight();
            }
            SessionCommand::SelectPlace(id) => {
                self.explorer.select_place(&id);
            }
            SessionCommand::ClearSelection => self.explorer.clear_selection(),
            SessionCommand::RetryLocation => {
                self.location_failed = false;
                self.unsubscribe();
                self.refresh_subscription(true);
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_reading(&mut self, reading: roadlore_geo::Result<Position>) {
        match reading {
            Ok(position) => {
                tracing::trace!(%position, "location update");
                self.explorer.on_location_update(position);
                self.maybe_auto_explore();
            }
            Err(error) => self.handle_location_error(error),
        }
    }

    fn handle_location_error(&mut self, error: LocationError) {
        self.explorer.on_location_error(&error);
        self.location_failed = true;
        self.unsubscribe();
    }

    fn handle_lookup_done(&mut self, done: Result<ExploreOutcome, tokio::task::JoinError>) {
        match done {
            Ok(outcome) => {
                tracing::debug!(completed = outcome.is_completed(), "lookup finished");
                if let Some(position) = self.explorer.take_deferred_auto() {
                    tracing::debug!("re-evaluating deferred driving trigger");
                    self.spawn_lookup(position, true);
                }
            }
            Err(e) => tracing::warn!(error = %e, "lookup task failed"),
        }
    }

    /// Readings handled before the spawned lookup claims `Analyzing` may
    /// spawn more; `explore` refuses every auto call after the first.
    fn maybe_auto_explore(&mut self) {
        if let Some(position) = self.explorer.auto_trigger_due() {
            tracing::info!(%position, "driving auto-trigger");
            self.spawn_lookup(position, true);
        }
    }

    fn spawn_lookup(&mut self, position: Position, auto: bool) {
        let explorer = self.explorer.clone();
        self.lookups
            .spawn(async move { explorer.explore(position, auto).await });
    }

    fn is_subscribed(&self) -> bool {
        self.watch.is_some() || self.one_shot.is_some()
    }

    /// Pick the location mode for the current tracking/driving flags.
    /// Without a watch, a one-shot read is made at start, when the watch
    /// is dropped, or when `force` is set.
    fn refresh_subscription(&mut self, force: bool) {
        if self.explorer.phase().is_terminal() || self.location_failed {
            return;
        }

        if self.explorer.wants_watch() {
            if let Some(one_shot) = self.one_shot.take() {
                one_shot.abort();
            }
            if self.watch.is_none() {
                tracing::debug!("starting continuous location watch");
                self.watch = Some(self.source.watch_position(self.explorer.config().watch));
            }
        } else {
            let had_watch = self.watch.take().is_some_and(|w| {
                w.cancel();
                true
            });
            let first = self.explorer.position().is_none();
            if self.one_shot.is_none() && (had_watch || first || force) {
                tracing::debug!("requesting one-shot position");
                let source = Arc::clone(&self.source);
                let options = self.explorer.config().one_shot;
                self.one_shot =
                    Some(tokio::spawn(async move { source.current_position(&options).await }));
            }
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.cancel();
        }
        if let Some(one_shot) = self.one_shot.take() {
            one_shot.abort();
        }
    }
}

fn forward_playback(events: &EventBusRef, status: PlaybackStatus) {
    events.publish(ExplorerEvent::PlaybackChanged(PlaybackChangedEvent {
        playing: status == PlaybackStatus::Playing,
    }));
}

async fn next_reading(watch: &mut Option<LocationWatch>) -> Option<roadlore_geo::Result<Position>> {
    match watch {
        Some(watch) => watch.next().await,
        None => std::future::pending().await,
    }
}

async fn one_shot_result(
    handle: &mut Option<JoinHandle<roadlore_geo::Result<Position>>>,
) -> roadlore_geo::Result<Position> {
    match handle {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(e) => Err(LocationError::Unavailable(e.to_string())),
        },
        None => std::future::pending().await,
    }
}
