//! Single-source narration channel.
//!
//! Owns at most one playing source. Starting a new one always stops the
//! previous one first, so two narrations never overlap.

use crate::asset::AudioAsset;
use crate::device::{ActiveSource, CompletionSignal, OutputDevice};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
}

#[derive(Default)]
struct Slot {
    source: Option<Box<dyn ActiveSource>>,
    asset: Option<Arc<AudioAsset>>,
}

struct Shared {
    /// Current source and replay asset. Lock order: `slot` before `generation`.
    slot: Mutex<Slot>,
    /// Bumped on every play/stop so completions of superseded sources are ignored.
    generation: Mutex<u64>,
    status: watch::Sender<PlaybackStatus>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> u64 {
        let mut generation = self.generation();
        *generation += 1;
        self.status.send_replace(PlaybackStatus::Playing);
        *generation
    }

    fn halt(&self) {
        let mut generation = self.generation();
        *generation += 1;
        self.status.send_replace(PlaybackStatus::Stopped);
    }

    fn finished(&self, generation: u64) {
        let current = self.generation();
        if *current == generation {
            self.status.send_replace(PlaybackStatus::Stopped);
            tracing::debug!(generation, "narration playback finished");
        }
    }
}

fn stop_source(slot: &mut Slot) {
    if let Some(mut source) = slot.source.take() {
        if let Err(e) = source.stop() {
            // The device may already be gone (e.g. during teardown).
            tracing::debug!(error = %e, "ignoring failure to stop audio source");
        }
    }
}

/// Play/stop/replay over an injected output device.
#[derive(Clone)]
pub struct AudioChannel {
    device: Arc<dyn OutputDevice>,
    shared: Arc<Shared>,
}

impl AudioChannel {
    pub fn new(device: Arc<dyn OutputDevice>) -> Self {
        let (status, _) = watch::channel(PlaybackStatus::Stopped);
        Self {
            device,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                generation: Mutex::new(0),
                status,
            }),
        }
    }

    /// Stop whatever is playing, make `asset` the current asset and start it.
    pub fn play(&self, asset: Arc<AudioAsset>) -> PlaybackStatus {
        let mut slot = self.shared.slot();
        stop_source(&mut slot);
        slot.asset = Some(Arc::clone(&asset));

        let generation = self.shared.begin();
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let on_finished = CompletionSignal::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.finished(generation);
            }
        });

        match self.device.start(asset, on_finished) {
            Ok(source) => {
                slot.source = Some(source);
                tracing::debug!(generation, "narration playback started");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start narration playback");
                self.shared.finished(generation);
            }
        }

        self.status()
    }

    /// Stop the current source, if any. Idempotent.
    pub fn stop(&self) -> PlaybackStatus {
        let mut slot = self.shared.slot();
        stop_source(&mut slot);
        self.shared.halt();
        PlaybackStatus::Stopped
    }

    /// Replay the current asset. Returns `None` if no asset was ever played.
    pub fn replay(&self) -> Option<PlaybackStatus> {
        let asset = self.current_asset()?;
        Some(self.play(asset))
    }

    /// Stop and forget the current asset (end of a driving session).
    pub fn release(&self) {
        let mut slot = self.shared.slot();
        stop_source(&mut slot);
        slot.asset = None;
        self.shared.halt();
    }

    pub fn current_asset(&self) -> Option<Arc<AudioAsset>> {
        self.shared.slot().asset.clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        *self.shared.status.borrow()
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    /// Watch status changes, including asynchronous completion.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.shared.status.subscribe()
    }
}

impl std::fmt::Debug for AudioChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioChannel")
            .field("status", &self.status())
            .field("asset", &self.current_asset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceEvent, RecordingDevice};

    fn asset() -> Arc<AudioAsset> {
        Arc::new(AudioAsset::new(vec![0.1; 2400], 24000, 1).unwrap())
    }

    fn channel() -> (AudioChannel, RecordingDevice) {
        let device = RecordingDevice::new();
        (AudioChannel::new(Arc::new(device.clone())), device)
    }

    #[test]
    fn test_play_then_play_stops_first() {
        let (channel, device) = channel();

        channel.play(asset());
        channel.play(asset());

        assert_eq!(
            device.events(),
            vec![
                DeviceEvent::Started { source: 1 },
                DeviceEvent::Stopped { source: 1 },
                DeviceEvent::Started { source: 2 },
            ]
        );
        assert_eq!(device.active_sources(), vec![2]);
        assert!(channel.is_playing());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (channel, device) = channel();

        assert_eq!(channel.stop(), PlaybackStatus::Stopped);
        channel.play(asset());
        assert_eq!(channel.stop(), PlaybackStatus::Stopped);
        assert_eq!(channel.stop(), PlaybackStatus::Stopped);

        assert!(device.active_sources().is_empty());
        assert_eq!(channel.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_completion_flips_status() {
        let (channel, device) = channel();
        let rx = channel.subscribe();

        channel.play(asset());
        assert_eq!(*rx.borrow(), PlaybackStatus::Playing);

        assert!(device.finish_latest());
        assert_eq!(channel.status(), PlaybackStatus::Stopped);
        assert_eq!(*rx.borrow(), PlaybackStatus::Stopped);
    }

    /// Keeps every completion signal so a superseded source can "finish" late.
    #[derive(Default)]
    struct LateDevice {
        signals: Mutex<Vec<CompletionSignal>>,
    }

    struct IdleSource;

    impl ActiveSource for IdleSource {
        fn stop(&mut self) -> crate::Result<()> {
            Ok(())
        }
    }

    impl OutputDevice for LateDevice {
        fn start(
            &self,
            _asset: Arc<AudioAsset>,
            on_finished: CompletionSignal,
        ) -> crate::Result<Box<dyn ActiveSource>> {
            self.signals.lock().unwrap().push(on_finished);
            Ok(Box::new(IdleSource))
        }
    }

    #[test]
    fn test_stale_completion_does_not_stop_new_playback() {
        let device = Arc::new(LateDevice::default());
        let channel = AudioChannel::new(device.clone());

        channel.play(asset());
        channel.play(asset());

        let first = device.signals.lock().unwrap().remove(0);
        first.finish();
        assert!(channel.is_playing());

        let second = device.signals.lock().unwrap().remove(0);
        second.finish();
        assert!(!channel.is_playing());
    }

    #[test]
    fn test_replay_reuses_same_asset() {
        let (channel, device) = channel();
        assert!(channel.replay().is_none());
        assert_eq!(device.start_count(), 0);

        let original = asset();
        channel.play(Arc::clone(&original));
        channel.stop();

        assert_eq!(channel.replay(), Some(PlaybackStatus::Playing));
        assert!(Arc::ptr_eq(&channel.current_asset().unwrap(), &original));
        assert_eq!(device.start_count(), 2);
    }

    #[test]
    fn test_release_forgets_asset() {
        let (channel, _device) = channel();
        channel.play(asset());
        channel.release();

        assert!(channel.current_asset().is_none());
        assert!(channel.replay().is_none());
        assert!(!channel.is_playing());
    }

    #[test]
    fn test_invalidated_device_errors_are_swallowed() {
        let (channel, device) = channel();
        channel.play(asset());
        device.invalidate();

        assert_eq!(channel.stop(), PlaybackStatus::Stopped);
        channel.play(asset());
        assert!(channel.is_playing());
    }

    #[test]
    fn test_failed_start_reports_stopped() {
        let (channel, device) = channel();
        device.fail_next_start();

        assert_eq!(channel.play(asset()), PlaybackStatus::Stopped);
        assert!(channel.current_asset().is_some());
    }
}
