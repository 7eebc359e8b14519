//! Output device abstraction.
//!
//! The channel talks to hardware only through these traits, so the single
//! shared speaker is an injected handle rather than a global.

use crate::asset::AudioAsset;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};

/// Invoked once when a source plays to its natural end.
pub struct CompletionSignal {
    callback: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl CompletionSignal {
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn noop() -> Self {
        Self { callback: None }
    }

    pub fn finish(mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("armed", &self.callback.is_some())
            .finish()
    }
}

/// A speaker (or anything that can play an asset).
pub trait OutputDevice: Send + Sync {
    /// Start playing `asset`. `on_finished` fires if playback runs to the end
    /// without being stopped. It may fire before `start` returns.
    fn start(
        &self,
        asset: Arc<AudioAsset>,
        on_finished: CompletionSignal,
    ) -> crate::Result<Box<dyn ActiveSource>>;
}

/// A playing source bound to one asset.
pub trait ActiveSource: Send {
    /// Stop playback. May fail if the device already invalidated the source.
    fn stop(&mut self) -> crate::Result<()>;
}

/// Plays nothing, but takes as long as the asset lasts.
///
/// Used when no speaker is wired up (headless runs).
#[derive(Debug, Default)]
pub struct SilentDevice;

struct SilentSource {
    stop_tx: Sender<()>,
}

impl OutputDevice for SilentDevice {
    fn start(
        &self,
        asset: Arc<AudioAsset>,
        on_finished: CompletionSignal,
    ) -> crate::Result<Box<dyn ActiveSource>> {
        let (stop_tx, stop_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::bounded(1);
        let duration = asset.duration();

        std::thread::spawn(move || match stop_rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => on_finished.finish(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
        });

        Ok(Box::new(SilentSource { stop_tx }))
    }
}

impl ActiveSource for SilentSource {
    fn stop(&mut self) -> crate::Result<()> {
        self.stop_tx
            .try_send(())
            .map_err(|_| crate::AudioError::SourceInvalidated)
    }
}

/// Something a [`RecordingDevice`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Started { source: u64 },
    Stopped { source: u64 },
    Finished { source: u64 },
}

#[derive(Default)]
struct RecordingState {
    next_id: u64,
    events: Vec<DeviceEvent>,
    pending: Vec<(u64, CompletionSignal)>,
    fail_start: bool,
    invalidated: bool,
}

/// Device double that records every start/stop and lets callers complete
/// sources by hand.
#[derive(Clone, Default)]
pub struct RecordingDevice {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.lock().events.clone()
    }

    pub fn start_count(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Started { .. }))
            .count()
    }

    /// Sources started and neither stopped nor finished.
    pub fn active_sources(&self) -> Vec<u64> {
        let state = self.lock();
        let mut active = Vec::new();
        for event in &state.events {
            match *event {
                DeviceEvent::Started { source } => active.push(source),
                DeviceEvent::Stopped { source } | DeviceEvent::Finished { source } => {
                    active.retain(|s| *s != source)
                }
            }
        }
        active
    }

    /// Make the next `start` fail.
    pub fn fail_next_start(&self) {
        self.lock().fail_start = true;
    }

    /// Simulate the device being torn down: every later `stop` errors.
    pub fn invalidate(&self) {
        self.lock().invalidated = true;
    }

    /// Play the most recently started, still pending source to its end.
    pub fn finish_latest(&self) -> bool {
        let signal = {
            let mut state = self.lock();
            let Some((source, signal)) = state.pending.pop() else {
                return false;
            };
            state.events.push(DeviceEvent::Finished { source });
            signal
        };
        signal.finish();
        true
    }
}

struct RecordingSource {
    id: u64,
    device: RecordingDevice,
}

impl OutputDevice for RecordingDevice {
    fn start(
        &self,
        _asset: Arc<AudioAsset>,
        on_finished: CompletionSignal,
    ) -> crate::Result<Box<dyn ActiveSource>> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_start) {
            return Err(crate::AudioError::StreamError("device refused to start".into()));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.events.push(DeviceEvent::Started { source: id });
        state.pending.push((id, on_finished));

        Ok(Box::new(RecordingSource {
            id,
            device: self.clone(),
        }))
    }
}

impl ActiveSource for RecordingSource {
    fn stop(&mut self) -> crate::Result<()> {
        let mut state = self.device.lock();
        if state.invalidated {
            return Err(crate::AudioError::SourceInvalidated);
        }
        state.pending.retain(|(id, _)| *id != self.id);
        if !state
            .events
            .iter()
            .any(|e| matches!(e, DeviceEvent::Finished { source } if *source == self.id))
        {
            state.events.push(DeviceEvent::Stopped { source: self.id });
        }
        Ok(())
    }
}

impl std::fmt::Debug for RecordingDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingDevice")
            .field("events", &self.events())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn short_asset() -> Arc<AudioAsset> {
        Arc::new(AudioAsset::new(vec![0.0; 240], 24000, 1).unwrap())
    }

    #[test]
    fn test_silent_device_finishes_after_duration() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        let _source = SilentDevice
            .start(short_asset(), CompletionSignal::new(move || flag.store(true, Ordering::SeqCst)))
            .unwrap();

        for _ in 0..100 {
            if done.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_silent_device_stop_suppresses_completion() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let long = Arc::new(AudioAsset::new(vec![0.0; 24000 * 5], 24000, 1).unwrap());

        let mut source = SilentDevice
            .start(long, CompletionSignal::new(move || flag.store(true, Ordering::SeqCst)))
            .unwrap();
        source.stop().unwrap();

        std::thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_recording_device_tracks_active_sources() {
        let device = RecordingDevice::new();
        let mut a = device.start(short_asset(), CompletionSignal::noop()).unwrap();
        let _b = device.start(short_asset(), CompletionSignal::noop()).unwrap();

        assert_eq!(device.active_sources(), vec![1, 2]);
        a.stop().unwrap();
        assert_eq!(device.active_sources(), vec![2]);
        assert!(device.finish_latest());
        assert!(device.active_sources().is_empty());
        assert!(!device.finish_latest());
    }
}
