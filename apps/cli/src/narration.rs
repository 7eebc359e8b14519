//! Writes each new narration to disk as it starts playing.

use roadlore_audio::{AudioAsset, AudioChannel, PlaybackStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub fn narration_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("narration-{index:03}.wav"))
}

/// Follow `audio` and save every distinct asset. Replays are not saved twice.
/// Runs until aborted.
pub fn spawn_recorder(audio: AudioChannel, dir: PathBuf) -> JoinHandle<()> {
    let mut status = audio.subscribe();
    tokio::spawn(async move {
        let mut last: Option<Arc<AudioAsset>> = None;
        let mut saved = 0;

        while status.changed().await.is_ok() {
            if *status.borrow_and_update() != PlaybackStatus::Playing {
                continue;
            }
            let Some(asset) = audio.current_asset() else {
                continue;
            };
            if last.as_ref().is_some_and(|prev| Arc::ptr_eq(prev, &asset)) {
                continue;
            }

            saved += 1;
            let path = narration_path(&dir, saved);
            match asset.save_wav(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "narration saved"),
                Err(e) => tracing::warn!(error = %e, path = %path.display(), "failed to save narration"),
            }
            last = Some(asset);
        }
    })
}
