mod asset;
mod channel;
mod convert;
mod device;

#[cfg(feature = "cpal")]
mod speaker;

pub use asset::AudioAsset;
pub use channel::{AudioChannel, PlaybackStatus};
pub use device::{
    ActiveSource, CompletionSignal, DeviceEvent, OutputDevice, RecordingDevice, SilentDevice,
};

#[cfg(feature = "cpal")]
pub use speaker::CpalDevice;

/// Sample rate of narration audio produced by the TTS service.
pub const NARRATION_SAMPLE_RATE: u32 = 24000;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("stream error: {0}")]
    StreamError(String),
    #[error("invalid audio asset: {0}")]
    InvalidAsset(String),
    #[error("audio source already invalidated")]
    SourceInvalidated,
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
    #[cfg(feature = "cpal")]
    #[error("build stream error: {0}")]
    BuildStreamError(#[from] cpal::BuildStreamError),
}

pub type Result<T> = std::result::Result<T, AudioError>;
