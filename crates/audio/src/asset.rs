use hound::{WavSpec, WavWriter};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A decoded, playable narration buffer.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`. Cloning shares the
/// sample storage.
#[derive(Clone)]
pub struct AudioAsset {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioAsset {
    pub fn new(
        samples: impl Into<Arc<[f32]>>,
        sample_rate: u32,
        channels: u16,
    ) -> crate::Result<Self> {
        let samples = samples.into();
        if sample_rate == 0 {
            return Err(crate::AudioError::InvalidAsset("sample rate is zero".into()));
        }
        if channels == 0 {
            return Err(crate::AudioError::InvalidAsset("channel count is zero".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(crate::AudioError::InvalidAsset(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Decode little-endian signed 16-bit PCM, as returned by TTS services.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32, channels: u16) -> crate::Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(crate::AudioError::InvalidAsset(format!(
                "odd PCM16 byte length {}",
                bytes.len()
            )));
        }

        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        Self::new(samples, sample_rate, channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn save_wav(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let file = std::fs::File::create(path.as_ref())
            .map_err(|e| crate::AudioError::StreamError(format!("failed to create file: {e}")))?;
        let mut writer = WavWriter::new(BufWriter::new(file), spec)?;

        for &sample in self.samples.iter() {
            let int_sample = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(int_sample)?;
        }

        writer.finalize()?;
        Ok(())
    }
}

impl std::fmt::Debug for AudioAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioAsset")
            .field("frames", &self.frame_count())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_decode() {
        let mut bytes = Vec::new();
        for s in [0i16, i16::MAX, i16::MIN, -16384] {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        let asset = AudioAsset::from_pcm16_le(&bytes, 24000, 1).unwrap();
        let samples = asset.samples();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(samples[2], -1.0);
        assert_eq!(samples[3], -0.5);
    }

    #[test]
    fn test_pcm16_rejects_odd_length() {
        assert!(AudioAsset::from_pcm16_le(&[0, 1, 2], 24000, 1).is_err());
    }

    #[test]
    fn test_channel_layout_validation() {
        assert!(AudioAsset::new(vec![0.0; 3], 24000, 2).is_err());
        assert!(AudioAsset::new(vec![0.0; 4], 0, 2).is_err());
        let stereo = AudioAsset::new(vec![0.0; 4], 24000, 2).unwrap();
        assert_eq!(stereo.frame_count(), 2);
    }

    #[test]
    fn test_duration() {
        let asset = AudioAsset::new(vec![0.0; 12000], 24000, 1).unwrap();
        assert_eq!(asset.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_save_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narration.wav");
        let asset = AudioAsset::new(vec![0.0, 0.5, -0.5, 1.0], 24000, 1).unwrap();

        asset.save_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.len(), 4);
    }
}
