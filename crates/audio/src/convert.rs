//! Rendering narration into an output device's native format.

use crate::asset::AudioAsset;
use crate::AudioError;
use rubato::{FftFixedIn, Resampler};

const CHUNK_FRAMES: usize = 256;

impl AudioAsset {
    /// Re-render for a device running at `sample_rate` with `channels`.
    ///
    /// Input channels are averaged to mono, resampled, then copied to every
    /// output channel. Duration is preserved to the nearest frame.
    pub fn convert(&self, sample_rate: u32, channels: u16) -> crate::Result<AudioAsset> {
        if sample_rate == self.sample_rate() && channels == self.channels() {
            return Ok(self.clone());
        }
        if channels == 0 {
            return Err(AudioError::InvalidAsset("channel count is zero".into()));
        }

        let mono = downmix(self.samples(), self.channels());
        let mono = if sample_rate == self.sample_rate() {
            mono
        } else {
            resample(&mono, self.sample_rate(), sample_rate)?
        };
        AudioAsset::new(upmix(&mono, channels), sample_rate, channels)
    }
}

fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn upmix(mono: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return mono.to_vec();
    }
    mono.iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
        .collect()
}

fn resample(mono: &[f32], from_rate: u32, to_rate: u32) -> crate::Result<Vec<f32>> {
    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_FRAMES, 2, 1)
            .map_err(|e| AudioError::StreamError(format!("resampler: {e}")))?;
    let process_err = |e: rubato::ResampleError| AudioError::StreamError(format!("resample: {e}"));

    let expected = (mono.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(expected + delay + CHUNK_FRAMES);

    let mut chunks = mono.chunks_exact(CHUNK_FRAMES);
    for chunk in &mut chunks {
        let frames = resampler.process(&[chunk], None).map_err(process_err)?;
        out.extend_from_slice(&frames[0]);
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let frames = resampler
            .process_partial(Some(&[rest][..]), None)
            .map_err(process_err)?;
        out.extend_from_slice(&frames[0]);
    }
    // Flush the filter's delay line.
    while out.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(process_err)?;
        if frames[0].is_empty() {
            break;
        }
        out.extend_from_slice(&frames[0]);
    }

    out.drain(..delay.min(out.len()));
    out.resize(expected, 0.0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_matching_format_is_passed_through() {
        let asset = AudioAsset::new(vec![0.1, -0.2, 0.3], 24000, 1).unwrap();
        let out = asset.convert(24000, 1).unwrap();
        assert_eq!(out.samples(), asset.samples());
    }

    #[test]
    fn test_mono_narration_fills_stereo_speaker() {
        let asset = AudioAsset::new(sine(440.0, 24000, 2400), 24000, 1).unwrap();
        let out = asset.convert(48000, 2).unwrap();

        assert_eq!(out.sample_rate(), 48000);
        assert_eq!(out.channels(), 2);
        assert_eq!(out.frame_count(), 4800);
        assert_eq!(out.duration(), asset.duration());
        for frame in out.samples().chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn test_resampling_keeps_signal_level() {
        let asset = AudioAsset::new(sine(440.0, 24000, 4800), 24000, 1).unwrap();
        let out = asset.convert(44100, 1).unwrap();

        assert_eq!(out.frame_count(), 8820);
        let middle = &out.samples()[2000..6000];
        assert!((rms(middle) - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.05);
    }

    #[test]
    fn test_same_rate_only_remaps_channels() {
        let asset = AudioAsset::new(vec![0.2, 0.4, -0.6, 0.0], 24000, 2).unwrap();
        let out = asset.convert(24000, 1).unwrap();
        let samples = out.samples();
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 0.3).abs() < 1e-6);
        assert!((samples[1] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_zero_channel_device_is_rejected() {
        let asset = AudioAsset::new(vec![0.0; 4], 24000, 1).unwrap();
        assert!(matches!(
            asset.convert(48000, 0),
            Err(AudioError::InvalidAsset(_))
        ));
    }
}
