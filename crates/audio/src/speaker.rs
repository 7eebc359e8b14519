//! Speaker output through cpal's default output device.
//!
//! cpal streams are not `Send` on every platform, so each source owns a
//! dedicated thread that builds the stream, plays it, and drops it. Assets
//! are converted to the device's default output config before playback.

use crate::asset::AudioAsset;
use crate::device::{ActiveSource, CompletionSignal, OutputDevice};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

/// Default system speaker.
#[derive(Debug, Default)]
pub struct CpalDevice;

impl CpalDevice {
    pub fn new() -> Self {
        Self
    }
}

struct CpalSource {
    stop_tx: Sender<()>,
}

impl ActiveSource for CpalSource {
    fn stop(&mut self) -> crate::Result<()> {
        self.stop_tx
            .try_send(())
            .map_err(|_| crate::AudioError::SourceInvalidated)
    }
}

fn build_stream(
    asset: Arc<AudioAsset>,
    finished_tx: Sender<()>,
) -> crate::Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| crate::AudioError::DeviceNotFound("default output".to_string()))?;

    let config = device
        .default_output_config()
        .map_err(|e| crate::AudioError::StreamError(e.to_string()))?;
    let rendered = asset.convert(config.sample_rate().0, config.channels())?;
    tracing::debug!(
        sample_rate = config.sample_rate().0,
        channels = config.channels(),
        format = ?config.sample_format(),
        "output config"
    );

    let stream = match config.sample_format() {
        SampleFormat::F32 => build_output::<f32>(&device, &config.into(), rendered, finished_tx)?,
        SampleFormat::I16 => build_output::<i16>(&device, &config.into(), rendered, finished_tx)?,
        SampleFormat::U16 => build_output::<u16>(&device, &config.into(), rendered, finished_tx)?,
        format => {
            return Err(crate::AudioError::StreamError(format!(
                "unsupported sample format: {format:?}"
            )))
        }
    };

    stream
        .play()
        .map_err(|e| crate::AudioError::StreamError(e.to_string()))?;
    Ok(stream)
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rendered: AudioAsset,
    finished_tx: Sender<()>,
) -> crate::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut cursor = 0usize;
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let samples = rendered.samples();
            for out in data.iter_mut() {
                let sample = match samples.get(cursor) {
                    Some(&s) => {
                        cursor += 1;
                        s
                    }
                    None => 0.0,
                };
                *out = T::from_sample(sample);
            }
            if cursor >= samples.len() {
                let _ = finished_tx.try_send(());
            }
        },
        |err| tracing::warn!(%err, "output stream error"),
        None,
    )?;
    Ok(stream)
}

impl OutputDevice for CpalDevice {
    fn start(
        &self,
        asset: Arc<AudioAsset>,
        on_finished: CompletionSignal,
    ) -> crate::Result<Box<dyn ActiveSource>> {
        let (stop_tx, stop_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::bounded(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<crate::Result<()>>(1);

        std::thread::spawn(move || {
            let (finished_tx, finished_rx) = crossbeam_channel::bounded::<()>(1);
            let stream = match build_stream(asset, finished_tx) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            crossbeam_channel::select! {
                recv(stop_rx) -> _ => drop(stream),
                recv(finished_rx) -> _ => {
                    drop(stream);
                    on_finished.finish();
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalSource { stop_tx })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(crate::AudioError::StreamError(
                "speaker thread exited before starting".to_string(),
            )),
        }
    }
}
