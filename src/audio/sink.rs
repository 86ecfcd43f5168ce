//! Output device binding

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::types::CHANNELS;
use crate::error::{DeviceError, DeviceResult};

/// Render callback handed to the device. Receives interleaved stereo samples.
pub type RenderFn = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Requested stream shape: stereo f32 at a fixed rate and block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub block_size: u32,
}

/// An opened output stream. Dropping it closes the stream.
pub trait OutputStream: Send {
    fn play(&self) -> DeviceResult<()>;
    fn pause(&self) -> DeviceResult<()>;
}

/// Something that can open an output stream driven by a render callback.
pub trait AudioSink: Send {
    fn open(&self, spec: StreamSpec, render: RenderFn) -> DeviceResult<Box<dyn OutputStream>>;
}

/// Default output device of the default cpal host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalSink;

struct CpalStream {
    stream: cpal::Stream,
}

impl OutputStream for CpalStream {
    fn play(&self) -> DeviceResult<()> {
        self.stream
            .play()
            .map_err(|e| DeviceError::StreamPlay(e.to_string()))
    }

    fn pause(&self) -> DeviceResult<()> {
        self.stream
            .pause()
            .map_err(|e| DeviceError::StreamPause(e.to_string()))
    }
}

impl AudioSink for CpalSink {
    fn open(&self, spec: StreamSpec, mut render: RenderFn) -> DeviceResult<Box<dyn OutputStream>> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;

        let default_config = device
            .default_output_config()
            .map_err(|e| DeviceError::UnsupportedConfig(e.to_string()))?;
        let sample_format = default_config.sample_format();
        if sample_format != cpal::SampleFormat::F32 {
            return Err(DeviceError::UnsupportedConfig(format!(
                "Unsupported sample format: {sample_format:?}"
            )));
        }

        let config = cpal::StreamConfig {
            channels: CHANNELS as u16,
            sample_rate: spec.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(spec.block_size),
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render(data),
                |err| {
                    log::error!("Audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| DeviceError::StreamBuild(e.to_string()))?;

        log::info!(
            "Opened output stream: {} channels, {}Hz, {} frames (~{:.1}ms)",
            CHANNELS,
            spec.sample_rate,
            spec.block_size,
            spec.block_size as f32 / spec.sample_rate.max(1) as f32 * 1000.0
        );

        Ok(Box::new(CpalStream { stream }))
    }
}
