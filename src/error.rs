//! Error types for decoding and audio output

use thiserror::Error;

/// Errors raised while decoding an audio file into memory.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open file: {0}")]
    Open(#[from] std::io::Error),

    #[error("Failed to probe format: {0}")]
    Probe(String),

    #[error("No default track found")]
    NoTrack,

    #[error("No sample rate in track")]
    NoSampleRate,

    #[error("Failed to create decoder: {0}")]
    Codec(String),

    #[error("Error reading packet: {0}")]
    Read(String),
}

/// Errors raised while opening or driving the output device.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Unsupported output config: {0}")]
    UnsupportedConfig(String),

    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    #[error("Failed to start stream: {0}")]
    StreamPlay(String),

    #[error("Failed to pause stream: {0}")]
    StreamPause(String),

    #[error("Failed to spawn position reporter: {0}")]
    Reporter(std::io::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type DeviceResult<T> = Result<T, DeviceError>;
