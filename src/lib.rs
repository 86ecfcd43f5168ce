//! Multi-track loop playback engine.
//!
//! Loads a few short loops fully into memory and mixes them to one stereo
//! device, RC-300 style: each track starts and stops on its own, stopping
//! rewinds, and a background reporter publishes positions at a fixed rate.

pub mod audio;
pub mod config;
pub mod error;

pub use audio::{AudioBuffer, Player, PositionReport, TrackId, TrackInfo, Transport};
pub use config::PlayerConfig;
pub use error::{DecodeError, DeviceError};
