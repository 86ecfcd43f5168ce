use std::collections::BTreeMap;

/// Caller-assigned track number (1..N, typically 1..3 for an RC-300 patch).
pub type TrackId = u8;

/// Number of output channels. Every buffer is stored as stereo.
pub const CHANNELS: usize = 2;

/// A fully decoded, immutable stereo sample buffer for one track.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    frames: Vec<[f32; CHANNELS]>,
    sample_rate: u32,
    source_channels: u16,
}

impl AudioBuffer {
    /// Build from stereo frames.
    pub fn new(frames: Vec<[f32; CHANNELS]>, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate,
            source_channels: CHANNELS as u16,
        }
    }

    /// Build from interleaved samples with any channel count.
    ///
    /// Mono is duplicated into both channels; sources with more than two
    /// channels keep their first two. A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Self {
        let ch = channels.max(1) as usize;
        let frames = samples
            .chunks_exact(ch)
            .map(|frame| match ch {
                1 => [frame[0], frame[0]],
                _ => [frame[0], frame[1]],
            })
            .collect();

        Self {
            frames,
            sample_rate,
            source_channels: ch as u16,
        }
    }

    pub fn frames(&self) -> &[[f32; CHANNELS]] {
        &self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the decoded source before stereo expansion.
    pub fn source_channels(&self) -> u16 {
        self.source_channels
    }

    /// Total number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        frames_to_seconds(self.frames.len(), self.sample_rate)
    }
}

pub(crate) fn frames_to_seconds(frames: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

/// Per-track playback mode, derived from the `playing` and `loop` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    Stopped,
    PlayingLooping,
    PlayingOnce,
}

/// Position telemetry for one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackInfo {
    pub position_secs: f64,
    pub duration_secs: f64,
    pub playing: bool,
}

/// Snapshot of every loaded track, keyed by track id.
pub type PositionReport = BTreeMap<TrackId, TrackInfo>;
