//! Player configuration
//!
//! Built once by the host application and handed to `Player::new`.
//! Persisting it is the host's concern; the serde derives let it be
//! embedded in whatever config file the host already keeps.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Output rate used until the first loaded track pins its own.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Device block size in frames (~23ms @ 44.1kHz).
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

/// Position report period (20 updates per second).
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub sample_rate: u32,
    pub block_size: u32,
    pub report_interval_ms: u64,
    /// Loop default for newly loaded tracks.
    pub loop_tracks: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            loop_tracks: true,
        }
    }
}

impl PlayerConfig {
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_block_size(mut self, frames: u32) -> Self {
        self.block_size = frames;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_loop(mut self, enabled: bool) -> Self {
        self.loop_tracks = enabled;
        self
    }

    /// Report period, never shorter than one millisecond.
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms.max(1))
    }

    /// Latency of one device block at the configured rate.
    pub fn block_latency_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.block_size as f32 / self.sample_rate as f32 * 1000.0
    }
}
