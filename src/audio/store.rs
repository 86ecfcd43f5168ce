use std::collections::HashMap;
use std::path::PathBuf;

use super::types::{frames_to_seconds, AudioBuffer, PositionReport, TrackId, TrackInfo, TrackMode};

/// Mutable playback state of one loaded track.
#[derive(Debug)]
pub struct TrackState {
    pub(crate) id: TrackId,
    pub(crate) buffer: AudioBuffer,
    pub(crate) file_path: Option<PathBuf>,
    pub(crate) playing: bool,
    /// Read cursor in frames, always below the frame count.
    pub(crate) position: usize,
    pub(crate) looping: bool,
}

impl TrackState {
    fn new(id: TrackId, buffer: AudioBuffer, file_path: Option<PathBuf>, looping: bool) -> Self {
        Self {
            id,
            buffer,
            file_path,
            playing: false,
            position: 0,
            looping,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn mode(&self) -> TrackMode {
        match (self.playing, self.looping) {
            (false, _) => TrackMode::Stopped,
            (true, true) => TrackMode::PlayingLooping,
            (true, false) => TrackMode::PlayingOnce,
        }
    }

    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            position_secs: frames_to_seconds(self.position, self.buffer.sample_rate()),
            duration_secs: self.buffer.duration(),
            playing: self.playing,
        }
    }

    /// Stop and rewind. Stopping is not pausing.
    pub(crate) fn halt(&mut self) {
        self.playing = false;
        self.position = 0;
    }
}

/// Every loaded track plus the derived master flag. Guarded by the player mutex.
#[derive(Debug)]
pub struct PlayerState {
    pub(crate) tracks: HashMap<TrackId, TrackState>,
    pub(crate) master_playing: bool,
    pub(crate) looping: bool,
}

impl PlayerState {
    pub fn new(looping: bool) -> Self {
        Self {
            tracks: HashMap::new(),
            master_playing: false,
            looping,
        }
    }

    /// Insert or replace a track, stopped and rewound.
    ///
    /// Returns true when no other track is loaded, i.e. this buffer pins the
    /// output sample rate.
    pub fn install(
        &mut self,
        id: TrackId,
        buffer: AudioBuffer,
        file_path: Option<PathBuf>,
    ) -> bool {
        let track = TrackState::new(id, buffer, file_path, self.looping);
        self.tracks.insert(id, track);
        self.refresh_master();
        self.tracks.len() == 1
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackState> {
        self.tracks.get(&id)
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<_> = self.tracks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn master_playing(&self) -> bool {
        self.master_playing
    }

    pub fn loop_enabled(&self) -> bool {
        self.looping
    }

    pub(crate) fn refresh_master(&mut self) {
        self.master_playing = self.tracks.values().any(|t| t.playing);
    }

    pub fn play_track(&mut self, id: TrackId) {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.playing = true;
        }
        self.refresh_master();
    }

    pub fn stop_track(&mut self, id: TrackId) {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.halt();
        }
        self.refresh_master();
    }

    pub fn toggle_track(&mut self, id: TrackId) {
        if let Some(track) = self.tracks.get_mut(&id) {
            if track.playing {
                track.halt();
            } else {
                track.playing = true;
            }
        }
        self.refresh_master();
    }

    pub fn play_all(&mut self) {
        for track in self.tracks.values_mut() {
            track.playing = true;
        }
        self.refresh_master();
    }

    pub fn stop_all(&mut self) {
        for track in self.tracks.values_mut() {
            track.halt();
        }
        self.master_playing = false;
    }

    /// RC-300 style "all tracks" button.
    pub fn toggle_all(&mut self) {
        if self.tracks.values().any(|t| t.playing) {
            self.stop_all();
        } else {
            self.play_all();
        }
    }

    /// Set the global loop default and apply it to every loaded track.
    pub fn set_loop(&mut self, enabled: bool) {
        self.looping = enabled;
        for track in self.tracks.values_mut() {
            track.looping = enabled;
        }
    }

    pub fn set_track_loop(&mut self, id: TrackId, enabled: bool) {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.looping = enabled;
        }
    }

    /// Track flag for `Some(id)`, master flag for `None`. Unknown ids are not playing.
    pub fn is_playing(&self, id: Option<TrackId>) -> bool {
        match id {
            Some(id) => self.tracks.get(&id).is_some_and(|t| t.playing),
            None => self.master_playing,
        }
    }

    pub fn track_info(&self, id: TrackId) -> Option<TrackInfo> {
        self.tracks.get(&id).map(TrackState::info)
    }

    pub fn snapshot(&self) -> PositionReport {
        self.tracks.iter().map(|(&id, t)| (id, t.info())).collect()
    }
}
