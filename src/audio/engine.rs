use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::decoder::decode_file;
use super::mixer;
use super::reporter::{PositionCallback, PositionReporter};
use super::sink::{AudioSink, CpalSink, OutputStream, StreamSpec};
use super::store::PlayerState;
use super::types::{AudioBuffer, PositionReport, TrackId, TrackInfo};
use crate::config::PlayerConfig;
use crate::error::{DecodeResult, DeviceError, DeviceResult};

/// Cloneable handle to the transport controls.
///
/// Every call takes the player lock for its full (short) duration, so a
/// handle can be moved to a UI or MIDI thread while the `Player` lives elsewhere.
#[derive(Clone)]
pub struct Transport {
    shared: Arc<Mutex<PlayerState>>,
}

impl Transport {
    fn new(looping: bool) -> Self {
        Self {
            shared: Arc::new(Mutex::new(PlayerState::new(looping))),
        }
    }

    pub fn play_track(&self, id: TrackId) {
        log::debug!("play_track({id})");
        self.shared.lock().play_track(id);
    }

    pub fn stop_track(&self, id: TrackId) {
        log::debug!("stop_track({id})");
        self.shared.lock().stop_track(id);
    }

    pub fn toggle_track(&self, id: TrackId) {
        log::debug!("toggle_track({id})");
        self.shared.lock().toggle_track(id);
    }

    pub fn play_all(&self) {
        log::debug!("play_all");
        self.shared.lock().play_all();
    }

    pub fn stop_all(&self) {
        log::debug!("stop_all");
        self.shared.lock().stop_all();
    }

    pub fn toggle_all(&self) {
        log::debug!("toggle_all");
        self.shared.lock().toggle_all();
    }

    pub fn set_loop(&self, enabled: bool) {
        log::debug!("set_loop({enabled})");
        self.shared.lock().set_loop(enabled);
    }

    pub fn set_track_loop(&self, id: TrackId, enabled: bool) {
        log::debug!("set_track_loop({id}, {enabled})");
        self.shared.lock().set_track_loop(id, enabled);
    }

    /// `Some(id)` asks about one track, `None` about the master state.
    pub fn is_playing(&self, id: Option<TrackId>) -> bool {
        self.shared.lock().is_playing(id)
    }

    pub fn get_track_info(&self, id: TrackId) -> Option<TrackInfo> {
        self.shared.lock().track_info(id)
    }

    pub fn loop_enabled(&self) -> bool {
        self.shared.lock().loop_enabled()
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.shared.lock().track_ids()
    }

    pub fn snapshot(&self) -> PositionReport {
        self.shared.lock().snapshot()
    }
}

/// Plays up to a handful of in-memory loops through one stereo output.
pub struct Player {
    config: PlayerConfig,
    transport: Transport,
    sink: Box<dyn AudioSink>,
    output_sample_rate: u32,
    on_position: Option<PositionCallback>,
    stream: Option<Box<dyn OutputStream>>,
    reporter: Option<PositionReporter>,
}

impl Player {
    pub fn new(config: PlayerConfig, sink: impl AudioSink + 'static) -> Self {
        Self {
            transport: Transport::new(config.loop_tracks),
            output_sample_rate: config.sample_rate,
            sink: Box::new(sink),
            on_position: None,
            stream: None,
            reporter: None,
            config,
        }
    }

    /// Player bound to the system default output device.
    pub fn with_default_device(config: PlayerConfig) -> Self {
        Self::new(config, CpalSink)
    }

    /// Install the callback fed by the position reporter.
    ///
    /// Runs on the reporter thread; takes effect on the next `start()`.
    pub fn on_position_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(PositionReport) + Send + Sync + 'static,
    {
        self.on_position = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn transport(&self) -> Transport {
        self.transport.clone()
    }

    /// Rate the output stream is (or will be) opened at.
    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }

    pub fn is_started(&self) -> bool {
        self.stream.is_some()
    }

    /// Decode a file and install it as `id`, replacing any previous track.
    pub fn load_track(&mut self, id: TrackId, path: impl AsRef<Path>) -> DecodeResult<()> {
        let path = path.as_ref();
        let buffer = decode_file(path)?;
        self.install(id, buffer, Some(path.to_path_buf()));
        Ok(())
    }

    /// Install an already decoded buffer as `id`.
    pub fn load_buffer(&mut self, id: TrackId, buffer: AudioBuffer) {
        self.install(id, buffer, None);
    }

    fn install(&mut self, id: TrackId, buffer: AudioBuffer, path: Option<PathBuf>) {
        let rate = buffer.sample_rate();
        log::info!(
            "Loaded track {id}: {} frames @ {rate}Hz ({:.2}s){}",
            buffer.num_frames(),
            buffer.duration(),
            path.as_ref()
                .map(|p| format!(" from {}", p.display()))
                .unwrap_or_default()
        );

        let pins_rate = self.transport.shared.lock().install(id, buffer, path);

        if pins_rate {
            if self.is_started() && rate != self.output_sample_rate {
                log::warn!(
                    "Output pinned to {rate}Hz; the running stream keeps {}Hz until restarted",
                    self.output_sample_rate
                );
            }
            self.output_sample_rate = rate;
        } else if rate != self.output_sample_rate {
            // No resampling: the track plays at the pinned output rate.
            log::warn!(
                "Track {id} is {rate}Hz but output is pinned to {}Hz",
                self.output_sample_rate
            );
        }
    }

    /// Open the output stream and start the position reporter. No-op if running.
    pub fn start(&mut self) -> DeviceResult<()> {
        if self.is_started() {
            return Ok(());
        }

        let spec = StreamSpec {
            sample_rate: self.output_sample_rate,
            block_size: self.config.block_size,
        };

        let shared = Arc::clone(&self.transport.shared);
        let stream = self
            .sink
            .open(spec, Box::new(move |output: &mut [f32]| mixer::render(&shared, output)))?;
        stream.play()?;

        let reporter = PositionReporter::spawn(
            Arc::clone(&self.transport.shared),
            self.config.report_interval(),
            self.on_position.clone(),
        )
        .map_err(DeviceError::Reporter)?;

        self.stream = Some(stream);
        self.reporter = Some(reporter);
        log::info!(
            "Player started at {}Hz, {} frame blocks",
            spec.sample_rate,
            spec.block_size
        );
        Ok(())
    }

    /// Stop the reporter, then pause and close the stream. No-op if stopped.
    pub fn stop(&mut self) {
        if let Some(mut reporter) = self.reporter.take() {
            reporter.stop();
        }
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("{e}");
            }
            drop(stream);
            log::info!("Player stopped");
        }
    }

    pub fn play_track(&self, id: TrackId) {
        self.transport.play_track(id);
    }

    pub fn stop_track(&self, id: TrackId) {
        self.transport.stop_track(id);
    }

    pub fn toggle_track(&self, id: TrackId) {
        self.transport.toggle_track(id);
    }

    pub fn play_all(&self) {
        self.transport.play_all();
    }

    pub fn stop_all(&self) {
        self.transport.stop_all();
    }

    pub fn toggle_all(&self) {
        self.transport.toggle_all();
    }

    pub fn set_loop(&self, enabled: bool) {
        self.transport.set_loop(enabled);
    }

    pub fn set_track_loop(&self, id: TrackId, enabled: bool) {
        self.transport.set_track_loop(id, enabled);
    }

    pub fn is_playing(&self, id: Option<TrackId>) -> bool {
        self.transport.is_playing(id)
    }

    pub fn get_track_info(&self, id: TrackId) -> Option<TrackInfo> {
        self.transport.get_track_info(id)
    }

    pub fn loop_enabled(&self) -> bool {
        self.transport.loop_enabled()
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.transport.track_ids()
    }

    pub fn snapshot(&self) -> PositionReport {
        self.transport.snapshot()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::RenderFn;
    use crate::error::DecodeError;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Sink that hands the render callback back to the test instead of a device.
    #[derive(Clone, Default)]
    struct FakeSink {
        render: Arc<Mutex<Option<RenderFn>>>,
        opened: Arc<Mutex<Vec<StreamSpec>>>,
        playing: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
        fail: bool,
    }

    struct FakeStream {
        playing: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
    }

    impl OutputStream for FakeStream {
        fn play(&self) -> DeviceResult<()> {
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn pause(&self) -> DeviceResult<()> {
            self.playing.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    impl AudioSink for FakeSink {
        fn open(&self, spec: StreamSpec, render: RenderFn) -> DeviceResult<Box<dyn OutputStream>> {
            if self.fail {
                return Err(DeviceError::NoDevice);
            }
            self.opened.lock().push(spec);
            *self.render.lock() = Some(render);
            self.closed.store(false, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                playing: Arc::clone(&self.playing),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    impl FakeSink {
        /// Run one device callback of `frames` stereo frames.
        fn pump(&self, frames: usize) -> Vec<f32> {
            let mut out = vec![0.0f32; frames * 2];
            let mut render = self.render.lock();
            let render = render.as_mut().expect("stream not opened");
            render(out.as_mut_slice());
            out
        }
    }

    fn stereo(frames: usize, rate: u32) -> AudioBuffer {
        AudioBuffer::new(vec![[0.25, -0.25]; frames], rate)
    }

    fn position(player: &Player, id: TrackId) -> usize {
        player.transport.shared.lock().track(id).unwrap().position()
    }

    #[test]
    fn play_one_block_then_stop() {
        let sink = FakeSink::default();
        let mut player = Player::new(PlayerConfig::default(), sink.clone());
        player.load_buffer(1, stereo(88200, 44100));

        player.play_track(1);
        let info = player.get_track_info(1).unwrap();
        assert!(info.playing);
        assert_relative_eq!(info.position_secs, 0.0);
        assert_relative_eq!(info.duration_secs, 2.0);

        player.start().unwrap();
        let out = sink.pump(512);
        assert_eq!(&out[..2], &[0.25f32, -0.25]);
        assert_eq!(position(&player, 1), 512);

        player.stop_track(1);
        assert!(!player.is_playing(Some(1)));
        assert_eq!(position(&player, 1), 0);
        assert!(!player.is_playing(None));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let sink = FakeSink::default();
        let mut player = Player::new(PlayerConfig::default(), sink.clone());

        player.stop();
        assert!(!player.is_started());

        player.start().unwrap();
        player.start().unwrap();
        assert!(player.is_started());
        assert_eq!(sink.opened.lock().len(), 1);
        assert!(sink.playing.load(Ordering::SeqCst));

        player.stop();
        player.stop();
        assert!(!player.is_started());
        assert!(!sink.playing.load(Ordering::SeqCst));
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn device_failure_leaves_player_stopped() {
        let sink = FakeSink {
            fail: true,
            ..FakeSink::default()
        };
        let mut player = Player::new(PlayerConfig::default(), sink);

        let err = player.start().unwrap_err();

        assert!(matches!(err, DeviceError::NoDevice));
        assert!(!player.is_started());
        assert!(player.reporter.is_none());
    }

    #[test]
    fn first_track_pins_output_rate() {
        let sink = FakeSink::default();
        let config = PlayerConfig::default().with_block_size(256);
        let mut player = Player::new(config, sink.clone());
        assert_eq!(player.output_sample_rate(), 44100);

        player.load_buffer(1, stereo(100, 22050));
        player.load_buffer(2, stereo(100, 48000));
        assert_eq!(player.output_sample_rate(), 22050);

        player.start().unwrap();
        assert_eq!(
            sink.opened.lock()[0],
            StreamSpec {
                sample_rate: 22050,
                block_size: 256
            }
        );
    }

    #[test]
    fn load_track_decodes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4800 {
            writer.write_sample(0.5f32).unwrap();
        }
        writer.finalize().unwrap();

        let mut player = Player::new(PlayerConfig::default(), FakeSink::default());
        player.load_track(2, &path).unwrap();

        let state = player.transport.shared.lock();
        let track = state.track(2).unwrap();
        assert_eq!(track.file_path(), Some(&path));
        assert_eq!(track.buffer().frames()[0], [0.5f32, 0.5]);
        assert_relative_eq!(track.info().duration_secs, 0.1);
        drop(state);
        assert_eq!(player.output_sample_rate(), 48000);
    }

    #[test]
    fn load_track_surfaces_decode_errors() {
        let mut player = Player::new(PlayerConfig::default(), FakeSink::default());

        let err = player.load_track(1, "/nonexistent/loop.wav").unwrap_err();

        assert!(matches!(err, DecodeError::Open(_)));
        assert!(player.track_ids().is_empty());
        assert!(player.get_track_info(1).is_none());
    }

    #[test]
    fn toggle_all_round_trip() {
        let sink = FakeSink::default();
        let mut player = Player::new(PlayerConfig::default(), sink.clone());
        player.load_buffer(1, stereo(1000, 44100));
        player.load_buffer(2, stereo(3000, 44100));
        player.start().unwrap();

        player.toggle_all();
        assert!(player.is_playing(Some(1)) && player.is_playing(Some(2)));
        sink.pump(600);

        player.toggle_all();
        for id in [1, 2] {
            assert!(!player.is_playing(Some(id)));
            assert_eq!(position(&player, id), 0);
        }
        assert!(!player.is_playing(None));
    }

    #[test]
    fn set_loop_is_retroactive() {
        let sink = FakeSink::default();
        let mut player = Player::new(PlayerConfig::default(), sink.clone());
        player.load_buffer(1, stereo(1000, 44100));
        player.start().unwrap();

        player.set_loop(false);
        assert!(!player.loop_enabled());
        player.play_track(1);
        sink.pump(600);
        sink.pump(600);

        assert!(!player.is_playing(Some(1)));
        assert!(!player.is_playing(None));
    }

    #[test]
    fn per_track_loop_override() {
        let sink = FakeSink::default();
        let mut player = Player::new(PlayerConfig::default().with_loop(false), sink.clone());
        player.load_buffer(1, stereo(1000, 44100));
        player.load_buffer(2, stereo(1000, 44100));
        player.set_track_loop(2, true);
        player.start().unwrap();

        player.play_all();
        sink.pump(600);
        sink.pump(600);

        assert!(!player.is_playing(Some(1)));
        assert!(player.is_playing(Some(2)));
        assert_eq!(position(&player, 2), 200);
        assert!(player.is_playing(None));
    }

    #[test]
    fn reporter_delivers_updates_and_stops_with_player() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = FakeSink::default();
        let config = PlayerConfig::default().with_report_interval(Duration::from_millis(5));
        let mut player = Player::new(config, sink).on_position_update(move |report| {
            let _ = tx.send(report);
        });
        player.load_buffer(3, stereo(44100, 44100));
        player.play_track(3);

        player.start().unwrap();
        let report = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(report[&3].playing);
        assert_relative_eq!(report[&3].duration_secs, 1.0);

        player.stop();
        while rx.try_recv().is_ok() {}
        std::thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn position_callback_can_query_transport() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let config = PlayerConfig::default().with_report_interval(Duration::from_millis(5));
        let player = Player::new(config, FakeSink::default());
        let transport = player.transport();
        let mut player = player.on_position_update(move |report| {
            // Locks the player mutex from inside the callback.
            let playing = transport.is_playing(Some(1));
            let _ = tx.send((report, playing));
        });
        player.load_buffer(1, stereo(44100, 44100));
        player.play_track(1);

        player.start().unwrap();
        let (report, playing) = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("callback ran while the player lock was held");
        assert!(playing);
        assert!(report[&1].playing);

        player.stop();
    }

    #[test]
    fn transport_handle_works_across_threads() {
        let mut player = Player::new(PlayerConfig::default(), FakeSink::default());
        player.load_buffer(1, stereo(100, 44100));
        player.load_buffer(2, stereo(100, 44100));

        let transport = player.transport();
        std::thread::spawn(move || transport.toggle_all())
            .join()
            .unwrap();

        assert!(player.is_playing(None));
        assert_eq!(player.track_ids(), vec![1, 2]);
        assert_eq!(player.snapshot().len(), 2);
    }

    #[test]
    fn dropping_player_closes_stream() {
        let sink = FakeSink::default();
        let mut player = Player::new(PlayerConfig::default(), sink.clone());
        player.start().unwrap();

        drop(player);

        assert!(sink.closed.load(Ordering::SeqCst));
    }
}
