use parking_lot::Mutex;

use super::store::{PlayerState, TrackState};
use super::types::CHANNELS;

/// Fill `output` (interleaved stereo) with the sum of all playing tracks.
///
/// Called on the audio thread: no allocation, and the lock is released before clamping.
pub fn render(shared: &Mutex<PlayerState>, output: &mut [f32]) {
    output.fill(0.0);

    {
        let mut state = shared.lock();
        mix_tracks(&mut state, output);
    }

    for sample in output.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }
}

/// Add each playing track's next window into `output` and advance cursors.
///
/// A trailing partial frame in `output` is left untouched.
pub fn mix_tracks(state: &mut PlayerState, output: &mut [f32]) {
    let frames = output.len() / CHANNELS;
    if frames == 0 {
        return;
    }
    let output = &mut output[..frames * CHANNELS];

    let mut finished = false;
    for track in state.tracks.values_mut().filter(|t| t.playing) {
        if !mix_track(track, output, frames) {
            finished = true;
        }
    }

    if finished {
        state.refresh_master();
    }
}

/// Returns false if the track stopped during this block.
fn mix_track(track: &mut TrackState, output: &mut [f32], frames: usize) -> bool {
    let total = track.buffer.num_frames();
    if total == 0 {
        track.halt();
        return false;
    }

    let data = track.buffer.frames();
    let start = track.position.min(total - 1);
    let end = start + frames;

    if end < total {
        add_frames(&data[start..end], output);
        track.position = end;
        true
    } else if track.looping {
        // Cycle through the buffer; repeats when it is shorter than the block.
        let mut written = 0;
        let mut pos = start;
        while written < frames {
            let n = (total - pos).min(frames - written);
            add_frames(
                &data[pos..pos + n],
                &mut output[written * CHANNELS..(written + n) * CHANNELS],
            );
            written += n;
            pos = (pos + n) % total;
        }
        track.position = pos;
        true
    } else {
        // Remainder of the block stays silent.
        add_frames(&data[start..], output);
        track.halt();
        false
    }
}

fn add_frames(src: &[[f32; CHANNELS]], dst: &mut [f32]) {
    for (frame, out) in src.iter().zip(dst.chunks_exact_mut(CHANNELS)) {
        out[0] += frame[0];
        out[1] += frame[1];
    }
}
