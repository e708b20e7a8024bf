//! The per-tick mix pass.

use std::sync::{Arc, MutexGuard};

use crate::asset::ASSET_CHANNELS;
use crate::channel::AudioChannel;

/// Bytes written per output frame: interleaved stereo `i16`.
pub const OUTPUT_FRAME_BYTES: usize = 4;

/// Frames to produce so the device queue is topped up to `capacity`.
///
/// Never negative and never more than `capacity`, whatever the backlog.
pub fn frames_to_produce(capacity: usize, backlog: usize) -> usize {
    capacity.saturating_sub(backlog)
}

/// Saturating nonlinearity applied when several channels overlap.
pub fn soft_clip(value: f32) -> f32 {
    value.tanh()
}

/// Scale a normalised sample to the signed 16-bit output range.
///
/// Values outside [-1, 1] saturate at the integer bounds.
pub fn to_output_sample(value: f32) -> i16 {
    (value * i16::MAX as f32) as i16
}

/// A locked slot occupant plus the sample snapshot it reads from.
pub(crate) struct Voice<'a> {
    pub(crate) channel: MutexGuard<'a, AudioChannel>,
    pub(crate) samples: Option<Arc<[f32]>>,
}

impl<'a> Voice<'a> {
    pub(crate) fn new(channel: MutexGuard<'a, AudioChannel>) -> Self {
        let samples = channel.asset().samples();
        Self { channel, samples }
    }

    /// Read the frame under the cursor and advance, or finish the channel
    /// when there is nothing left to read.
    fn next_frame(&mut self) -> Option<(f32, f32)> {
        let channel = &mut *self.channel;
        if !channel.enabled {
            return None;
        }
        let offset = channel.position * ASSET_CHANNELS;
        let frame = self
            .samples
            .as_deref()
            .and_then(|samples| samples.get(offset..offset + ASSET_CHANNELS));
        let Some(frame) = frame else {
            channel.enabled = false;
            return None;
        };
        let frame = (frame[0], frame[1]);
        channel.position += 1;
        channel.enabled = channel.position < channel.asset().length();
        Some(frame)
    }
}

/// Mix `out.len() / OUTPUT_FRAME_BYTES` frames from `voices` into `out` as
/// interleaved little-endian `i16`.
///
/// A single contributing channel is written unclipped; two or more are
/// summed and passed through [`soft_clip`] per side.
///
/// Returns the highest number of channels that contributed to one frame.
pub(crate) fn mix_frames(voices: &mut [Option<Voice<'_>>], out: &mut [u8]) -> usize {
    let mut peak_active = 0;
    for frame in out.chunks_exact_mut(OUTPUT_FRAME_BYTES) {
        let mut left = 0.0_f32;
        let mut right = 0.0_f32;
        let mut active = 0_usize;

        for voice in voices.iter_mut().flatten() {
            if let Some((l, r)) = voice.next_frame() {
                left += l;
                right += r;
                active += 1;
            }
        }

        if active > 1 {
            left = soft_clip(left);
            right = soft_clip(right);
        }
        peak_active = peak_active.max(active);

        frame[..2].copy_from_slice(&to_output_sample(left).to_le_bytes());
        frame[2..].copy_from_slice(&to_output_sample(right).to_le_bytes());
    }
    peak_active
}
