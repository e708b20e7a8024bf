//! Sample format conversion helpers for asset decoding.
//!
//! Integer samples are divided by the largest positive value of their format,
//! so `i16::MAX` maps to exactly `1.0`.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::sample::Sample;

const I24_MAX: i32 = (1 << 23) - 1;

/// Convert a signed 8-bit sample to `f32`.
pub fn convert_signed_8bit_to_f32(sample: i8) -> f32 {
    sample as f32 / i8::MAX as f32
}

/// Convert an unsigned 8-bit sample to `f32`.
pub fn convert_unsigned_8bit_to_f32(sample: u8) -> f32 {
    let shifted_sample = sample as i16 - 128;
    shifted_sample as f32 / i8::MAX as f32
}

/// Convert a signed 16-bit sample to `f32`.
pub fn convert_signed_16bit_to_f32(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

/// Convert an unsigned 16-bit sample to `f32`.
pub fn convert_unsigned_16bit_to_f32(sample: u16) -> f32 {
    let shifted_sample = sample as i32 - 32_768;
    shifted_sample as f32 / i16::MAX as f32
}

/// Convert a signed 24-bit sample stored in an `i32` to `f32`.
pub fn convert_signed_24bit_to_f32(sample: i32) -> f32 {
    // The 24-bit sample lives in the least significant bits.
    let shifted_sample = sample << 8 >> 8;
    shifted_sample as f32 / I24_MAX as f32
}

/// Convert an unsigned 24-bit sample stored in a `u32` to `f32`.
pub fn convert_unsigned_24bit_to_f32(sample: u32) -> f32 {
    let shifted_sample = (sample & 0x00ff_ffff) as i32 - (1 << 23);
    shifted_sample as f32 / I24_MAX as f32
}

/// Convert a signed 32-bit sample to `f32`.
pub fn convert_signed_32bit_to_f32(sample: i32) -> f32 {
    (sample as f64 / i32::MAX as f64) as f32
}

/// Convert an unsigned 32-bit sample to `f32`.
pub fn convert_unsigned_32bit_to_f32(sample: u32) -> f32 {
    let shifted_sample = sample as i64 - (1_i64 << 31);
    (shifted_sample as f64 / i32::MAX as f64) as f32
}

fn push_interleaved<S, F>(buf: &AudioBuffer<S>, convert: F, out: &mut Vec<f32>)
where
    S: Sample,
    F: Fn(S) -> f32,
{
    let channels = buf.spec().channels.count();
    out.reserve(buf.frames() * channels);
    for frame in 0..buf.frames() {
        for channel in 0..channels {
            out.push(convert(buf.chan(channel)[frame]));
        }
    }
}

/// Append every frame of a decoded packet to `out` as interleaved `f32`.
pub fn append_interleaved(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => push_interleaved(&*buf, convert_unsigned_8bit_to_f32, out),
        AudioBufferRef::S8(buf) => push_interleaved(&*buf, convert_signed_8bit_to_f32, out),
        AudioBufferRef::U16(buf) => push_interleaved(&*buf, convert_unsigned_16bit_to_f32, out),
        AudioBufferRef::S16(buf) => push_interleaved(&*buf, convert_signed_16bit_to_f32, out),
        AudioBufferRef::U24(buf) => {
            push_interleaved(&*buf, |s| convert_unsigned_24bit_to_f32(s.0), out)
        }
        AudioBufferRef::S24(buf) => {
            push_interleaved(&*buf, |s| convert_signed_24bit_to_f32(s.0), out)
        }
        AudioBufferRef::U32(buf) => push_interleaved(&*buf, convert_unsigned_32bit_to_f32, out),
        AudioBufferRef::S32(buf) => push_interleaved(&*buf, convert_signed_32bit_to_f32, out),
        AudioBufferRef::F32(buf) => push_interleaved(&*buf, |s| s, out),
        AudioBufferRef::F64(buf) => push_interleaved(&*buf, |s| s as f32, out),
    }
}
