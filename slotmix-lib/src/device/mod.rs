//! Output device sinks the engine queues mixed audio into.

mod queue;
mod rodio_sink;

use crate::error::DeviceError;

pub use self::queue::QueueDevice;
pub use self::rodio_sink::RodioDevice;

/// Default device sample rate (Hz).
pub const SAMPLE_RATE: u32 = 44_100;

/// Default number of frames produced per mix pass and held by the device.
pub const FRAMES_PER_BUFFER: usize = 2048;

/// Sample encoding of the bytes handed to [`OutputDevice::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian, interleaved.
    S16LE,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16LE => 2,
        }
    }
}

/// Format and capacity of an output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Total frame capacity; also the size of one mix pass.
    pub frames: usize,
    pub format: SampleFormat,
}

impl OutputSpec {
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.format.bytes_per_sample()
    }

    pub fn buffer_bytes(&self) -> usize {
        self.frames * self.bytes_per_frame()
    }
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 2,
            frames: FRAMES_PER_BUFFER,
            format: SampleFormat::S16LE,
        }
    }
}

/// A queue-style audio sink.
///
/// Playback itself happens elsewhere (typically on a device thread); the
/// engine only asks how much queued audio is still unplayed and appends more.
pub trait OutputDevice {
    fn spec(&self) -> &OutputSpec;
    /// Frames enqueued but not yet consumed by playback.
    fn queued_frames(&self) -> usize;
    /// Append interleaved bytes in the device's [`SampleFormat`].
    fn enqueue(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn close(&mut self);
}

impl<D: OutputDevice + ?Sized> OutputDevice for Box<D> {
    fn spec(&self) -> &OutputSpec {
        (**self).spec()
    }

    fn queued_frames(&self) -> usize {
        (**self).queued_frames()
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        (**self).enqueue(bytes)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Decode interleaved signed 16-bit little-endian bytes.
pub(crate) fn s16le_samples(bytes: &[u8]) -> impl Iterator<Item = i16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}
