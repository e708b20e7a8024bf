//! In-memory output device with a caller-driven playback clock.

use dasp_ring_buffer::Bounded;
use log::{debug, warn};

use crate::error::DeviceError;

use super::{s16le_samples, OutputDevice, OutputSpec, SampleFormat};

/// Output device that holds queued samples in a bounded ring buffer.
///
/// Nothing is played on its own: call [`QueueDevice::consume`] to advance
/// playback by a number of frames. The ring holds exactly `spec.frames`
/// frames, so an enqueue past capacity overwrites the oldest audio and is
/// counted as an overrun.
#[derive(Debug)]
pub struct QueueDevice {
    spec: OutputSpec,
    queue: Bounded<Vec<i16>>,
    paused: bool,
    closed: bool,
    enqueued_frames: u64,
    consumed_frames: u64,
    overruns: u64,
}

impl QueueDevice {
    /// Open an in-memory device. Starts paused, like a freshly opened
    /// hardware device.
    pub fn open(spec: OutputSpec) -> Result<Self, DeviceError> {
        if spec.format != SampleFormat::S16LE || spec.channels == 0 || spec.frames == 0 {
            return Err(DeviceError::UnsupportedSpec(format!("{:?}", spec)));
        }
        let capacity = spec.frames * spec.channels as usize;
        debug!("queue device opened: {:?}", spec);
        Ok(Self {
            spec,
            queue: Bounded::from(vec![0_i16; capacity]),
            paused: true,
            closed: false,
            enqueued_frames: 0,
            consumed_frames: 0,
            overruns: 0,
        })
    }

    /// Play up to `frames` queued frames and return their interleaved
    /// samples. A paused or closed device plays nothing.
    pub fn consume(&mut self, frames: usize) -> Vec<i16> {
        if self.paused || self.closed {
            return Vec::new();
        }
        let channels = self.spec.channels as usize;
        let take = frames.min(self.queued_frames()) * channels;
        let mut out = Vec::with_capacity(take);
        for _ in 0..take {
            if let Some(sample) = self.queue.pop() {
                out.push(sample);
            }
        }
        self.consumed_frames += (out.len() / channels) as u64;
        out
    }

    /// Play everything currently queued.
    pub fn drain(&mut self) -> Vec<i16> {
        self.consume(self.queued_frames())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn enqueued_frames(&self) -> u64 {
        self.enqueued_frames
    }

    pub fn consumed_frames(&self) -> u64 {
        self.consumed_frames
    }

    /// Number of samples lost because an enqueue exceeded capacity.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}

impl OutputDevice for QueueDevice {
    fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    fn queued_frames(&self) -> usize {
        self.queue.len() / self.spec.channels as usize
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        let mut pushed = 0_usize;
        let mut overwritten = 0_u64;
        for sample in s16le_samples(bytes) {
            if self.queue.push(sample).is_some() {
                overwritten += 1;
            }
            pushed += 1;
        }
        if overwritten > 0 {
            warn!("queue device overrun: {} sample(s) overwritten", overwritten);
            self.overruns += overwritten;
        }
        self.enqueued_frames += (pushed / self.spec.channels as usize) as u64;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        if !self.closed {
            self.paused = false;
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.paused = true;
        self.closed = true;
        debug!(
            "queue device closed: enqueued={} consumed={} overruns={}",
            self.enqueued_frames, self.consumed_frames, self.overruns
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn small_spec() -> OutputSpec {
        OutputSpec {
            frames: 4,
            ..OutputSpec::default()
        }
    }

    #[test]
    fn consume_plays_in_order() {
        let mut device = QueueDevice::open(small_spec()).unwrap();
        device.resume();
        device.enqueue(&bytes(&[1, 2, 3, 4, 5, 6])).unwrap();
        assert_eq!(device.queued_frames(), 3);
        assert_eq!(device.consume(2), vec![1, 2, 3, 4]);
        assert_eq!(device.queued_frames(), 1);
        assert_eq!(device.drain(), vec![5, 6]);
        assert_eq!(device.consumed_frames(), 3);
    }

    #[test]
    fn paused_devices_hold_their_backlog() {
        let mut device = QueueDevice::open(small_spec()).unwrap();
        device.enqueue(&bytes(&[1, 1])).unwrap();
        assert!(device.consume(1).is_empty());
        assert_eq!(device.queued_frames(), 1);
    }

    #[test]
    fn overfilling_counts_overruns() {
        let mut device = QueueDevice::open(small_spec()).unwrap();
        device.enqueue(&bytes(&[0; 10])).unwrap();
        assert_eq!(device.queued_frames(), 4);
        assert_eq!(device.overruns(), 2);
    }

    #[test]
    fn closed_devices_reject_audio() {
        let mut device = QueueDevice::open(small_spec()).unwrap();
        device.close();
        device.resume();
        assert!(device.is_paused());
        assert!(matches!(device.enqueue(&bytes(&[0, 0])), Err(DeviceError::Closed)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let spec = OutputSpec {
            frames: 0,
            ..OutputSpec::default()
        };
        assert!(QueueDevice::open(spec).is_err());
    }
}
