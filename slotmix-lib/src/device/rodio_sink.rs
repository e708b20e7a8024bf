//! Output device backed by the default `rodio` output stream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use rodio::source::{SeekError, Source};
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::error::DeviceError;
use crate::settings::EngineSettings;

use super::{s16le_samples, OutputDevice, OutputSpec, SampleFormat};

/// Real audio output.
///
/// Each enqueue becomes one chunk on a `rodio::Sink`. The backlog is tracked
/// with a shared frame counter that every chunk decrements as the device
/// thread pulls samples from it.
pub struct RodioDevice {
    spec: OutputSpec,
    // Dropping the stream stops playback; keep it alive with the sink.
    _stream: OutputStream,
    sink: Sink,
    queued: Arc<AtomicUsize>,
    closed: bool,
}

impl RodioDevice {
    /// Open the default output stream.
    ///
    /// # Errors
    /// `UnsupportedSpec` when `spec` is not interleaved stereo S16LE,
    /// `Unavailable` when no stream opens within `settings.open_retries`.
    pub fn open(spec: OutputSpec, settings: &EngineSettings) -> Result<Self, DeviceError> {
        if spec.format != SampleFormat::S16LE || spec.channels != 2 || spec.frames == 0 {
            return Err(DeviceError::UnsupportedSpec(format!("{:?}", spec)));
        }

        let retries = settings.open_retries.max(1);
        let mut attempt = 1;
        let stream = loop {
            match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => break stream,
                Err(err) => {
                    if attempt >= retries {
                        error!(
                            "failed to open default output stream after {} attempts: {}",
                            retries, err
                        );
                        return Err(DeviceError::Unavailable(err.to_string()));
                    }
                    warn!(
                        "open_default_stream attempt {}/{} failed: {}",
                        attempt, retries, err
                    );
                    thread::sleep(Duration::from_millis(settings.open_retry_ms));
                    attempt += 1;
                }
            }
        };

        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        sink.set_volume(settings.output_volume());
        info!(
            "output device opened: rate={} channels={} frames={} gain={}dB",
            spec.sample_rate, spec.channels, spec.frames, settings.output_gain_db
        );

        Ok(Self {
            spec,
            _stream: stream,
            sink,
            queued: Arc::new(AtomicUsize::new(0)),
            closed: false,
        })
    }
}

impl OutputDevice for RodioDevice {
    fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    fn queued_frames(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        let samples: Vec<f32> = s16le_samples(bytes)
            .map(|sample| sample as f32 / i16::MAX as f32)
            .collect();
        let frames = samples.len() / self.spec.channels as usize;
        if frames == 0 {
            return Ok(());
        }
        self.queued.fetch_add(frames, Ordering::AcqRel);
        self.sink.append(QueuedChunk::new(
            self.spec.channels,
            self.spec.sample_rate,
            samples,
            self.queued.clone(),
        ));
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        if !self.closed {
            self.sink.play();
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.sink.pause();
        self.sink.clear();
        self.queued.store(0, Ordering::Release);
        self.closed = true;
        debug!("output device closed");
    }
}

/// One enqueued block of interleaved samples.
///
/// Decrements the shared backlog by one for every complete frame played and
/// returns the remainder if it is dropped unplayed.
#[derive(Debug)]
struct QueuedChunk {
    channels: u16,
    sample_rate: u32,
    samples: Vec<f32>,
    cursor: usize,
    queued: Arc<AtomicUsize>,
}

impl QueuedChunk {
    fn new(channels: u16, sample_rate: u32, samples: Vec<f32>, queued: Arc<AtomicUsize>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
            cursor: 0,
            queued,
        }
    }

    fn remaining_frames(&self) -> usize {
        let channels = self.channels as usize;
        let total = self.samples.len() / channels;
        total - self.cursor / channels
    }

    fn release(&self, frames: usize) {
        if frames == 0 {
            return;
        }
        let _ = self
            .queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |queued| {
                Some(queued.saturating_sub(frames))
            });
    }
}

impl Iterator for QueuedChunk {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = *self.samples.get(self.cursor)?;
        self.cursor += 1;
        if self.cursor % self.channels as usize == 0 {
            self.release(1);
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.samples.len() - self.cursor;
        (len, Some(len))
    }
}

impl Source for QueuedChunk {
    fn current_span_len(&self) -> Option<usize> {
        Some(self.samples.len() - self.cursor)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let frames = self.samples.len() / self.channels as usize;
        Some(Duration::from_secs_f64(
            frames as f64 / self.sample_rate as f64,
        ))
    }

    fn try_seek(&mut self, _pos: Duration) -> Result<(), SeekError> {
        Err(SeekError::NotSupported {
            underlying_source: "QueuedChunk",
        })
    }
}

impl Drop for QueuedChunk {
    fn drop(&mut self) {
        self.release(self.remaining_frames());
    }
}
