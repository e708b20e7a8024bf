//! The slot bank and the per-tick mix driver.
//!
//! A [`MixEngine`] owns eight channel slots and an output device. Each host
//! tick calls [`MixEngine::update_slots`] with the channels that should be
//! considered for playback; the engine re-admits them, mixes exactly the
//! frames the device is missing and enqueues the result.

mod mix;

use std::sync::Arc;
#[cfg(feature = "debug")]
use std::time::Instant;

use log::{debug, info, warn};

use crate::channel::SharedChannel;
use crate::device::{OutputDevice, OutputSpec, RodioDevice, SampleFormat};
use crate::error::DeviceError;
use crate::settings::EngineSettings;

use self::mix::{mix_frames, Voice};

pub use self::mix::{frames_to_produce, soft_clip, to_output_sample, OUTPUT_FRAME_BYTES};

/// Number of channel slots. Channels listed past this bound are ignored.
pub const CHANNEL_MAX: usize = 8;

/// What one mix pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixReport {
    /// Unplayed frames the device reported before mixing.
    pub backlog_frames: usize,
    /// Frames mixed and enqueued by this pass.
    pub frames_produced: usize,
    /// Highest number of channels that contributed to a single frame.
    pub active_channels: usize,
}

/// Fixed bank of channel slots feeding one output device.
///
/// Not safe to drive from more than one thread; the `&mut self` receivers
/// enforce that. Channels and assets are only referenced, never freed here.
pub struct MixEngine<D: OutputDevice> {
    device: D,
    spec: OutputSpec,
    slots: [Option<SharedChannel>; CHANNEL_MAX],
    scratch: Vec<u8>,
    closed: bool,
}

impl MixEngine<RodioDevice> {
    /// Open the default audio output with the default [`OutputSpec`].
    ///
    /// # Errors
    /// `DeviceError::Unavailable` when the device cannot be opened. This is
    /// fatal: no fallback device is tried.
    pub fn open(settings: &EngineSettings) -> Result<Self, DeviceError> {
        let device = RodioDevice::open(OutputSpec::default(), settings)?;
        Self::new(device)
    }
}

impl<D: OutputDevice> MixEngine<D> {
    /// Take ownership of an opened device, un-pause it and allocate the
    /// scratch buffer for one full pass.
    pub fn new(mut device: D) -> Result<Self, DeviceError> {
        let spec = *device.spec();
        if spec.format != SampleFormat::S16LE || spec.channels != 2 || spec.frames == 0 {
            return Err(DeviceError::UnsupportedSpec(format!("{:?}", spec)));
        }
        device.resume();
        info!(
            "mix engine started: {} slots, {} frames per pass at {} Hz",
            CHANNEL_MAX, spec.frames, spec.sample_rate
        );
        Ok(Self {
            device,
            spec,
            slots: Default::default(),
            scratch: vec![0; spec.buffer_bytes()],
            closed: false,
        })
    }

    /// Install this tick's ordered channel list and run one mix pass.
    ///
    /// For slot `i`:
    /// - `Some(channel)` at `channels[i]` installs the channel and copies its
    ///   requested flag into its enabled flag;
    /// - `None` at `channels[i]` leaves the current occupant in place;
    /// - no entry at `i` clears the slot.
    ///
    /// Entries past [`CHANNEL_MAX`] are ignored. A channel ends up in one slot
    /// only: an explicit entry displaces a copy kept by a `None` gap, and
    /// among explicit entries the first one wins. Every channel that ends up
    /// in a slot through an explicit entry is admitted.
    pub fn update_slots(
        &mut self,
        channels: &[Option<SharedChannel>],
    ) -> Result<MixReport, DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        if channels.len() > CHANNEL_MAX {
            debug!(
                "update_slots: {} channel(s) listed, ignoring {} past slot {}",
                channels.len(),
                channels.len() - CHANNEL_MAX,
                CHANNEL_MAX
            );
        }

        let mut listed = [false; CHANNEL_MAX];
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match channels.get(index) {
                Some(Some(channel)) => {
                    *slot = Some(channel.clone());
                    listed[index] = true;
                }
                Some(None) => {}
                None => *slot = None,
            }
        }

        // A channel occupies one slot: listed entries win over kept ones,
        // then the lowest index wins.
        let rank = |index: usize| (!listed[index], index);
        for index in 0..CHANNEL_MAX {
            let Some(channel) = &self.slots[index] else {
                continue;
            };
            let outranked = self.slots.iter().enumerate().any(|(other, occupant)| {
                other != index
                    && rank(other) < rank(index)
                    && occupant
                        .as_ref()
                        .is_some_and(|occupant| Arc::ptr_eq(occupant, channel))
            });
            if outranked {
                warn!(
                    "channel {} occupies another slot; leaving slot {} empty",
                    channel.lock().unwrap().id(),
                    index
                );
                self.slots[index] = None;
            }
        }

        for (index, slot) in self.slots.iter().enumerate() {
            if let (true, Some(channel)) = (listed[index], slot) {
                channel.lock().unwrap().admit();
            }
        }

        self.mix()
    }

    /// Top the device queue back up from the current slots.
    ///
    /// Produces `spec.frames - backlog` frames; when the device is already
    /// full this enqueues nothing. Hosts reach it through
    /// [`MixEngine::update_slots`].
    pub(crate) fn mix(&mut self) -> Result<MixReport, DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        #[cfg(feature = "debug")]
        let started = Instant::now();

        let Self {
            device,
            spec,
            slots,
            scratch,
            ..
        } = self;
        let slots: &[Option<SharedChannel>; CHANNEL_MAX] = slots;

        let backlog_frames = device.queued_frames();
        let frames = frames_to_produce(spec.frames, backlog_frames);
        let out = &mut scratch[..frames * OUTPUT_FRAME_BYTES];
        out.fill(0);

        let mut voices: [Option<Voice<'_>>; CHANNEL_MAX] = std::array::from_fn(|index| {
            let voice = Voice::new(slots[index].as_ref()?.lock().unwrap());
            if voice.samples.is_none() && voice.channel.enabled {
                warn!(
                    "channel {} plays unloaded asset {}; finishing it",
                    voice.channel.id(),
                    voice.channel.asset().name()
                );
            }
            Some(voice)
        });
        let active_channels = mix_frames(&mut voices, out);
        drop(voices);

        if frames > 0 {
            device.enqueue(out)?;
        }

        #[cfg(feature = "debug")]
        info!(
            "mix pass: backlog={} produced={} active={} took={:.3}ms",
            backlog_frames,
            frames,
            active_channels,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(MixReport {
            backlog_frames,
            frames_produced: frames,
            active_channels,
        })
    }

    /// Occupant of slot `index`, if any.
    pub fn slot(&self, index: usize) -> Option<&SharedChannel> {
        self.slots.get(index)?.as_ref()
    }

    pub fn occupied_slots(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn is_stopped(&self) -> bool {
        self.closed
    }

    /// Pause and close the device and release the scratch buffer.
    ///
    /// Slot references are dropped; the channels themselves are untouched.
    /// Calling this more than once has no further effect.
    pub fn stop(&mut self) {
        if self.closed {
            return;
        }
        self.device.pause();
        self.device.close();
        self.scratch = Vec::new();
        self.slots = Default::default();
        self.closed = true;
        info!("mix engine stopped");
    }

    /// Stop the engine and drop it.
    pub fn shutdown(mut self) {
        self.stop();
    }
}

impl<D: OutputDevice> Drop for MixEngine<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
