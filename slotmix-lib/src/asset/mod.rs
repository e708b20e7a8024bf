//! Immutable decoded sound data shared by any number of channels.
//!
//! Every asset is stored as interleaved stereo `f32` frames regardless of the
//! source layout: mono sources are duplicated into both sides at load time.

mod convert;
mod decode;

use std::path::Path;
use std::sync::{Arc, RwLock};

use log::{debug, info};

use crate::error::AssetLoadError;

pub use convert::{
    convert_signed_16bit_to_f32, convert_signed_24bit_to_f32, convert_signed_32bit_to_f32,
    convert_signed_8bit_to_f32, convert_unsigned_16bit_to_f32, convert_unsigned_24bit_to_f32,
    convert_unsigned_32bit_to_f32, convert_unsigned_8bit_to_f32,
};
pub use decode::{DecodedPcm, PcmDecoder, SymphoniaDecoder};

/// Number of interleaved components in one stored frame.
pub const ASSET_CHANNELS: usize = 2;

const MAX_NAME_LEN: usize = 255;

/// Layout of the file an asset was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Decoded stereo sample data for one sound.
#[derive(Debug)]
pub struct AudioAsset {
    name: String,
    source: SourceSpec,
    length: usize,
    samples: RwLock<Option<Arc<[f32]>>>,
}

impl AudioAsset {
    /// Decode `path` completely into memory with the default decoder.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetLoadError> {
        Self::load_with(&SymphoniaDecoder, path)
    }

    /// Decode `path` completely into memory with a caller-supplied decoder.
    pub fn load_with<D>(decoder: &D, path: impl AsRef<Path>) -> Result<Self, AssetLoadError>
    where
        D: PcmDecoder + ?Sized,
    {
        let path = path.as_ref();
        let pcm = decoder.decode(path)?;
        let asset = Self::from_pcm(path.to_string_lossy(), pcm)?;
        info!("audio loaded: {}", asset.name);
        Ok(asset)
    }

    /// Build an asset from decoded PCM, normalising it to stereo.
    ///
    /// # Errors
    /// `UnsupportedChannels` for anything but mono or stereo input, `Empty`
    /// when no complete frame was decoded.
    pub fn from_pcm(name: impl AsRef<str>, pcm: DecodedPcm) -> Result<Self, AssetLoadError> {
        let name: String = name.as_ref().chars().take(MAX_NAME_LEN).collect();
        let channels = pcm.channels as usize;
        if channels != 1 && channels != 2 {
            return Err(AssetLoadError::UnsupportedChannels(pcm.channels));
        }

        let length = pcm.frames.min(pcm.samples.len() / channels);
        if length == 0 {
            return Err(AssetLoadError::Empty(name));
        }

        let mut samples = Vec::with_capacity(length * ASSET_CHANNELS);
        for frame in pcm.samples.chunks_exact(channels).take(length) {
            let left = frame[0];
            let right = if channels == 1 { frame[0] } else { frame[1] };
            samples.push(left);
            samples.push(right);
        }

        let source = SourceSpec {
            sample_rate: pcm.sample_rate,
            channels: pcm.channels,
        };
        debug!(
            "audio spec for {}: rate={} channels={} frames={}",
            name, source.sample_rate, source.channels, length
        );

        Ok(Self {
            name,
            source,
            length,
            samples: RwLock::new(Some(samples.into())),
        })
    }

    /// Build an asset from interleaved signed 16-bit PCM.
    ///
    /// Each component is divided by `i16::MAX`.
    pub fn from_pcm_i16(
        name: impl AsRef<str>,
        sample_rate: u32,
        channels: u16,
        samples: &[i16],
    ) -> Result<Self, AssetLoadError> {
        let samples = samples
            .iter()
            .copied()
            .map(convert_signed_16bit_to_f32)
            .collect();
        Self::from_pcm(name, DecodedPcm::new(sample_rate, channels, samples))
    }

    /// Build an asset from interleaved normalised `f32` PCM.
    pub fn from_pcm_f32(
        name: impl AsRef<str>,
        sample_rate: u32,
        channels: u16,
        samples: &[f32],
    ) -> Result<Self, AssetLoadError> {
        Self::from_pcm(
            name,
            DecodedPcm::new(sample_rate, channels, samples.to_vec()),
        )
    }

    /// Diagnostic identifier, normally the source path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stereo frames.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Layout of the decoded source file.
    pub fn source(&self) -> SourceSpec {
        self.source
    }

    /// Playback length in seconds at the source sample rate.
    pub fn duration_seconds(&self) -> f64 {
        if self.source.sample_rate == 0 {
            return 0.0;
        }
        self.length as f64 / self.source.sample_rate as f64
    }

    /// Whether the sample buffer is still held.
    pub fn is_loaded(&self) -> bool {
        self.samples.read().unwrap().is_some()
    }

    /// Read one stereo frame, or `None` past the end or after unload.
    pub fn frame(&self, index: usize) -> Option<(f32, f32)> {
        let samples = self.samples.read().unwrap();
        let samples = samples.as_ref()?;
        let offset = index.checked_mul(ASSET_CHANNELS)?;
        Some((*samples.get(offset)?, *samples.get(offset + 1)?))
    }

    /// Snapshot of the sample buffer for one mix pass.
    pub(crate) fn samples(&self) -> Option<Arc<[f32]>> {
        self.samples.read().unwrap().clone()
    }

    /// Release the sample buffer.
    ///
    /// Safe to call any number of times. Returns `true` only for the call
    /// that actually released the buffer. Channels still bound to this asset
    /// go silent and finish on their next mix pass.
    pub fn unload(&self) -> bool {
        let released = self.samples.write().unwrap().take();
        if released.is_some() {
            info!("audio unloaded: {}", self.name);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FixedDecoder {
        pcm: DecodedPcm,
        calls: Cell<usize>,
    }

    impl PcmDecoder for FixedDecoder {
        fn decode(&self, _path: &Path) -> Result<DecodedPcm, AssetLoadError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.pcm.clone())
        }
    }

    #[test]
    fn mono_is_duplicated_into_both_sides() {
        let source = [0_i16, 1000, -1000, i16::MAX];
        let asset = AudioAsset::from_pcm_i16("mono", 44_100, 1, &source).unwrap();
        assert_eq!(asset.length(), source.len());
        for (index, sample) in source.iter().enumerate() {
            let expected = *sample as f32 / i16::MAX as f32;
            assert_eq!(asset.frame(index), Some((expected, expected)));
        }
    }

    #[test]
    fn stereo_scales_by_max_amplitude() {
        let source = [i16::MAX, -i16::MAX, 16_384, -8_192];
        let asset = AudioAsset::from_pcm_i16("stereo", 44_100, 2, &source).unwrap();
        assert_eq!(asset.length(), 2);
        assert_eq!(asset.frame(0), Some((1.0, -1.0)));
        let (left, right) = asset.frame(1).unwrap();
        assert!((left - 16_384.0 / 32_767.0).abs() < 1e-7);
        assert!((right + 8_192.0 / 32_767.0).abs() < 1e-7);
    }

    #[test]
    fn rejects_surround_layouts() {
        let err = AudioAsset::from_pcm_i16("surround", 48_000, 6, &[0; 12]).unwrap_err();
        assert!(matches!(err, AssetLoadError::UnsupportedChannels(6)));
    }

    #[test]
    fn rejects_empty_sources() {
        let err = AudioAsset::from_pcm_i16("empty", 44_100, 2, &[]).unwrap_err();
        assert!(matches!(err, AssetLoadError::Empty(_)));
    }

    #[test]
    fn float_sources_are_stored_as_given() {
        let asset = AudioAsset::from_pcm_f32("float", 48_000, 2, &[0.25, -0.5]).unwrap();
        assert_eq!(asset.frame(0), Some((0.25, -0.5)));
        assert_eq!(asset.source().sample_rate, 48_000);
    }

    #[test]
    fn partial_trailing_frames_are_dropped() {
        let asset = AudioAsset::from_pcm_i16("odd", 44_100, 2, &[1, 2, 3]).unwrap();
        assert_eq!(asset.length(), 1);
        assert_eq!(asset.frame(1), None);
    }

    #[test]
    fn long_names_are_truncated() {
        let name = "x".repeat(400);
        let asset = AudioAsset::from_pcm_i16(&name, 44_100, 1, &[0]).unwrap();
        assert_eq!(asset.name().len(), 255);
    }

    #[test]
    fn unload_is_idempotent() {
        let asset = AudioAsset::from_pcm_i16("beep", 44_100, 1, &[1, 2, 3]).unwrap();
        assert!(asset.is_loaded());
        assert!(asset.unload());
        assert!(!asset.is_loaded());
        assert!(!asset.unload());
        assert_eq!(asset.frame(0), None);
        assert_eq!(asset.length(), 3);
    }

    #[test]
    fn load_with_uses_the_supplied_decoder() {
        let decoder = FixedDecoder {
            pcm: DecodedPcm::new(22_050, 1, vec![0.5; 22_050]),
            calls: Cell::new(0),
        };
        let asset = AudioAsset::load_with(&decoder, "sounds/blip.ogg").unwrap();
        assert_eq!(decoder.calls.get(), 1);
        assert_eq!(asset.name(), "sounds/blip.ogg");
        assert_eq!(asset.source().sample_rate, 22_050);
        assert!((asset.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_files_fail_with_io() {
        let err = AudioAsset::load("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, AssetLoadError::Io(_)));
    }
}
