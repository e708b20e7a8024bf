//! Decoding of sound files into raw interleaved PCM.

use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AssetLoadError;

use super::convert::append_interleaved;

/// Fully decoded PCM for one source file.
///
/// `samples` is interleaved by `channels` and already normalised to floats.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub samples: Vec<f32>,
}

impl DecodedPcm {
    /// Build decoded PCM from interleaved samples, deriving the frame count.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        let frames = if channels == 0 {
            0
        } else {
            samples.len() / channels as usize
        };
        Self {
            sample_rate,
            channels,
            frames,
            samples,
        }
    }
}

/// A source of fully decoded PCM.
///
/// Assets are always materialised completely; there is no streaming variant.
pub trait PcmDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedPcm, AssetLoadError>;
}

/// Default decoder backed by Symphonia's probe and codec registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl PcmDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedPcm, AssetLoadError> {
        let src = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AssetLoadError::Decode("no supported audio tracks".to_string()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(Error::ResetRequired) => {
                    return Err(AssetLoadError::Decode(
                        "decoder reset required mid-stream".to_string(),
                    ));
                }
                Err(err) => return Err(err.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(spec.channels.count() as u16);
                    append_interleaved(decoded, &mut samples);
                }
                Err(Error::DecodeError(err)) => {
                    warn!("decode error in {}: {}", path.display(), err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        let channels = channels.unwrap_or(0);
        let sample_rate = sample_rate.unwrap_or(0);
        debug!(
            "decoded {}: rate={} channels={} samples={}",
            path.display(),
            sample_rate,
            channels,
            samples.len()
        );

        Ok(DecodedPcm::new(sample_rate, channels, samples))
    }
}
