//! # Slotmix
//!
//! A small real-time mixer for game-style sound playback. Decoded sounds
//! ([`asset::AudioAsset`]) are played through lightweight cursors
//! ([`channel::AudioChannel`]); once per host tick an [`engine::MixEngine`]
//! mixes up to eight of them into a stereo stream and tops up the output
//! device's queue.

pub mod asset;
pub mod channel;
pub mod device;
pub mod engine;
pub mod error;
pub mod level;
pub mod settings;

pub use asset::AudioAsset;
pub use channel::{AudioChannel, SharedChannel};
pub use device::{OutputDevice, OutputSpec, QueueDevice, RodioDevice};
pub use engine::{MixEngine, MixReport, CHANNEL_MAX};
pub use error::{AssetLoadError, DeviceError};
pub use settings::EngineSettings;
