//! Playback cursors bound to a single asset.

use std::sync::{Arc, Mutex};

use crate::asset::AudioAsset;

/// Handle through which the host and the engine share one channel.
pub type SharedChannel = Arc<Mutex<AudioChannel>>;

/// One concurrently playing instance of an [`AudioAsset`].
///
/// `enabled` is what the mixer honours; `requested_enabled` is the host's
/// pending intent and is copied into `enabled` only when the engine
/// re-admits the channel into a slot.
#[derive(Debug)]
pub struct AudioChannel {
    id: i32,
    asset: Arc<AudioAsset>,
    pub(crate) position: usize,
    pub(crate) enabled: bool,
    requested_enabled: bool,
    volume: u8,
}

impl AudioChannel {
    /// Bind a new channel to `asset`, positioned at its first frame.
    pub fn new(id: i32, asset: Arc<AudioAsset>) -> Self {
        Self {
            id,
            asset,
            position: 0,
            enabled: true,
            requested_enabled: true,
            volume: u8::MAX,
        }
    }

    /// Create a channel already wrapped for sharing with a `MixEngine`.
    pub fn shared(id: i32, asset: Arc<AudioAsset>) -> SharedChannel {
        Arc::new(Mutex::new(Self::new(id, asset)))
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn asset(&self) -> &Arc<AudioAsset> {
        &self.asset
    }

    /// Current read cursor in stereo frames.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Record a pause (`false`) or resume (`true`) request.
    ///
    /// Takes effect on the next `MixEngine::update_slots` that lists this
    /// channel.
    pub fn set_requested_enabled(&mut self, enabled: bool) {
        self.requested_enabled = enabled;
    }

    pub fn requested_enabled(&self) -> bool {
        self.requested_enabled
    }

    /// True once the channel stopped contributing samples, either because it
    /// was admitted while paused or because its cursor reached the end.
    pub fn is_finished(&self) -> bool {
        !self.enabled
    }

    /// Stored attenuation in source units (0..=255).
    ///
    /// The mixer does not consult this value.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    /// Copy the pending request into the live flag. Called by the engine
    /// when the channel is installed into a slot.
    pub(crate) fn admit(&mut self) {
        self.enabled = self.requested_enabled;
    }
}
