//! Error types surfaced by asset loading and output device handling.

use std::fmt::{Display, Formatter};

/// Error returned when an [`AudioAsset`](crate::asset::AudioAsset) cannot be
/// produced from a source file.
#[derive(Debug)]
pub enum AssetLoadError {
    Io(std::io::Error),
    Decode(String),
    UnsupportedChannels(u16),
    Empty(String),
}

impl Display for AssetLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::UnsupportedChannels(count) => write!(
                f,
                "unsupported channel layout: {} channel(s), only mono and stereo are supported",
                count
            ),
            Self::Empty(name) => write!(f, "no audio frames decoded from {}", name),
        }
    }
}

impl std::error::Error for AssetLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AssetLoadError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<symphonia::core::errors::Error> for AssetLoadError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        match value {
            symphonia::core::errors::Error::IoError(err) => Self::Io(err),
            other => Self::Decode(other.to_string()),
        }
    }
}

/// Error raised by an [`OutputDevice`](crate::device::OutputDevice).
///
/// `Unavailable` is fatal for a [`MixEngine`](crate::engine::MixEngine): it is
/// returned from construction and no mixing happens afterwards.
#[derive(Debug)]
pub enum DeviceError {
    Unavailable(String),
    UnsupportedSpec(String),
    Closed,
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "output device unavailable: {}", err),
            Self::UnsupportedSpec(err) => write!(f, "unsupported output spec: {}", err),
            Self::Closed => write!(f, "output device is closed"),
        }
    }
}

impl std::error::Error for DeviceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_their_source() {
        let err = AssetLoadError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing.wav",
        ));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("io error"));
    }

    #[test]
    fn symphonia_io_errors_map_to_io() {
        let err = AssetLoadError::from(symphonia::core::errors::Error::IoError(
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"),
        ));
        assert!(matches!(err, AssetLoadError::Io(_)));
    }

    #[test]
    fn channel_layout_message_names_the_count() {
        let err = AssetLoadError::UnsupportedChannels(6);
        assert!(err.to_string().contains("6 channel(s)"));
    }
}
