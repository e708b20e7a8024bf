//! Engine and output device settings.

use serde::{Deserialize, Serialize};

use crate::level::{db_to_volume, deserialize_db};

const DEFAULT_OPEN_RETRIES: u32 = 3;
const DEFAULT_OPEN_RETRY_MS: u64 = 100;
const MIN_GAIN_DB: f32 = -60.0;
const MAX_GAIN_DB: f32 = 12.0;

/// Serialized configuration for opening and driving the output device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Attempts made to open the output stream before giving up.
    pub open_retries: u32,
    /// Delay between open attempts.
    pub open_retry_ms: u64,
    /// Device-level output gain in dB. Per-channel volume is separate.
    #[serde(deserialize_with = "deserialize_db")]
    pub output_gain_db: f32,
}

impl EngineSettings {
    pub fn new(open_retries: u32, open_retry_ms: u64, output_gain_db: f32) -> Self {
        Self {
            open_retries: open_retries.max(1),
            open_retry_ms,
            output_gain_db: sanitize_gain_db(output_gain_db),
        }
    }

    pub fn with_open_retries(mut self, open_retries: u32) -> Self {
        self.open_retries = open_retries.max(1);
        self
    }

    pub fn with_open_retry_ms(mut self, open_retry_ms: u64) -> Self {
        self.open_retry_ms = open_retry_ms;
        self
    }

    pub fn with_output_gain_db(mut self, output_gain_db: f32) -> Self {
        self.output_gain_db = sanitize_gain_db(output_gain_db);
        self
    }

    /// Parse settings from JSON, clamping out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let parsed: Self = serde_json::from_str(json)?;
        Ok(Self::new(
            parsed.open_retries,
            parsed.open_retry_ms,
            parsed.output_gain_db,
        ))
    }

    /// Linear multiplier for `output_gain_db`.
    pub fn output_volume(&self) -> f32 {
        db_to_volume(self.output_gain_db)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            open_retries: DEFAULT_OPEN_RETRIES,
            open_retry_ms: DEFAULT_OPEN_RETRY_MS,
            output_gain_db: 0.0,
        }
    }
}

fn sanitize_gain_db(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unity_gain() {
        let settings = EngineSettings::default();
        assert_eq!(settings.open_retries, 3);
        assert!((settings.output_volume() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn builders_clamp() {
        let settings = EngineSettings::default()
            .with_open_retries(0)
            .with_output_gain_db(40.0);
        assert_eq!(settings.open_retries, 1);
        assert_eq!(settings.output_gain_db, 12.0);
        assert_eq!(
            EngineSettings::default()
                .with_output_gain_db(f32::NAN)
                .output_gain_db,
            0.0
        );
    }

    #[test]
    fn json_accepts_db_strings_and_fills_defaults() {
        let settings = EngineSettings::from_json(r#"{"output_gain_db":"-6db"}"#).unwrap();
        assert_eq!(settings.output_gain_db, -6.0);
        assert_eq!(settings.open_retry_ms, 100);

        let settings = EngineSettings::from_json(r#"{"open_retries":0,"output_gain_db":-100}"#)
            .unwrap();
        assert_eq!(settings.open_retries, 1);
        assert_eq!(settings.output_gain_db, -60.0);
    }

    #[test]
    fn json_rejects_garbage_gain() {
        assert!(EngineSettings::from_json(r#"{"output_gain_db":"loud"}"#).is_err());
    }
}
