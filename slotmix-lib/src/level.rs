//! Helpers for converting between decibels and linear volume.

use serde::de::{Error as DeError, Visitor};
use serde::Deserializer;
use std::fmt;

/// Convert a dB value to a linear volume multiplier.
pub fn db_to_volume(db: f32) -> f32 {
    10.0_f32.powf(0.05 * db)
}

/// Convert a linear volume multiplier to dB.
///
/// Non-positive volumes map to the dB value of `f32::MIN_POSITIVE` instead of
/// negative infinity.
pub fn volume_to_db(volume: f32) -> f32 {
    let v = volume.max(f32::MIN_POSITIVE);
    20.0 * v.log10()
}

/// Deserialize a dB value written either as a number or as a string like
/// `"-6db"`.
pub fn deserialize_db<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct DbVisitor;

    impl<'de> Visitor<'de> for DbVisitor {
        type Value = f32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number of decibels or a string like \"-6db\"")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            parse_db_str(value)
                .ok_or_else(|| DeError::custom(format!("invalid gain value \"{}\"", value)))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            self.visit_str(&value)
        }
    }

    deserializer.deserialize_any(DbVisitor)
}

/// Parse `"-6db"`, `"3 dB"` or a bare number into dB.
pub fn parse_db_str(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    let number = lower.strip_suffix("db").unwrap_or(&lower);
    number.trim().parse::<f32>().ok()
}
