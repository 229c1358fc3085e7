//! Human readable durations (`"90s"`, `"2m"`, `"1h 30m"`) for configuration files.

use serde::{
    Deserialize,
    Deserializer,
    Serializer,
};
use std::time::Duration;

pub mod duration_serde {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|err| serde::de::Error::custom(format!("invalid duration '{raw}': {err}")))
    }
}
