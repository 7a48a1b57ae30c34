use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Logical watering zone, 1-based in configuration order.
pub type ZoneId = u8;

/// Physical GPIO line number (BCM numbering on a Raspberry Pi).
pub type PinId = u8;

/// Longest single zone run accepted from any source.
pub const MAX_ZONE_MINUTES: u32 = 720;

/// Longest rain lock accepted (two weeks).
pub const MAX_RAIN_LOCK_HOURS: u32 = 336;

/// Who started a zone job.
///
/// Serialized as `"manual"` or `"schedule:<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobSource {
    Manual,
    Schedule(String),
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSource::Manual => f.write_str("manual"),
            JobSource::Schedule(id) => write!(f, "schedule:{id}"),
        }
    }
}

impl Serialize for JobSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "manual" {
            return Ok(JobSource::Manual);
        }
        match raw.strip_prefix("schedule:") {
            Some(id) if !id.is_empty() => Ok(JobSource::Schedule(id.to_string())),
            _ => Err(serde::de::Error::custom(format!(
                "invalid job source '{raw}'"
            ))),
        }
    }
}
