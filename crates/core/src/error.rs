use crate::types::{PinId, Timestamp, ZoneId};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Zone {0} is not configured")]
    InvalidZone(ZoneId),

    #[error("GPIO pin {0} is not configured")]
    InvalidPin(PinId),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rain lock active until {until}")]
    RainLockActive { until: Timestamp },

    #[error("Zone {zone} is already running")]
    ZoneBusy { zone: ZoneId },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
