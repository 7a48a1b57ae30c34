//! Global inhibition of new zone starts.

use serde::Serialize;
use sprinkler_core::error::CoreError;
use sprinkler_core::types::{Timestamp, MAX_RAIN_LOCK_HOURS};
use tokio::sync::RwLock;

/// Point-in-time view of the rain lock for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RainLockStatus {
    pub active: bool,
    /// Last configured expiry, reported even after it has passed.
    pub expires_at: Option<Timestamp>,
}

/// Optional expiry timestamp; the lock is active while `now < until`.
///
/// Every mutation is a total overwrite. Turning zones off on engagement is
/// the job of [`ZoneRuntime::engage_rain_lock`](crate::ZoneRuntime::engage_rain_lock).
#[derive(Debug, Default)]
pub struct RainLock {
    until: RwLock<Option<Timestamp>>,
}

impl RainLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a requested lock length into a duration.
    pub fn validate_hours(hours: u32) -> Result<chrono::Duration, CoreError> {
        if !(1..=MAX_RAIN_LOCK_HOURS).contains(&hours) {
            return Err(CoreError::InvalidDuration(format!(
                "rain lock hours must be between 1 and {MAX_RAIN_LOCK_HOURS}, got {hours}"
            )));
        }
        Ok(chrono::Duration::hours(i64::from(hours)))
    }

    pub async fn set_until(&self, until: Timestamp) {
        *self.until.write().await = Some(until);
    }

    pub async fn clear(&self) {
        *self.until.write().await = None;
    }

    /// Expiry if the lock is active at `now`.
    pub async fn active_until(&self, now: Timestamp) -> Option<Timestamp> {
        self.until.read().await.filter(|until| now < *until)
    }

    pub async fn is_active(&self, now: Timestamp) -> bool {
        self.active_until(now).await.is_some()
    }

    pub async fn status(&self, now: Timestamp) -> RainLockStatus {
        let until = *self.until.read().await;
        RainLockStatus {
            active: until.is_some_and(|u| now < u),
            expires_at: until,
        }
    }
}
