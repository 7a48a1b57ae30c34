//! Zone-timer runtime.
//!
//! [`ZoneRuntime`] owns every piece of mutable valve state: which zones are
//! energized, the timer task behind each, and the [`RainLock`]. Manual
//! commands and schedule runs both go through it, so per-zone exclusivity and
//! the rain lock hold no matter where a request comes from.

pub mod error;
pub mod rain_lock;
pub mod zones;

pub use error::RuntimeError;
pub use rain_lock::{RainLock, RainLockStatus};
pub use zones::{JobEnd, ZoneJob, ZoneJobHandle, ZoneRuntime, ZoneSnapshot};
