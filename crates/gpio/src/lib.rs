//! GPIO output drivers and the zone ↔ pin mapping.
//!
//! - [`PinDriver`]: the energize / de-energize capability the runtime
//!   drives. Polarity is the driver's concern; callers only speak in terms
//!   of "energized".
//! - [`SysfsPinDriver`]: Linux `/sys/class/gpio` backend for relay boards.
//! - [`MemoryPinDriver`]: in-process backend for development and tests.
//! - [`ZoneMap`]: static, injective zone → pin mapping fixed at startup.

pub mod driver;
pub mod memory;
pub mod sysfs;
pub mod zone_map;

pub use driver::{PinDriver, PinError};
pub use memory::MemoryPinDriver;
pub use sysfs::SysfsPinDriver;
pub use zone_map::{ZoneMap, ZoneMapError};
