//! Durable schedule storage.
//!
//! Schedules, their display order and each schedule's last dispatch date
//! live in a single JSON document. Every mutation rewrites the document
//! with write-temp-then-rename, so a crash mid-write leaves the previous
//! version intact.

pub mod error;
pub mod persist;
pub mod schedules;

pub use error::StoreError;
pub use schedules::ScheduleStore;
