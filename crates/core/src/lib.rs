//! Domain types and pure logic for the sprinkler controller.
//!
//! No I/O lives here: schedule validation, the due-check, the shared error
//! taxonomy and the clock abstraction are used by the runtime, the store
//! and the HTTP layer alike.

pub mod clock;
pub mod error;
pub mod schedule;
pub mod scheduling;
pub mod types;
