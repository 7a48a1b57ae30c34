//! Schedule execution engine.
//!
//! Contains the background dispatcher that decides, once per polling
//! interval, which schedules are due and drives their runs through the
//! zone runtime.

pub mod dispatcher;
