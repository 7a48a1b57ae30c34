//! Sprinkler controller HTTP service library.
//!
//! Exposes configuration, state, error handling, routes and the schedule
//! dispatcher so the binary entrypoint and the integration tests build the
//! service the same way.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
