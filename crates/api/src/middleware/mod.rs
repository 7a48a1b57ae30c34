//! Request extractors that gate access to the API.
//!
//! - [`auth::RequireToken`] -- Requires the shared bearer token.

pub mod auth;
