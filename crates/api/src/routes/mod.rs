pub mod health;
pub mod schedules;
pub mod zones;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /status                          controller status (GET)
///
/// /zones/{zone}/on                 start a zone (POST, ?minutes=&replace=)
/// /zones/{zone}/off                stop a zone (POST)
///
/// /rain-lock                       engage (POST, ?hours=), clear (DELETE)
///
/// /schedules                       list, create
/// /schedules/order                 reorder (PUT)
/// /schedules/{id}                  get, replace, delete
/// ```
///
/// Every route requires the bearer token.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::status::get_status))
        .merge(zones::router())
        .nest("/schedules", schedules::router())
}
