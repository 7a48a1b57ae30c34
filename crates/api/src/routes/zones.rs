use axum::routing::post;
use axum::Router;

use crate::handlers::{rain_lock, zones};
use crate::state::AppState;

/// Zone control and rain lock routes.
///
/// ```text
/// POST   /zones/{zone}/on     start_zone
/// POST   /zones/{zone}/off    stop_zone
/// POST   /rain-lock           engage_rain_lock
/// DELETE /rain-lock           clear_rain_lock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/zones/{zone}/on", post(zones::start_zone))
        .route("/zones/{zone}/off", post(zones::stop_zone))
        .route(
            "/rain-lock",
            post(rain_lock::engage_rain_lock).delete(rain_lock::clear_rain_lock),
        )
}
