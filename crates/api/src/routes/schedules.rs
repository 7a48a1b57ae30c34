use axum::routing::{get, put};
use axum::Router;

use crate::handlers::schedules;
use crate::state::AppState;

/// Schedule CRUD routes, nested under `/schedules`.
///
/// ```text
/// GET    /          list_schedules
/// POST   /          create_schedule
/// PUT    /order     reorder_schedules
/// GET    /{id}      get_schedule
/// PUT    /{id}      update_schedule
/// DELETE /{id}      delete_schedule
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(schedules::list_schedules).post(schedules::create_schedule),
        )
        .route("/order", put(schedules::reorder_schedules))
        .route(
            "/{id}",
            get(schedules::get_schedule)
                .put(schedules::update_schedule)
                .delete(schedules::delete_schedule),
        )
}
