//! Handlers for schedule CRUD and ordering.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use sprinkler_core::error::CoreError;
use sprinkler_core::schedule::ScheduleInput;

use crate::error::AppResult;
use crate::middleware::auth::RequireToken;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PUT /schedules/order`.
#[derive(Debug, Deserialize)]
pub struct ReorderSchedules {
    pub ids: Vec<String>,
}

/// GET /api/v1/schedules
///
/// All schedules in display order.
pub async fn list_schedules(
    _auth: RequireToken,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let schedules = state.store.list().await;
    Ok(Json(DataResponse { data: schedules }))
}

/// GET /api/v1/schedules/{id}
pub async fn get_schedule(
    _auth: RequireToken,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let schedule = state.store.get(&id).await?;
    Ok(Json(DataResponse { data: schedule }))
}

/// POST /api/v1/schedules
///
/// Validate and store a new schedule. A missing id is generated.
pub async fn create_schedule(
    _auth: RequireToken,
    State(state): State<AppState>,
    payload: Result<Json<ScheduleInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let schedule = input.validate(state.runtime.zones().pins())?;
    let schedule = state.store.create(schedule).await?;

    tracing::info!(
        schedule_id = %schedule.id,
        start_time = %schedule.start_time,
        steps = schedule.sequence.len(),
        "Schedule created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: schedule })))
}

/// PUT /api/v1/schedules/{id}
///
/// Full replacement of an existing schedule. A body id, if present, must
/// match the path.
pub async fn update_schedule(
    _auth: RequireToken,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ScheduleInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(mut input) = payload?;
    if let Some(body_id) = input.id.as_deref().map(str::trim) {
        if !body_id.is_empty() && body_id != id {
            return Err(CoreError::Validation(format!(
                "body id '{body_id}' does not match path id '{id}'"
            ))
            .into());
        }
    }
    input.id = Some(id);

    let schedule = input.validate(state.runtime.zones().pins())?;
    let schedule = state.store.update(schedule).await?;

    tracing::info!(schedule_id = %schedule.id, enabled = schedule.enabled, "Schedule updated");

    Ok(Json(DataResponse { data: schedule }))
}

/// DELETE /api/v1/schedules/{id}
///
/// A run already in flight for the schedule finishes normally.
pub async fn delete_schedule(
    _auth: RequireToken,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.store.delete(&id).await?;
    tracing::info!(schedule_id = %id, "Schedule deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/schedules/order
///
/// Unknown ids are ignored; schedules left out keep their relative order
/// after the listed ones.
pub async fn reorder_schedules(
    _auth: RequireToken,
    State(state): State<AppState>,
    payload: Result<Json<ReorderSchedules>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = payload?;
    let schedules = state.store.reorder(&body.ids).await?;
    Ok(Json(DataResponse { data: schedules }))
}
