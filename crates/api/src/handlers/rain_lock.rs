//! Handlers for the rain lock.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use sprinkler_core::error::CoreError;

use crate::error::AppResult;
use crate::middleware::auth::RequireToken;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RainLockParams {
    pub hours: Option<i64>,
}

/// POST /api/v1/rain-lock
///
/// Engage the lock and stop every running zone before responding.
pub async fn engage_rain_lock(
    _auth: RequireToken,
    State(state): State<AppState>,
    query: Result<Query<RainLockParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = query?;
    let hours = match params.hours {
        Some(raw) => u32::try_from(raw).map_err(|_| {
            CoreError::InvalidDuration(format!("hours must be positive, got {raw}"))
        })?,
        None => state.config.rain_lock_default_hours,
    };

    state.runtime.engage_rain_lock(hours).await?;
    let status = state.runtime.rain_lock().status(Utc::now()).await;

    Ok(Json(DataResponse { data: status }))
}

/// DELETE /api/v1/rain-lock
pub async fn clear_rain_lock(
    _auth: RequireToken,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.runtime.clear_rain_lock().await;
    let status = state.runtime.rain_lock().status(Utc::now()).await;

    Ok(Json(DataResponse { data: status }))
}
