//! Handlers for manual zone control.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sprinkler_core::error::CoreError;
use sprinkler_core::types::{JobSource, PinId, ZoneId};
use sprinkler_runtime::ZoneJob;

use crate::error::AppResult;
use crate::middleware::auth::RequireToken;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartZoneParams {
    /// Run length; the configured default when absent.
    pub minutes: Option<i64>,
    /// Cancel a job already running on the zone (default `true`).
    pub replace: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ZoneOffResponse {
    pub zone: ZoneId,
    pub pin: PinId,
    pub energized: bool,
    /// The job that was running, if any.
    pub stopped: Option<ZoneJob>,
}

/// POST /api/v1/zones/{zone}/on
///
/// Energize a zone for `minutes`. Returns the job with its scheduled end.
pub async fn start_zone(
    _auth: RequireToken,
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
    query: Result<Query<StartZoneParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(zone) = path?;
    let Query(params) = query?;
    let zone = zone_id(zone)?;

    let minutes = match params.minutes {
        Some(raw) => u32::try_from(raw).map_err(|_| {
            CoreError::InvalidDuration(format!("minutes must be positive, got {raw}"))
        })?,
        None => state.config.default_runtime_minutes,
    };

    let handle = state
        .runtime
        .start_zone(
            zone,
            minutes,
            JobSource::Manual,
            params.replace.unwrap_or(true),
        )
        .await?;

    Ok(Json(DataResponse {
        data: handle.job().clone(),
    }))
}

/// POST /api/v1/zones/{zone}/off
pub async fn stop_zone(
    _auth: RequireToken,
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(zone) = path?;
    let zone = zone_id(zone)?;

    let stopped = state.runtime.stop_zone(zone).await?;
    let pin = state
        .runtime
        .zones()
        .pin_for(zone)
        .ok_or(CoreError::InvalidZone(zone))?;

    Ok(Json(DataResponse {
        data: ZoneOffResponse {
            zone,
            pin,
            energized: false,
            stopped,
        },
    }))
}

fn zone_id(raw: u32) -> Result<ZoneId, CoreError> {
    ZoneId::try_from(raw).map_err(|_| CoreError::NotFound {
        entity: "Zone",
        id: raw.to_string(),
    })
}
