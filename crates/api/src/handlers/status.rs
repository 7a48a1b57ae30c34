//! Controller status: zones, rain lock and schedules in one response.

use std::collections::HashSet;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sprinkler_core::schedule::Schedule;
use sprinkler_runtime::{RainLockStatus, ZoneSnapshot};

use crate::error::AppResult;
use crate::middleware::auth::RequireToken;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ControllerStatus {
    pub version: &'static str,
    pub gpio_backend: &'static str,
    pub zones: Vec<ZoneSnapshot>,
    pub rain_lock: RainLockStatus,
    pub schedules: Vec<ScheduleStatus>,
}

/// A stored schedule plus its runtime bookkeeping.
#[derive(Debug, Serialize)]
pub struct ScheduleStatus {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub resolved_duration: u32,
    pub last_run: Option<NaiveDate>,
    /// A run of this schedule is in flight.
    pub running: bool,
}

/// GET /api/v1/status
pub async fn get_status(
    _auth: RequireToken,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let zones = state.runtime.snapshot().await?;
    let rain_lock = state.runtime.rain_lock().status(Utc::now()).await;

    let last_runs = state.store.last_runs().await;
    let running: HashSet<String> = state.dispatcher.active_runs().await.into_iter().collect();
    let schedules = state
        .store
        .list()
        .await
        .into_iter()
        .map(|schedule| ScheduleStatus {
            resolved_duration: schedule.resolved_duration(),
            last_run: last_runs.get(&schedule.id).copied(),
            running: running.contains(&schedule.id),
            schedule,
        })
        .collect();

    Ok(Json(DataResponse {
        data: ControllerStatus {
            version: env!("CARGO_PKG_VERSION"),
            gpio_backend: state.runtime.backend(),
            zones,
            rain_lock,
            schedules,
        },
    }))
}
