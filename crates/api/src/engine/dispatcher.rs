//! Background schedule dispatcher.
//!
//! Polls the schedule store every `poll_interval` and starts a run for each
//! schedule that is due. A run executes its steps one after another through
//! the [`ZoneRuntime`], waiting for each zone job to finish before starting
//! the next.
//!
//! A schedule's last-run date is persisted *before* its run is spawned, so a
//! later tick in the same due window (or a restart) never starts it twice.
//! Failing to persist that date ends the loop with an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sprinkler_core::clock::Clock;
use sprinkler_core::schedule::Schedule;
use sprinkler_core::scheduling::should_run;
use sprinkler_core::types::JobSource;
use sprinkler_runtime::{JobEnd, ZoneRuntime};
use sprinkler_store::{ScheduleStore, StoreError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Failures that stop the dispatcher loop.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to record last run of schedule {schedule_id}: {source}")]
    RecordLastRun {
        schedule_id: String,
        #[source]
        source: StoreError,
    },
}

/// Background schedule dispatcher.
///
/// One long-lived Tokio task drives [`ScheduleDispatcher::run`]; each due
/// schedule gets its own run task, tracked by schedule id.
pub struct ScheduleDispatcher {
    runtime: Arc<ZoneRuntime>,
    store: Arc<ScheduleStore>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    /// In-flight run tasks indexed by schedule id.
    runs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl ScheduleDispatcher {
    pub fn new(
        runtime: Arc<ZoneRuntime>,
        store: Arc<ScheduleStore>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            runtime,
            store,
            clock,
            poll_interval,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    ///
    /// On cancellation, in-flight runs are aborted; zones they started keep
    /// their timers until the caller shuts the runtime down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), DispatchError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Schedule dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Schedule dispatcher shutting down");
                    self.abort_runs().await;
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Schedule dispatcher failed");
                        self.abort_runs().await;
                        return Err(e);
                    }
                }
            }
        }
    }

    /// One evaluation pass. Returns how many runs were started.
    pub async fn tick(&self) -> Result<usize, DispatchError> {
        self.reap_finished().await;

        if let Some(until) = self.runtime.rain_lock().active_until(Utc::now()).await {
            tracing::debug!(%until, "Rain lock active, skipping schedule evaluation");
            return Ok(0);
        }

        let now = self.clock.now();
        let today = now.date();
        let last_runs = self.store.last_runs().await;
        let schedules = self.store.list().await;

        let mut runs = self.runs.lock().await;
        let mut started = 0;

        for schedule in schedules {
            if runs.contains_key(&schedule.id) {
                continue;
            }
            if !should_run(&schedule, now, last_runs.get(&schedule.id).copied()) {
                continue;
            }

            let recorded = self
                .store
                .record_last_run(&schedule.id, today)
                .await
                .map_err(|source| DispatchError::RecordLastRun {
                    schedule_id: schedule.id.clone(),
                    source,
                })?;
            if !recorded {
                // Deleted since we listed it.
                continue;
            }

            tracing::info!(
                schedule_id = %schedule.id,
                start_time = %schedule.start_time,
                minutes = schedule.resolved_duration(),
                "Dispatching schedule run",
            );

            let id = schedule.id.clone();
            let handle = tokio::spawn(execute_run(Arc::clone(&self.runtime), schedule));
            runs.insert(id, handle);
            started += 1;
        }

        Ok(started)
    }

    /// Ids of schedules with a run in flight, sorted.
    pub async fn active_runs(&self) -> Vec<String> {
        let runs = self.runs.lock().await;
        let mut ids: Vec<String> = runs
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    // ---- private helpers ----

    /// Drop handles of finished runs, logging any that panicked.
    async fn reap_finished(&self) {
        let mut runs = self.runs.lock().await;
        let done: Vec<String> = runs
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();

        for id in done {
            if let Some(handle) = runs.remove(&id) {
                if let Err(e) = handle.await {
                    tracing::error!(schedule_id = %id, error = %e, "Schedule run task failed");
                }
            }
        }
    }

    async fn abort_runs(&self) {
        let mut runs = self.runs.lock().await;
        for (id, handle) in runs.drain() {
            if !handle.is_finished() {
                tracing::info!(schedule_id = %id, "Aborting schedule run");
            }
            handle.abort();
        }
    }
}

/// Execute one schedule run: its steps strictly in order.
///
/// A step only advances when its zone job runs to completion. An unmapped
/// pin, a busy zone, an engaged rain lock, or a job stopped or replaced
/// mid-step aborts the remaining steps. Nothing is retried.
async fn execute_run(runtime: Arc<ZoneRuntime>, schedule: Schedule) {
    let steps = schedule.resolved_steps(runtime.zones().first_pin());
    if steps.is_empty() {
        tracing::warn!(schedule_id = %schedule.id, "Schedule has no runnable steps");
        return;
    }

    let source = JobSource::Schedule(schedule.id.clone());

    for (step, entry) in steps.iter().enumerate() {
        let Some(zone) = runtime.zones().zone_for(entry.pin) else {
            tracing::warn!(
                schedule_id = %schedule.id,
                step,
                pin = entry.pin,
                "Schedule step targets an unmapped pin, aborting run",
            );
            return;
        };

        match runtime
            .start_zone(zone, entry.duration_minutes, source.clone(), false)
            .await
        {
            Ok(handle) => {
                if handle.finished().await == JobEnd::Interrupted {
                    tracing::info!(
                        schedule_id = %schedule.id,
                        step,
                        zone,
                        "Schedule step interrupted, aborting run",
                    );
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(
                    schedule_id = %schedule.id,
                    step,
                    zone,
                    error = %e,
                    "Schedule step failed, aborting run",
                );
                return;
            }
        }
    }

    tracing::info!(schedule_id = %schedule.id, steps = steps.len(), "Schedule run complete");
}
