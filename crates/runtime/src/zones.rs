//! Per-zone timer jobs.
//!
//! Each energized zone has exactly one [`ManagedJob`] in the job map: the
//! public [`ZoneJob`] record, a timer task that de-energizes the pin when the
//! run length elapses, and the tokens used to cancel and observe it.
//!
//! Teardown is two-phase. Whoever removes a job from the map (expiry, stop,
//! replacement, rain lock) de-energizes its pin while still holding the map
//! lock, then releases the lock, cancels the timer and joins it. A timer that
//! wakes up to find its job gone, or replaced by a newer one, does nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use serde::Serialize;
use sprinkler_core::error::CoreError;
use sprinkler_core::types::{JobSource, PinId, Timestamp, ZoneId, MAX_ZONE_MINUTES};
use sprinkler_gpio::{PinDriver, PinError, ZoneMap};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::rain_lock::RainLock;

/// A live zone activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneJob {
    pub zone: ZoneId,
    pub pin: PinId,
    pub minutes: u32,
    pub started_at: Timestamp,
    pub ends_at: Timestamp,
    pub source: JobSource,
}

/// How a zone job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEnd {
    /// The run length elapsed.
    Expired,
    /// Stopped, replaced, or drained by shutdown or the rain lock.
    Interrupted,
}

/// Returned by [`ZoneRuntime::start_zone`].
#[derive(Debug, Clone)]
pub struct ZoneJobHandle {
    job: ZoneJob,
    finished: CancellationToken,
    expired: Arc<AtomicBool>,
}

impl ZoneJobHandle {
    pub fn job(&self) -> &ZoneJob {
        &self.job
    }

    /// Resolves once the job has been torn down by any path and its pin is
    /// de-energized.
    pub async fn finished(&self) -> JobEnd {
        self.finished.cancelled().await;
        if self.expired.load(Ordering::Acquire) {
            JobEnd::Expired
        } else {
            JobEnd::Interrupted
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }
}

/// One row of [`ZoneRuntime::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSnapshot {
    pub zone: ZoneId,
    pub pin: PinId,
    /// Read back from the pin driver, not inferred from the job map.
    pub energized: bool,
    pub remaining_minutes: Option<u32>,
    pub source: Option<JobSource>,
    pub ends_at: Option<Timestamp>,
}

struct ManagedJob {
    /// Distinguishes this job from a later one on the same zone.
    id: u64,
    job: ZoneJob,
    deadline: Instant,
    cancel: CancellationToken,
    finished: CancellationToken,
    /// Set before `finished` fires when the timer ran to completion.
    expired: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ManagedJob {
    /// Cancel the timer task and wait for it to exit.
    async fn join(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!(zone = self.job.zone, error = %e, "Zone timer task panicked");
            }
        }
    }
}

/// Owns zone jobs, the pin driver and the rain lock.
///
/// Created once at startup via [`ZoneRuntime::new`]; the returned `Arc` is
/// shared by the HTTP handlers and the schedule dispatcher.
pub struct ZoneRuntime {
    driver: Arc<dyn PinDriver>,
    zones: ZoneMap,
    jobs: Mutex<HashMap<ZoneId, ManagedJob>>,
    rain_lock: RainLock,
    next_job_id: AtomicU64,
}

impl ZoneRuntime {
    pub fn new(driver: Arc<dyn PinDriver>, zones: ZoneMap) -> Arc<Self> {
        Arc::new(Self {
            driver,
            zones,
            jobs: Mutex::new(HashMap::new()),
            rain_lock: RainLock::new(),
            next_job_id: AtomicU64::new(1),
        })
    }

    pub fn zones(&self) -> &ZoneMap {
        &self.zones
    }

    pub fn backend(&self) -> &'static str {
        self.driver.backend()
    }

    pub fn rain_lock(&self) -> &RainLock {
        &self.rain_lock
    }

    /// Drive every configured pin to de-energized.
    pub fn reset_all_outputs(&self) -> Result<(), RuntimeError> {
        for pin in self.zones.pins() {
            self.driver.set_output(*pin, false)?;
        }
        tracing::info!(pins = ?self.zones.pins(), "All zone outputs de-energized");
        Ok(())
    }

    /// Energize `zone` for `minutes`.
    ///
    /// With `cancel_existing`, a job already running on the zone is fully
    /// torn down (pin off, timer joined) before the new one starts; without
    /// it the call fails with `ZoneBusy`.
    pub async fn start_zone(
        self: &Arc<Self>,
        zone: ZoneId,
        minutes: u32,
        source: JobSource,
        cancel_existing: bool,
    ) -> Result<ZoneJobHandle, RuntimeError> {
        let pin = self
            .zones
            .pin_for(zone)
            .ok_or(CoreError::InvalidZone(zone))?;
        validate_minutes(minutes)?;

        loop {
            let mut jobs = self.jobs.lock().await;

            // Checked under the job lock: engaging the lock sets it before
            // taking this mutex to drain jobs.
            if let Some(until) = self.rain_lock.active_until(Utc::now()).await {
                return Err(CoreError::RainLockActive { until }.into());
            }

            if jobs.contains_key(&zone) && !cancel_existing {
                return Err(CoreError::ZoneBusy { zone }.into());
            }

            if let Some(existing) = jobs.remove(&zone) {
                let released = self.release(&existing, JobEnd::Interrupted);
                drop(jobs);
                tracing::info!(
                    zone,
                    pin,
                    previous = %existing.job.source,
                    "Replacing running zone job",
                );
                existing.join().await;
                released?;
                // Another caller may have claimed the zone meanwhile.
                continue;
            }

            self.driver.set_output(pin, true)?;
            let (managed, handle) = self.spawn_job(zone, pin, minutes, source);
            jobs.insert(zone, managed);

            tracing::info!(
                zone,
                pin,
                minutes,
                source = %handle.job.source,
                ends_at = %handle.job.ends_at,
                "Zone energized",
            );
            return Ok(handle);
        }
    }

    /// De-energize `zone` and drop its job, if any.
    ///
    /// Idempotent: the pin is written even when no job is running. Returns
    /// the job that was stopped.
    pub async fn stop_zone(&self, zone: ZoneId) -> Result<Option<ZoneJob>, RuntimeError> {
        let pin = self
            .zones
            .pin_for(zone)
            .ok_or(CoreError::InvalidZone(zone))?;

        let mut jobs = self.jobs.lock().await;
        let existing = jobs.remove(&zone);
        let written = match &existing {
            Some(managed) => self.release(managed, JobEnd::Interrupted),
            None => self.driver.set_output(pin, false),
        };
        drop(jobs);

        let stopped = match existing {
            Some(managed) => {
                let job = managed.job.clone();
                managed.join().await;
                Some(job)
            }
            None => None,
        };
        written?;

        tracing::info!(
            zone,
            pin,
            had_job = stopped.is_some(),
            "Zone de-energized",
        );
        Ok(stopped)
    }

    /// Whole minutes left on `zone`'s job, rounded to nearest.
    pub async fn remaining_minutes(&self, zone: ZoneId) -> Option<u32> {
        let jobs = self.jobs.lock().await;
        jobs.get(&zone)
            .map(|managed| minutes_left(managed.deadline, Instant::now()))
    }

    /// Live jobs in zone order.
    pub async fn active_jobs(&self) -> Vec<ZoneJob> {
        let jobs = self.jobs.lock().await;
        let mut list: Vec<ZoneJob> = jobs.values().map(|m| m.job.clone()).collect();
        list.sort_by_key(|job| job.zone);
        list
    }

    /// Per-zone state with the energized flag read from the driver.
    pub async fn snapshot(&self) -> Result<Vec<ZoneSnapshot>, RuntimeError> {
        let jobs = self.jobs.lock().await;
        let now = Instant::now();

        self.zones
            .iter()
            .map(|(zone, pin)| -> Result<ZoneSnapshot, RuntimeError> {
                let managed = jobs.get(&zone);
                Ok(ZoneSnapshot {
                    zone,
                    pin,
                    energized: self.driver.read_output(pin)?,
                    remaining_minutes: managed.map(|m| minutes_left(m.deadline, now)),
                    source: managed.map(|m| m.job.source.clone()),
                    ends_at: managed.map(|m| m.job.ends_at),
                })
            })
            .collect()
    }

    /// Stop every live job and wait for all timer tasks to exit.
    ///
    /// Returns the number of jobs stopped.
    pub async fn shutdown_all(&self) -> usize {
        let mut jobs = self.jobs.lock().await;
        let drained: Vec<ManagedJob> = jobs.drain().map(|(_, managed)| managed).collect();
        for managed in &drained {
            if let Err(e) = self.release(managed, JobEnd::Interrupted) {
                tracing::error!(zone = managed.job.zone, error = %e, "Failed to de-energize zone");
            }
        }
        drop(jobs);

        let count = drained.len();
        futures::future::join_all(drained.into_iter().map(ManagedJob::join)).await;

        if count > 0 {
            tracing::info!(count, "All zone jobs stopped");
        }
        count
    }

    /// Engage the rain lock for `hours` and turn every running zone off.
    ///
    /// Returns the lock expiry once all zones are off.
    pub async fn engage_rain_lock(&self, hours: u32) -> Result<Timestamp, RuntimeError> {
        let span = RainLock::validate_hours(hours)?;
        let until = Utc::now() + span;

        self.rain_lock.set_until(until).await;
        let stopped = self.shutdown_all().await;

        tracing::info!(hours, %until, stopped, "Rain lock engaged");
        Ok(until)
    }

    pub async fn clear_rain_lock(&self) {
        self.rain_lock.clear().await;
        tracing::info!("Rain lock cleared");
    }

    // ---- private helpers ----

    fn spawn_job(
        self: &Arc<Self>,
        zone: ZoneId,
        pin: PinId,
        minutes: u32,
        source: JobSource,
    ) -> (ManagedJob, ZoneJobHandle) {
        let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let run_length = std::time::Duration::from_secs(u64::from(minutes) * 60);
        let deadline = Instant::now() + run_length;
        let started_at = Utc::now();

        let job = ZoneJob {
            zone,
            pin,
            minutes,
            started_at,
            ends_at: started_at + chrono::Duration::minutes(i64::from(minutes)),
            source,
        };

        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let expired = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_timer(
            Arc::downgrade(self),
            zone,
            id,
            deadline,
            cancel.clone(),
        ));

        let handle = ZoneJobHandle {
            job: job.clone(),
            finished: finished.clone(),
            expired: Arc::clone(&expired),
        };
        let managed = ManagedJob {
            id,
            job,
            deadline,
            cancel,
            finished,
            expired,
            task,
        };
        (managed, handle)
    }

    /// Timer expiry: tear the job down unless someone else already did.
    async fn expire(&self, zone: ZoneId, id: u64) {
        let mut jobs = self.jobs.lock().await;
        if !jobs.get(&zone).is_some_and(|m| m.id == id) {
            return;
        }
        let Some(managed) = jobs.remove(&zone) else {
            return;
        };
        match self.release(&managed, JobEnd::Expired) {
            Ok(()) => tracing::info!(
                zone,
                pin = managed.job.pin,
                source = %managed.job.source,
                "Zone run finished",
            ),
            Err(e) => tracing::error!(zone, error = %e, "Failed to de-energize zone at expiry"),
        }
    }

    /// De-energize a job's pin and signal its watchers. Caller holds the job
    /// lock and has already removed the job from the map.
    fn release(&self, managed: &ManagedJob, end: JobEnd) -> Result<(), PinError> {
        let written = self.driver.set_output(managed.job.pin, false);
        if end == JobEnd::Expired {
            managed.expired.store(true, Ordering::Release);
        }
        managed.finished.cancel();
        written
    }
}

async fn run_timer(
    runtime: Weak<ZoneRuntime>,
    zone: ZoneId,
    id: u64,
    deadline: Instant,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep_until(deadline) => {
            if let Some(runtime) = runtime.upgrade() {
                runtime.expire(zone, id).await;
            }
        }
    }
}

fn validate_minutes(minutes: u32) -> Result<(), CoreError> {
    if !(1..=MAX_ZONE_MINUTES).contains(&minutes) {
        return Err(CoreError::InvalidDuration(format!(
            "minutes must be between 1 and {MAX_ZONE_MINUTES}, got {minutes}"
        )));
    }
    Ok(())
}

fn minutes_left(deadline: Instant, now: Instant) -> u32 {
    let secs = deadline.saturating_duration_since(now).as_secs_f64();
    (secs / 60.0).round() as u32
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn minutes_left_rounds_to_nearest() {
        let now = Instant::now();
        assert_eq!(minutes_left(now + Duration::from_secs(299), now), 5);
        assert_eq!(minutes_left(now + Duration::from_secs(89), now), 1);
        assert_eq!(minutes_left(now + Duration::from_secs(29), now), 0);
        assert_eq!(minutes_left(now, now + Duration::from_secs(10)), 0);
    }

    #[test]
    fn run_length_bounds() {
        assert!(validate_minutes(0).is_err());
        assert!(validate_minutes(1).is_ok());
        assert!(validate_minutes(720).is_ok());
        assert!(validate_minutes(721).is_err());
    }
}
