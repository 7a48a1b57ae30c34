//! Due-check for watering schedules.
//!
//! Pure logic; the dispatcher supplies the local time and the last date a
//! schedule was dispatched.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::schedule::{Day, Schedule};

/// Width in seconds of the window after `start_time` in which a schedule
/// may fire.
///
/// Matches the dispatcher's polling granularity: a 30 s poll lands in the
/// window at least once, and the `last_run` guard stops a second fire.
pub const DUE_WINDOW_SECS: i64 = 60;

/// Decide whether `schedule` must fire at local time `now`.
///
/// True only when the schedule is enabled, today is one of its days, it has
/// not already run today, and `now` lies in `[run_at, run_at + 60s)`.
pub fn should_run(schedule: &Schedule, now: NaiveDateTime, last_run: Option<NaiveDate>) -> bool {
    if !schedule.enabled {
        return false;
    }
    if !schedule.runs_on(Day::from(now.weekday())) {
        return false;
    }
    if last_run == Some(now.date()) {
        return false;
    }

    let run_at = now.date().and_time(schedule.start_time.as_naive_time());
    now >= run_at && now < run_at + Duration::seconds(DUE_WINDOW_SECS)
}
