//! Watering schedule model and validation.
//!
//! A [`Schedule`] is always in normalized form: `start_time` is a parsed
//! [`StartTime`], `days` is a deduplicated set in calendar order, and every
//! step duration is within `1..=MAX_ZONE_MINUTES`. Raw API payloads arrive
//! as [`ScheduleInput`] and become a `Schedule` only through
//! [`ScheduleInput::validate`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{PinId, MAX_ZONE_MINUTES};

/// Longest accepted schedule id.
const MAX_ID_LEN: usize = 64;

/// Longest accepted display name.
const MAX_NAME_LEN: usize = 120;

// ---------------------------------------------------------------------------
// Day
// ---------------------------------------------------------------------------

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    /// Canonical three-letter name.
    pub fn as_str(self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
            Day::Sat => "Sat",
            Day::Sun => "Sun",
        }
    }

    fn full_name(self) -> &'static str {
        match self {
            Day::Mon => "monday",
            Day::Tue => "tuesday",
            Day::Wed => "wednesday",
            Day::Thu => "thursday",
            Day::Fri => "friday",
            Day::Sat => "saturday",
            Day::Sun => "sunday",
        }
    }

    /// Parse a day token case-insensitively.
    ///
    /// Accepts the three-letter abbreviation (`"mon"`, `"MON"`) or the full
    /// English name (`"Monday"`).
    pub fn parse(token: &str) -> Result<Day, CoreError> {
        let lower = token.trim().to_ascii_lowercase();
        Day::ALL
            .into_iter()
            .find(|day| lower == day.as_str().to_ascii_lowercase() || lower == day.full_name())
            .ok_or_else(|| CoreError::Validation(format!("unknown day '{}'", token.trim())))
    }
}

impl From<chrono::Weekday> for Day {
    fn from(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Day::Mon,
            chrono::Weekday::Tue => Day::Tue,
            chrono::Weekday::Wed => Day::Wed,
            chrono::Weekday::Thu => Day::Thu,
            chrono::Weekday::Fri => Day::Fri,
            chrono::Weekday::Sat => Day::Sat,
            chrono::Weekday::Sun => Day::Sun,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a list of day tokens into a deduplicated, ordered set.
///
/// An empty list is legal and yields a schedule that never runs.
pub fn normalize_days<S: AsRef<str>>(tokens: &[S]) -> Result<BTreeSet<Day>, CoreError> {
    tokens.iter().map(|t| Day::parse(t.as_ref())).collect()
}

// ---------------------------------------------------------------------------
// StartTime
// ---------------------------------------------------------------------------

/// Local time of day at which a schedule fires, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StartTime {
    hour: u8,
    minute: u8,
}

impl StartTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, CoreError> {
        if hour > 23 {
            return Err(CoreError::Validation(format!(
                "start_time hour must be 0-23, got {hour}"
            )));
        }
        if minute > 59 {
            return Err(CoreError::Validation(format!(
                "start_time minute must be 0-59, got {minute}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn as_naive_time(self) -> chrono::NaiveTime {
        chrono::NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(chrono::NaiveTime::MIN)
    }
}

impl FromStr for StartTime {
    type Err = CoreError;

    /// Strict `HH:MM`: both fields exactly two digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Validation(format!("start_time must be HH:MM, got '{s}'"));

        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(hour) || !all_digits(minute) || hour.len() != 2 || minute.len() != 2 {
            return Err(invalid());
        }

        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        StartTime::new(hour, minute)
    }
}

impl TryFrom<String> for StartTime {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StartTime> for String {
    fn from(value: StartTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// One zone activation inside a schedule run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStep {
    pub pin: PinId,
    #[serde(rename = "duration", alias = "duration_minutes")]
    pub duration_minutes: u32,
}

/// A validated, normalized watering schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start_time: StartTime,
    #[serde(default)]
    pub days: BTreeSet<Day>,
    pub enabled: bool,
    #[serde(default)]
    pub sequence: Vec<ScheduleStep>,
    /// Flat run length used when `sequence` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl Schedule {
    /// Total minutes of watering a full run represents.
    pub fn resolved_duration(&self) -> u32 {
        if self.sequence.is_empty() {
            self.duration.unwrap_or(0)
        } else {
            self.sequence.iter().map(|s| s.duration_minutes).sum()
        }
    }

    /// Steps a run executes, in order.
    ///
    /// A step-less schedule becomes one step on `first_pin` for the flat
    /// `duration`. Returns an empty list when neither is available.
    pub fn resolved_steps(&self, first_pin: Option<PinId>) -> Vec<ScheduleStep> {
        if !self.sequence.is_empty() {
            return self.sequence.clone();
        }
        match (first_pin, self.duration) {
            (Some(pin), Some(minutes)) if minutes > 0 => vec![ScheduleStep {
                pin,
                duration_minutes: minutes,
            }],
            _ => Vec::new(),
        }
    }

    pub fn runs_on(&self, day: Day) -> bool {
        self.days.contains(&day)
    }
}

// ---------------------------------------------------------------------------
// Input + validation
// ---------------------------------------------------------------------------

/// Raw step as received from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct StepInput {
    pub pin: i64,
    #[serde(alias = "duration_minutes")]
    pub duration: i64,
}

/// Raw schedule payload as received from a client.
///
/// Numeric fields are wide signed integers so out-of-range values surface
/// as validation errors instead of deserialization failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub start_time: String,
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub sequence: Vec<StepInput>,
    #[serde(default)]
    pub duration: Option<i64>,
}

fn default_enabled() -> bool {
    true
}

impl ScheduleInput {
    /// Validate and normalize against the configured pin set.
    ///
    /// A missing id is replaced by a freshly generated UUID.
    pub fn validate(self, pins: &[PinId]) -> Result<Schedule, CoreError> {
        let id = match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => validate_id(id)?,
            _ => uuid::Uuid::now_v7().to_string(),
        };

        let name = match self.name.as_deref().map(str::trim) {
            Some(n) if n.chars().count() > MAX_NAME_LEN => {
                return Err(CoreError::Validation(format!(
                    "name must be at most {MAX_NAME_LEN} characters"
                )));
            }
            Some(n) if !n.is_empty() => Some(n.to_string()),
            _ => None,
        };

        let start_time: StartTime = self.start_time.trim().parse()?;
        let days = normalize_days(&self.days)?;

        let sequence = self
            .sequence
            .iter()
            .enumerate()
            .map(|(idx, step)| validate_step(idx, step, pins))
            .collect::<Result<Vec<_>, _>>()?;

        let duration = match self.duration {
            None => None,
            Some(minutes) => Some(validate_minutes("duration", minutes)?),
        };

        if sequence.is_empty() && duration.is_none() {
            return Err(CoreError::Validation(
                "schedule needs a non-empty sequence or a positive duration".to_string(),
            ));
        }
        if sequence.is_empty() && pins.is_empty() {
            return Err(CoreError::Validation(
                "a flat duration needs at least one configured pin".to_string(),
            ));
        }

        Ok(Schedule {
            id,
            name,
            start_time,
            days,
            enabled: self.enabled,
            sequence,
            duration,
        })
    }
}

fn validate_id(id: &str) -> Result<String, CoreError> {
    if id.len() > MAX_ID_LEN {
        return Err(CoreError::Validation(format!(
            "id must be at most {MAX_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(CoreError::Validation(format!(
            "id '{id}' may only contain letters, digits, '-', '_' and '.'"
        )));
    }
    Ok(id.to_string())
}

fn validate_step(idx: usize, step: &StepInput, pins: &[PinId]) -> Result<ScheduleStep, CoreError> {
    let pin = PinId::try_from(step.pin)
        .ok()
        .filter(|p| pins.contains(p))
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "sequence[{idx}]: pin {} is not a configured pin",
                step.pin
            ))
        })?;
    let duration_minutes = validate_minutes(&format!("sequence[{idx}].duration"), step.duration)?;
    Ok(ScheduleStep {
        pin,
        duration_minutes,
    })
}

fn validate_minutes(field: &str, minutes: i64) -> Result<u32, CoreError> {
    u32::try_from(minutes)
        .ok()
        .filter(|m| (1..=MAX_ZONE_MINUTES).contains(m))
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "{field} must be between 1 and {MAX_ZONE_MINUTES} minutes, got {minutes}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PINS: [PinId; 2] = [12, 16];

    fn input(json: serde_json::Value) -> ScheduleInput {
        serde_json::from_value(json).unwrap()
    }

    // -----------------------------------------------------------------------
    // StartTime
    // -----------------------------------------------------------------------

    #[test]
    fn start_time_requires_two_digit_hour() {
        assert_matches!("6:05".parse::<StartTime>(), Err(CoreError::Validation(_)));
        assert_eq!("06:05".parse::<StartTime>().unwrap().to_string(), "06:05");
    }

    #[test]
    fn start_time_accepts_bounds() {
        assert_eq!("00:00".parse::<StartTime>().unwrap().to_string(), "00:00");
        assert_eq!("23:59".parse::<StartTime>().unwrap().to_string(), "23:59");
    }

    #[test]
    fn start_time_rejects_out_of_range() {
        assert_matches!("24:00".parse::<StartTime>(), Err(CoreError::Validation(_)));
        assert_matches!("12:60".parse::<StartTime>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn start_time_rejects_malformed() {
        for raw in ["", "6", "06:5", "06-00", "006:00", "06:00:00", " 6:00", "+6:00", "ab:cd"] {
            assert!(raw.parse::<StartTime>().is_err(), "accepted '{raw}'");
        }
    }

    // -----------------------------------------------------------------------
    // Days
    // -----------------------------------------------------------------------

    #[test]
    fn days_are_case_insensitive_and_deduplicated() {
        let days = normalize_days(&["sun", "MON", "Mon", "monday", "Wed"]).unwrap();
        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![Day::Mon, Day::Wed, Day::Sun]);
    }

    #[test]
    fn unknown_day_is_rejected() {
        assert_matches!(normalize_days(&["Mon", "Funday"]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn empty_days_are_legal() {
        assert!(normalize_days::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn day_from_chrono_weekday() {
        assert_eq!(Day::from(chrono::Weekday::Thu), Day::Thu);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn validate_normalizes_schedule() {
        let schedule = input(serde_json::json!({
            "id": "A",
            "name": "  Front lawn ",
            "start_time": "06:00",
            "days": ["tue", "Mon", "TUE"],
            "sequence": [{"pin": 12, "duration": 10}, {"pin": 16, "duration": 5}]
        }))
        .validate(&PINS)
        .unwrap();

        assert_eq!(schedule.id, "A");
        assert_eq!(schedule.name.as_deref(), Some("Front lawn"));
        assert_eq!(schedule.start_time.to_string(), "06:00");
        assert_eq!(schedule.days.iter().copied().collect::<Vec<_>>(), vec![Day::Mon, Day::Tue]);
        assert!(schedule.enabled);
        assert_eq!(schedule.resolved_duration(), 15);
    }

    #[test]
    fn validate_generates_missing_id() {
        let schedule = input(serde_json::json!({
            "start_time": "07:30",
            "duration": 20
        }))
        .validate(&PINS)
        .unwrap();

        assert!(!schedule.id.is_empty());
        assert_eq!(schedule.resolved_duration(), 20);
    }

    #[test]
    fn validate_rejects_schedule_without_work() {
        let result = input(serde_json::json!({"id": "A", "start_time": "06:00"})).validate(&PINS);
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn validate_rejects_unknown_pin() {
        let result = input(serde_json::json!({
            "id": "A",
            "start_time": "06:00",
            "sequence": [{"pin": 5, "duration": 10}]
        }))
        .validate(&PINS);
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("pin 5"));
    }

    #[test]
    fn validate_rejects_step_duration_out_of_range() {
        for minutes in [0, -3, 721] {
            let result = input(serde_json::json!({
                "id": "A",
                "start_time": "06:00",
                "sequence": [{"pin": 12, "duration": minutes}]
            }))
            .validate(&PINS);
            assert_matches!(result, Err(CoreError::Validation(_)), "accepted {minutes}");
        }
    }

    #[test]
    fn validate_rejects_bad_id() {
        let result = input(serde_json::json!({
            "id": "front lawn/1",
            "start_time": "06:00",
            "duration": 5
        }))
        .validate(&PINS);
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn flat_duration_resolves_to_first_pin() {
        let schedule = input(serde_json::json!({
            "id": "flat",
            "start_time": "05:00",
            "days": ["Sat"],
            "duration": 25
        }))
        .validate(&PINS)
        .unwrap();

        assert_eq!(
            schedule.resolved_steps(PINS.first().copied()),
            vec![ScheduleStep {
                pin: 12,
                duration_minutes: 25
            }]
        );
    }

    #[test]
    fn sequence_takes_precedence_over_duration() {
        let schedule = input(serde_json::json!({
            "id": "both",
            "start_time": "05:00",
            "duration": 99,
            "sequence": [{"pin": 16, "duration": 4}]
        }))
        .validate(&PINS)
        .unwrap();

        assert_eq!(schedule.resolved_duration(), 4);
        assert_eq!(schedule.resolved_steps(Some(12)).len(), 1);
        assert_eq!(schedule.resolved_steps(Some(12))[0].pin, 16);
    }

    #[test]
    fn stored_form_round_trips_through_json() {
        let schedule = input(serde_json::json!({
            "id": "A",
            "start_time": "06:00",
            "days": ["wed", "mon"],
            "sequence": [{"pin": 12, "duration": 10}]
        }))
        .validate(&PINS)
        .unwrap();

        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["start_time"], "06:00");
        assert_eq!(json["days"], serde_json::json!(["Mon", "Wed"]));
        assert_eq!(json["sequence"][0]["duration"], 10);

        let back: Schedule = serde_json::from_value(json).unwrap();
        assert_eq!(back, schedule);
    }
}
