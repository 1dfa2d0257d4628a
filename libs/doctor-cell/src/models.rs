use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use thiserror::Error;

use shared_utils::time::{time_to_minutes, TimeError, MINUTES_PER_DAY};

/// A doctor offering one service, with that service's duration and the
/// doctor's weekly working hours for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorService {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub duration_minutes: i32,
    pub price: f64,
    #[serde(default)]
    pub working_hours: Vec<WorkingHours>,
}

impl DoctorService {
    /// Working-hour window configured for the weekday of `date`, if any.
    pub fn working_hours_for(&self, date: NaiveDate) -> Option<&WorkingHours> {
        let day_of_week = date.weekday().num_days_from_sunday() as i32;
        self.working_hours.iter().find(|hours| hours.day_of_week == day_of_week)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: String,
    pub end_time: String,
}

impl WorkingHours {
    pub fn new(day_of_week: i32, start_time: &str, end_time: &str) -> Self {
        Self {
            day_of_week,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
        }
    }

    /// Window as minute offsets. Postgres `time` columns come back as
    /// `HH:mm:ss`; whole-minute values are accepted in that form too.
    /// Both ends must be bookable clock times, so `24:00` is rejected.
    pub fn window_minutes(&self) -> Result<(i32, i32), DoctorError> {
        let start = clock_minutes(&self.start_time)?;
        let end = clock_minutes(&self.end_time)?;
        Ok((start, end))
    }
}

fn clock_minutes(raw: &str) -> Result<i32, DoctorError> {
    let hh_mm = strip_zero_seconds(raw);
    let minutes = time_to_minutes(hh_mm)?;
    let minute_of_hour = hh_mm.split(':').nth(1).and_then(|m| m.parse::<i32>().ok());

    if minutes >= MINUTES_PER_DAY || !matches!(minute_of_hour, Some(m) if m < 60) {
        return Err(DoctorError::InvalidWorkingHours(format!(
            "'{}' is not a time of day between 00:00 and 23:59",
            raw
        )));
    }

    Ok(minutes)
}

fn strip_zero_seconds(raw: &str) -> &str {
    match raw.strip_suffix(":00") {
        Some(hh_mm) if raw.len() == 8 => hh_mm,
        _ => raw,
    }
}

/// A bookable interval. Never persisted; recomputed on every query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
    pub display_time: String,
}

impl TimeSlot {
    pub fn matches(&self, start_time: &str, end_time: &str) -> bool {
        self.start_time == start_time && self.end_time == end_time
    }
}

/// An existing non-cancelled appointment as seen by the availability
/// calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookedInterval {
    #[serde(rename = "id")]
    pub appointment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub doctor_service_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: i32,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Error)]
pub enum DoctorError {
    #[error("Doctor service not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid working hours configured: {0}")]
    InvalidWorkingHours(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<TimeError> for DoctorError {
    fn from(err: TimeError) -> Self {
        DoctorError::InvalidWorkingHours(err.to_string())
    }
}
