use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::time::{date_to_minutes, minutes_to_time, MINUTES_PER_DAY};

use crate::models::{BookedInterval, DoctorError, DoctorService, TimeSlot};
use crate::services::store::DoctorServiceStore;

/// Half-open `[start, end)` range in clinic-local minutes of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteInterval {
    pub start: i32,
    pub end: i32,
}

impl MinuteInterval {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &MinuteInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Projects a booked appointment onto its local day. An end that wraps
    /// past midnight is clamped to 24:00.
    pub fn from_booked(booked: &BookedInterval, offset_hours: i32) -> Self {
        let start = date_to_minutes(booked.start_time, offset_hours);
        let mut end = date_to_minutes(booked.end_time, offset_hours);
        if end <= start {
            end = MINUTES_PER_DAY;
        }
        Self { start, end }
    }
}

/// Walks `[window_start, window_end)` in steps of `duration_minutes` and
/// returns every slot that fits inside the window and overlaps no booking.
pub fn compute_slots(
    window_start: i32,
    window_end: i32,
    duration_minutes: i32,
    booked: &[MinuteInterval],
) -> Vec<TimeSlot> {
    if duration_minutes <= 0 {
        warn!("Refusing to compute slots for non-positive duration {}", duration_minutes);
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut slot_start = window_start;

    while slot_start + duration_minutes <= window_end {
        let candidate = MinuteInterval::new(slot_start, slot_start + duration_minutes);

        if !booked.iter().any(|apt| candidate.overlaps(apt)) {
            let start_time = minutes_to_time(candidate.start);
            let end_time = minutes_to_time(candidate.end);
            slots.push(TimeSlot {
                display_time: format!("{} - {}", start_time, end_time),
                start_time,
                end_time,
            });
        }

        slot_start += duration_minutes;
    }

    slots
}

pub struct AvailabilityService {
    store: Arc<dyn DoctorServiceStore>,
    timezone_offset_hours: i32,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn DoctorServiceStore>, config: &AppConfig) -> Self {
        Self {
            store,
            timezone_offset_hours: config.timezone_offset_hours,
        }
    }

    pub fn timezone_offset_hours(&self) -> i32 {
        self.timezone_offset_hours
    }

    pub async fn get_doctor_service(&self, doctor_service_id: Uuid) -> Result<DoctorService, DoctorError> {
        self.store
            .find_doctor_service(doctor_service_id)
            .await?
            .ok_or(DoctorError::NotFound(doctor_service_id))
    }

    /// Open slots for a doctor service on `date`. Past dates are not
    /// rejected here.
    pub async fn get_available_slots(
        &self,
        doctor_service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, DoctorError> {
        let doctor_service = self.get_doctor_service(doctor_service_id).await?;
        self.slots_for(&doctor_service, date, None).await
    }

    pub async fn slots_for(
        &self,
        doctor_service: &DoctorService,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<TimeSlot>, DoctorError> {
        debug!("Calculating available slots for doctor service {} on {}", doctor_service.id, date);

        let Some(working_hours) = doctor_service.working_hours_for(date) else {
            debug!("No working hours for doctor service {} on {}", doctor_service.id, date);
            return Ok(Vec::new());
        };
        let (window_start, window_end) = working_hours.window_minutes()?;

        let booked: Vec<MinuteInterval> = self.store
            .find_booked_intervals(doctor_service.doctor_id, date, exclude_appointment_id)
            .await?
            .iter()
            .map(|apt| MinuteInterval::from_booked(apt, self.timezone_offset_hours))
            .collect();

        let slots = compute_slots(window_start, window_end, doctor_service.duration_minutes, &booked);

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }
}
