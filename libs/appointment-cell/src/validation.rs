// libs/appointment-cell/src/validation.rs
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use uuid::Uuid;

use shared_utils::time::{minutes_to_time, time_to_minutes};

use crate::models::{
    BookAppointmentRequest, FieldError, PatientSnapshot, UpdateAppointmentRequest,
};

#[derive(Debug, Clone)]
pub struct AppointmentValidationRules {
    pub max_notes_length: usize,
    pub max_cancellation_reason_length: usize,
}

impl Default for AppointmentValidationRules {
    fn default() -> Self {
        Self {
            max_notes_length: 1000,
            max_cancellation_reason_length: 500,
        }
    }
}

/// Who the appointment is for: a registered patient or a walk-in captured
/// by staff.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientRef {
    Registered(Uuid),
    WalkIn(PatientSnapshot),
}

/// Local wall-clock interval in minutes of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalInterval {
    pub date: NaiveDate,
    pub start_minutes: i32,
    pub end_minutes: i32,
}

impl LocalInterval {
    pub fn start_label(&self) -> String {
        minutes_to_time(self.start_minutes)
    }

    pub fn end_label(&self) -> String {
        minutes_to_time(self.end_minutes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub patient: PatientRef,
    pub doctor_service_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub interval: LocalInterval,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpdate {
    pub interval: Option<LocalInterval>,
    pub notes: Option<String>,
}

fn time_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").ok()).as_ref()
}

fn phone_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 .()-]{5,19}$").ok()).as_ref()
}

fn parse_date(field: &str, raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    let Some(raw) = raw else {
        errors.push(FieldError::new(field, "is required"));
        return None;
    };

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError::new(field, format!("'{}' is not a YYYY-MM-DD date", raw)));
            None
        }
    }
}

/// Parses `"HH:mm"` and canonicalizes it through the minute representation,
/// so `"9:05"` and `"09:05"` land on the same value.
fn parse_time(field: &str, raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<i32> {
    let Some(raw) = raw else {
        errors.push(FieldError::new(field, "is required"));
        return None;
    };

    let in_range = time_pattern()
        .and_then(|pattern| pattern.captures(raw))
        .and_then(|caps| {
            let hours: i32 = caps.get(1)?.as_str().parse().ok()?;
            let minutes: i32 = caps.get(2)?.as_str().parse().ok()?;
            Some(hours < 24 && minutes < 60)
        });

    match in_range {
        None => {
            errors.push(FieldError::new(field, format!("'{}' is not a HH:mm time", raw)));
            None
        }
        Some(false) => {
            errors.push(FieldError::new(field, format!("'{}' is outside 00:00-23:59", raw)));
            None
        }
        Some(true) => match time_to_minutes(raw) {
            Ok(minutes) => Some(minutes),
            Err(e) => {
                errors.push(FieldError::new(field, e.to_string()));
                None
            }
        },
    }
}

fn validate_notes(notes: Option<&String>, rules: &AppointmentValidationRules, errors: &mut Vec<FieldError>) -> Option<String> {
    let notes = notes.map(|n| n.trim()).filter(|n| !n.is_empty())?;
    if notes.chars().count() > rules.max_notes_length {
        errors.push(FieldError::new(
            "notes",
            format!("must be at most {} characters", rules.max_notes_length),
        ));
        return None;
    }
    Some(notes.to_string())
}

fn validate_snapshot(snapshot: &PatientSnapshot, errors: &mut Vec<FieldError>) {
    if snapshot.full_name.trim().is_empty() {
        errors.push(FieldError::new("patient.full_name", "is required"));
    }

    if let Some(phone) = &snapshot.phone {
        if !phone_pattern().is_some_and(|pattern| pattern.is_match(phone.trim())) {
            errors.push(FieldError::new("patient.phone", format!("'{}' is not a phone number", phone)));
        }
    }
}

impl BookAppointmentRequest {
    /// Collects every field problem at once rather than stopping at the
    /// first.
    pub fn validate(&self, rules: &AppointmentValidationRules) -> Result<ValidatedBooking, Vec<FieldError>> {
        let mut errors = Vec::new();

        let patient = match (self.patient_id, &self.patient) {
            (Some(_), Some(_)) => {
                errors.push(FieldError::new("patient", "provide either patient_id or patient, not both"));
                None
            }
            (Some(id), None) => Some(PatientRef::Registered(id)),
            (None, Some(snapshot)) => {
                validate_snapshot(snapshot, &mut errors);
                Some(PatientRef::WalkIn(snapshot.clone()))
            }
            (None, None) => {
                errors.push(FieldError::new("patient_id", "is required when no walk-in patient is given"));
                None
            }
        };

        if self.doctor_service_id.is_none() {
            errors.push(FieldError::new("doctor_service_id", "is required"));
        }

        let date = parse_date("date", self.date.as_deref(), &mut errors);
        let start_minutes = parse_time("start_time", self.start_time.as_deref(), &mut errors);
        let end_minutes = parse_time("end_time", self.end_time.as_deref(), &mut errors);
        let notes = validate_notes(self.notes.as_ref(), rules, &mut errors);

        match (patient, self.doctor_service_id, date, start_minutes, end_minutes) {
            (Some(patient), Some(doctor_service_id), Some(date), Some(start_minutes), Some(end_minutes))
                if errors.is_empty() =>
            {
                Ok(ValidatedBooking {
                    patient,
                    doctor_service_id,
                    clinic_id: self.clinic_id,
                    interval: LocalInterval { date, start_minutes, end_minutes },
                    notes,
                })
            }
            _ => Err(errors),
        }
    }
}

impl UpdateAppointmentRequest {
    /// A reschedule needs both times; the date falls back to
    /// `current_date` when omitted.
    pub fn validate(
        &self,
        current_date: NaiveDate,
        rules: &AppointmentValidationRules,
    ) -> Result<ValidatedUpdate, Vec<FieldError>> {
        let mut errors = Vec::new();

        let wants_reschedule = self.date.is_some() || self.start_time.is_some() || self.end_time.is_some();

        let interval = if wants_reschedule {
            let date = match self.date.as_deref() {
                Some(raw) => parse_date("date", Some(raw), &mut errors),
                None => Some(current_date),
            };
            let start_minutes = parse_time("start_time", self.start_time.as_deref(), &mut errors);
            let end_minutes = parse_time("end_time", self.end_time.as_deref(), &mut errors);

            match (date, start_minutes, end_minutes) {
                (Some(date), Some(start_minutes), Some(end_minutes)) => {
                    Some(LocalInterval { date, start_minutes, end_minutes })
                }
                _ => None,
            }
        } else {
            None
        };

        let notes = validate_notes(self.notes.as_ref(), rules, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        if interval.is_none() && notes.is_none() {
            return Err(vec![FieldError::new("body", "nothing to update")]);
        }

        Ok(ValidatedUpdate { interval, notes })
    }
}
