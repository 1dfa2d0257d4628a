// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient: Option<PatientSnapshot>,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub doctor_service_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Half-open overlap on `[start_time, end_time)`.
    pub fn overlaps(&self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> bool {
        self.start_time < end_time && self.end_time > start_time
    }

    pub fn blocks_schedule(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

/// Walk-in patient details captured by staff instead of a patient profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSnapshot {
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Upcoming,
    OnGoing,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Upcoming => write!(f, "UPCOMING"),
            AppointmentStatus::OnGoing => write!(f, "ON_GOING"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Upcoming, AppointmentStatus::OnGoing)
                | (AppointmentStatus::Upcoming, AppointmentStatus::Cancelled)
                | (AppointmentStatus::OnGoing, AppointmentStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

impl PaymentStatus {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid) | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Billing {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub amount: f64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithBilling {
    pub appointment: Appointment,
    pub billing: Billing,
}

/// A fully validated booking, ready to be written together with its billing
/// row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: Option<Uuid>,
    pub patient: Option<PatientSnapshot>,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub doctor_service_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub amount: f64,
}

impl NewAppointment {
    pub fn into_records(self, now: DateTime<Utc>) -> (Appointment, Billing) {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: self.patient_id,
            patient: self.patient,
            doctor_id: self.doctor_id,
            service_id: self.service_id,
            doctor_service_id: self.doctor_service_id,
            clinic_id: self.clinic_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: AppointmentStatus::Upcoming,
            payment_status: PaymentStatus::Pending,
            notes: self.notes,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        let billing = Billing {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            amount: self.amount,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        (appointment, billing)
    }
}

/// New interval for an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledInterval {
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Raw create payload. Every field is optional at this layer so missing
/// values are reported per field by `validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub patient: Option<PatientSnapshot>,
    pub doctor_service_id: Option<Uuid>,
    pub clinic_id: Option<Uuid>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
    pub requested_by: Option<RequestedBy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
    pub cancelled_by: Option<RequestedBy>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestedBy {
    Patient,
    #[default]
    Staff,
    System,
}

impl RequestedBy {
    /// Patients may not cancel or reschedule inside the late-change window.
    pub fn is_bound_by_late_change_window(&self) -> bool {
        matches!(self, RequestedBy::Patient)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpdateRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub clinic_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == Some(id))
            && self.clinic_id.map_or(true, |id| appointment.clinic_id == Some(id))
            && self.status.map_or(true, |status| appointment.status == status)
            && self.payment_status.map_or(true, |status| appointment.payment_status == status)
            && self.from_date.map_or(true, |from| appointment.date >= from)
            && self.to_date.map_or(true, |to| appointment.date <= to)
    }

    pub fn with_status(&self, status: AppointmentStatus) -> Self {
        Self { status: Some(status), ..self.clone() }
    }

    pub fn with_payment_status(&self, payment_status: PaymentStatus) -> Self {
        Self { payment_status: Some(payment_status), ..self.clone() }
    }
}

// ==============================================================================
// STATISTICS MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentStatistics {
    pub total: i64,
    pub upcoming: i64,
    pub on_going: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub payment_pending: i64,
    pub paid: i64,
    pub refunded: i64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Appointment cannot start in the past")]
    PastStartTime,

    #[error("Appointment must last {expected} minutes for this service, got {actual}")]
    DurationMismatch { expected: i64, actual: i64 },

    #[error("Appointment slot no longer available")]
    SlotNoLongerAvailable,

    #[error("Appointment can no longer be changed within 4 hours of its start")]
    TooLateToModify,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Payment cannot move from {from} to {to}")]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
