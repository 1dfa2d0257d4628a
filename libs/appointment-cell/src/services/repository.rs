use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, Billing, NewAppointment, PaymentStatus,
    ScheduledInterval,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Interval overlaps an existing appointment")]
    Overlap,

    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Appointment {id} is no longer {expected}")]
    StatusChanged { id: Uuid, expected: AppointmentStatus },

    #[error("Database error: {0}")]
    Database(String),
}

/// Persistence for appointments and their billing rows.
///
/// Every write that has a guard (no overlap, expected current status) must
/// evaluate the guard and apply the write as one atomic step.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Inserts the appointment and its PENDING billing together. Fails with
    /// `Overlap` if another non-cancelled appointment of the same doctor
    /// intersects the interval.
    async fn create_with_billing(
        &self,
        new_appointment: NewAppointment,
    ) -> Result<(Appointment, Billing), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError>;

    /// Ordered by `start_time`.
    async fn find_many(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError>;

    /// Ignores `limit`/`offset`.
    async fn count(&self, filter: &AppointmentFilter) -> Result<i64, RepositoryError>;

    /// UPCOMING or ON_GOING appointments that end at `now`, or start
    /// exactly at one of `reminder_starts`.
    async fn find_due_for_sweep(
        &self,
        now: DateTime<Utc>,
        reminder_starts: &[DateTime<Utc>],
    ) -> Result<Vec<Appointment>, RepositoryError>;

    /// Compare-and-set on status. Returns `false` when the row was not in
    /// `from` any more.
    async fn transition_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> Result<bool, RepositoryError>;

    /// Moves an UPCOMING appointment, rejecting overlaps with other
    /// appointments of the same doctor.
    async fn reschedule(&self, id: Uuid, interval: ScheduledInterval) -> Result<Appointment, RepositoryError>;

    async fn update_notes(&self, id: Uuid, notes: Option<String>) -> Result<Appointment, RepositoryError>;

    /// Updates the appointment's payment status and its billing row together.
    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Appointment, RepositoryError>;

    async fn find_billing(&self, appointment_id: Uuid) -> Result<Option<Billing>, RepositoryError>;
}
