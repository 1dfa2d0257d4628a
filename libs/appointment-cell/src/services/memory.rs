use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::{BookedInterval, DoctorError, DoctorService};
use doctor_cell::services::DoctorServiceStore;
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, Billing, NewAppointment, PaymentStatus,
    ScheduledInterval,
};
use crate::services::repository::{AppointmentRepository, RepositoryError};

#[derive(Default)]
struct StoreState {
    appointments: HashMap<Uuid, Appointment>,
    billings: HashMap<Uuid, Billing>,
    doctor_services: HashMap<Uuid, DoctorService>,
}

impl StoreState {
    fn has_overlap(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> bool {
        self.appointments.values().any(|apt| {
            apt.doctor_id == doctor_id
                && Some(apt.id) != exclude_id
                && apt.blocks_schedule()
                && apt.overlaps(start_time, end_time)
        })
    }

    fn appointment_mut(&mut self, id: Uuid) -> Result<&mut Appointment, RepositoryError> {
        self.appointments.get_mut(&id).ok_or(RepositoryError::NotFound(id))
    }
}

/// Process-local store used when no database is configured and in tests.
///
/// A single lock covers every table, so each guarded write is atomic with
/// respect to concurrent requests.
pub struct InMemoryAppointmentStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryAppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    pub async fn insert_doctor_service(&self, doctor_service: DoctorService) {
        let mut state = self.state.lock().await;
        state.doctor_services.insert(doctor_service.id, doctor_service);
    }

    /// Seeds a row as-is, bypassing overlap checks.
    pub async fn insert_appointment(&self, appointment: Appointment) {
        let mut state = self.state.lock().await;
        state.appointments.insert(appointment.id, appointment);
    }

    pub async fn appointment_count(&self) -> usize {
        self.state.lock().await.appointments.len()
    }

    pub async fn billing_count(&self) -> usize {
        self.state.lock().await.billings.len()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentStore {
    async fn create_with_billing(
        &self,
        new_appointment: NewAppointment,
    ) -> Result<(Appointment, Billing), RepositoryError> {
        let mut state = self.state.lock().await;

        if state.has_overlap(
            new_appointment.doctor_id,
            new_appointment.start_time,
            new_appointment.end_time,
            None,
        ) {
            return Err(RepositoryError::Overlap);
        }

        let (appointment, billing) = new_appointment.into_records(self.clock.now());
        state.billings.insert(appointment.id, billing.clone());
        state.appointments.insert(appointment.id, appointment.clone());

        debug!("Stored appointment {} with billing {}", appointment.id, billing.id);
        Ok((appointment, billing))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError> {
        Ok(self.state.lock().await.appointments.get(&id).cloned())
    }

    async fn find_many(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError> {
        let state = self.state.lock().await;

        let mut appointments: Vec<Appointment> = state.appointments
            .values()
            .filter(|apt| filter.matches(apt))
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| (apt.start_time, apt.id));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(appointments.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &AppointmentFilter) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.appointments.values().filter(|apt| filter.matches(apt)).count() as i64)
    }

    async fn find_due_for_sweep(
        &self,
        now: DateTime<Utc>,
        reminder_starts: &[DateTime<Utc>],
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let state = self.state.lock().await;

        Ok(state.appointments
            .values()
            .filter(|apt| matches!(apt.status, AppointmentStatus::Upcoming | AppointmentStatus::OnGoing))
            .filter(|apt| apt.end_time == now || reminder_starts.contains(&apt.start_time))
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let appointment = state.appointment_mut(id)?;

        if appointment.status != from {
            return Ok(false);
        }

        appointment.status = to;
        if to == AppointmentStatus::Cancelled {
            appointment.cancellation_reason = cancellation_reason;
        }
        appointment.updated_at = now;

        Ok(true)
    }

    async fn reschedule(&self, id: Uuid, interval: ScheduledInterval) -> Result<Appointment, RepositoryError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let doctor_id = match state.appointments.get(&id) {
            Some(apt) if apt.status == AppointmentStatus::Upcoming => apt.doctor_id,
            Some(_) => return Err(RepositoryError::StatusChanged { id, expected: AppointmentStatus::Upcoming }),
            None => return Err(RepositoryError::NotFound(id)),
        };

        if state.has_overlap(doctor_id, interval.start_time, interval.end_time, Some(id)) {
            return Err(RepositoryError::Overlap);
        }

        let appointment = state.appointment_mut(id)?;
        appointment.date = interval.date;
        appointment.start_time = interval.start_time;
        appointment.end_time = interval.end_time;
        appointment.updated_at = now;

        Ok(appointment.clone())
    }

    async fn update_notes(&self, id: Uuid, notes: Option<String>) -> Result<Appointment, RepositoryError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let appointment = state.appointment_mut(id)?;

        appointment.notes = notes;
        appointment.updated_at = now;

        Ok(appointment.clone())
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Appointment, RepositoryError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        if let Some(billing) = state.billings.get_mut(&id) {
            billing.status = status;
            billing.updated_at = now;
        }

        let appointment = state.appointment_mut(id)?;
        appointment.payment_status = status;
        appointment.updated_at = now;

        Ok(appointment.clone())
    }

    async fn find_billing(&self, appointment_id: Uuid) -> Result<Option<Billing>, RepositoryError> {
        Ok(self.state.lock().await.billings.get(&appointment_id).cloned())
    }
}

#[async_trait]
impl DoctorServiceStore for InMemoryAppointmentStore {
    async fn find_doctor_service(&self, id: Uuid) -> Result<Option<DoctorService>, DoctorError> {
        Ok(self.state.lock().await.doctor_services.get(&id).cloned())
    }

    async fn find_booked_intervals(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<BookedInterval>, DoctorError> {
        let state = self.state.lock().await;

        let mut booked: Vec<BookedInterval> = state.appointments
            .values()
            .filter(|apt| apt.doctor_id == doctor_id && apt.date == date && apt.blocks_schedule())
            .filter(|apt| Some(apt.id) != exclude_appointment_id)
            .map(|apt| BookedInterval {
                appointment_id: apt.id,
                start_time: apt.start_time,
                end_time: apt.end_time,
            })
            .collect();
        booked.sort_by_key(|b| b.start_time);

        Ok(booked)
    }
}
