// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::models::{DoctorError, DoctorService};
use doctor_cell::services::AvailabilityService;
use shared_utils::clock::Clock;
use shared_utils::time::{is_less_than_four_hours, local_to_utc};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, AppointmentWithBilling,
    BookAppointmentRequest, CancelAppointmentRequest, FieldError, NewAppointment, PaymentStatus,
    RequestedBy, ScheduledInterval, UpdateAppointmentRequest,
};
use crate::services::repository::{AppointmentRepository, RepositoryError};
use crate::validation::{AppointmentValidationRules, LocalInterval, PatientRef};

pub struct AppointmentBookingService {
    repository: Arc<dyn AppointmentRepository>,
    availability: Arc<AvailabilityService>,
    clock: Arc<dyn Clock>,
    validation_rules: AppointmentValidationRules,
}

impl From<RepositoryError> for AppointmentError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Overlap => AppointmentError::SlotNoLongerAvailable,
            RepositoryError::NotFound(id) => AppointmentError::NotFound(format!("Appointment {}", id)),
            RepositoryError::StatusChanged { expected, .. } => {
                AppointmentError::InvalidStatusTransition(expected)
            }
            RepositoryError::Database(msg) => AppointmentError::Internal(msg),
        }
    }
}

fn map_doctor_error(error: DoctorError) -> AppointmentError {
    match error {
        DoctorError::NotFound(id) => AppointmentError::NotFound(format!("Doctor service {}", id)),
        other => AppointmentError::Internal(other.to_string()),
    }
}

impl AppointmentBookingService {
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        availability: Arc<AvailabilityService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            availability,
            clock,
            validation_rules: AppointmentValidationRules::default(),
        }
    }

    pub fn with_validation_rules(mut self, rules: AppointmentValidationRules) -> Self {
        self.validation_rules = rules;
        self
    }

    /// Books an appointment and its billing row.
    ///
    /// Checks run in order: field validation, time ordering, not-in-past,
    /// service duration, then membership in the current open slots. The
    /// repository re-checks overlap atomically as it inserts.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<AppointmentWithBilling, AppointmentError> {
        // **Step 1**: Field validation
        let booking = request
            .validate(&self.validation_rules)
            .map_err(AppointmentError::Validation)?;

        info!(
            "Booking doctor service {} on {} {}-{}",
            booking.doctor_service_id,
            booking.interval.date,
            booking.interval.start_label(),
            booking.interval.end_label()
        );

        // **Step 2-5**: Interval checks against the doctor service
        let doctor_service = self.availability
            .get_doctor_service(booking.doctor_service_id)
            .await
            .map_err(map_doctor_error)?;

        let scheduled = self.check_interval(&doctor_service, booking.interval, None).await?;

        // **Step 6**: Atomic insert of appointment + billing
        let (patient_id, patient) = match booking.patient {
            PatientRef::Registered(id) => (Some(id), None),
            PatientRef::WalkIn(snapshot) => (None, Some(snapshot)),
        };

        let new_appointment = NewAppointment {
            patient_id,
            patient,
            doctor_id: doctor_service.doctor_id,
            service_id: doctor_service.service_id,
            doctor_service_id: doctor_service.id,
            clinic_id: booking.clinic_id,
            date: scheduled.date,
            start_time: scheduled.start_time,
            end_time: scheduled.end_time,
            notes: booking.notes,
            amount: doctor_service.price,
        };

        let (appointment, billing) = self.repository
            .create_with_billing(new_appointment)
            .await
            .map_err(|e| {
                match &e {
                    RepositoryError::Overlap => warn!("Lost booking race for doctor {}", doctor_service.doctor_id),
                    other => error!("Failed to persist appointment: {}", other),
                }
                AppointmentError::from(e)
            })?;

        info!("Appointment {} booked with billing {}", appointment.id, billing.id);
        Ok(AppointmentWithBilling { appointment, billing })
    }

    /// Reschedules and/or edits notes of an UPCOMING appointment.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        if current.status != AppointmentStatus::Upcoming {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let update = request
            .validate(current.date, &self.validation_rules)
            .map_err(AppointmentError::Validation)?;

        let requested_by = request.requested_by.unwrap_or_default();
        let mut updated = current.clone();

        if let Some(interval) = update.interval {
            self.ensure_outside_late_window(&current, requested_by)?;

            let doctor_service = self.availability
                .get_doctor_service(current.doctor_service_id)
                .await
                .map_err(map_doctor_error)?;

            let scheduled = self.check_interval(&doctor_service, interval, Some(current.id)).await?;
            updated = self.repository.reschedule(current.id, scheduled).await?;

            info!(
                "Appointment {} rescheduled to {} {}-{}",
                current.id,
                interval.date,
                interval.start_label(),
                interval.end_label()
            );
        }

        if let Some(notes) = update.notes {
            updated = self.repository.update_notes(current.id, Some(notes)).await?;
            debug!("Notes updated for appointment {}", current.id);
        }

        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        if current.status != AppointmentStatus::Upcoming {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let reason = request.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if reason.as_ref().is_some_and(|r| r.chars().count() > self.validation_rules.max_cancellation_reason_length) {
            return Err(AppointmentError::Validation(vec![FieldError::new(
                "reason",
                format!("must be at most {} characters", self.validation_rules.max_cancellation_reason_length),
            )]));
        }

        let cancelled_by = request.cancelled_by.unwrap_or_default();
        self.ensure_outside_late_window(&current, cancelled_by)?;

        self.apply_transition(&current, AppointmentStatus::Cancelled, reason).await
    }

    /// Patient arrival: UPCOMING to ON_GOING.
    pub async fn check_in(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        if !current.status.can_transition_to(AppointmentStatus::OnGoing) {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        self.apply_transition(&current, AppointmentStatus::OnGoing, None).await
    }

    pub async fn record_payment(
        &self,
        appointment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        let payable = status != PaymentStatus::Paid || current.status != AppointmentStatus::Cancelled;
        if !current.payment_status.can_transition_to(status) || !payable {
            return Err(AppointmentError::InvalidPaymentTransition {
                from: current.payment_status,
                to: status,
            });
        }

        let updated = self.repository.update_payment_status(appointment_id, status).await?;
        info!("Appointment {} payment {} -> {}", appointment_id, current.payment_status, status);

        Ok(updated)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        self.repository
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))
    }

    pub async fn get_appointment_with_billing(
        &self,
        appointment_id: Uuid,
    ) -> Result<AppointmentWithBilling, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;
        let billing = self.repository
            .find_billing(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::Internal(format!("Appointment {} has no billing row", appointment_id)))?;

        Ok(AppointmentWithBilling { appointment, billing })
    }

    pub async fn search_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filter {:?}", filter);
        Ok(self.repository.find_many(&filter).await?)
    }

    // ==============================================================================
    // PRIVATE HELPERS
    // ==============================================================================

    /// Validates a clinic-local interval against `doctor_service` and the
    /// doctor's open slots, returning the UTC instants to persist.
    async fn check_interval(
        &self,
        doctor_service: &DoctorService,
        interval: LocalInterval,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ScheduledInterval, AppointmentError> {
        if interval.start_minutes >= interval.end_minutes {
            return Err(AppointmentError::InvalidTimeRange);
        }

        let offset = self.availability.timezone_offset_hours();
        let start_time = local_to_utc(interval.date, interval.start_minutes, offset);
        let end_time = local_to_utc(interval.date, interval.end_minutes, offset);

        if start_time < self.clock.now() {
            return Err(AppointmentError::PastStartTime);
        }

        let actual = (interval.end_minutes - interval.start_minutes) as i64;
        let expected = doctor_service.duration_minutes as i64;
        if actual != expected {
            return Err(AppointmentError::DurationMismatch { expected, actual });
        }

        let slots = self.availability
            .slots_for(doctor_service, interval.date, exclude_appointment_id)
            .await
            .map_err(map_doctor_error)?;

        let (start_label, end_label) = (interval.start_label(), interval.end_label());
        if !slots.iter().any(|slot| slot.matches(&start_label, &end_label)) {
            warn!(
                "Requested {}-{} on {} is not an open slot for doctor service {}",
                start_label, end_label, interval.date, doctor_service.id
            );
            return Err(AppointmentError::SlotNoLongerAvailable);
        }

        Ok(ScheduledInterval {
            date: interval.date,
            start_time,
            end_time,
        })
    }

    fn ensure_outside_late_window(
        &self,
        appointment: &Appointment,
        requested_by: RequestedBy,
    ) -> Result<(), AppointmentError> {
        if requested_by.is_bound_by_late_change_window()
            && is_less_than_four_hours(self.clock.now(), appointment.start_time)
        {
            warn!("Rejected late change to appointment {}", appointment.id);
            return Err(AppointmentError::TooLateToModify);
        }
        Ok(())
    }

    async fn apply_transition(
        &self,
        current: &Appointment,
        to: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let changed = self.repository
            .transition_status(current.id, current.status, to, reason)
            .await?;

        let latest = self.get_appointment(current.id).await?;
        if !changed {
            return Err(AppointmentError::InvalidStatusTransition(latest.status));
        }

        info!("Appointment {} moved {} -> {}", current.id, current.status, to);
        Ok(latest)
    }
}
