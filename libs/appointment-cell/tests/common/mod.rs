#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, PaymentStatus,
};
use appointment_cell::services::{AppointmentBookingService, InMemoryAppointmentStore};
use doctor_cell::models::{DoctorService, WorkingHours};
use doctor_cell::services::AvailabilityService;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{TestConfig, TimeFixtures};

pub const BOOKING_DATE: &str = "2025-03-10";

/// Monday morning clinic: 08:00-12:00, 30 minute visits, UTC clock.
pub struct Harness {
    pub store: Arc<InMemoryAppointmentStore>,
    pub clock: Arc<FixedClock>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<AppointmentBookingService>,
    pub doctor_service: DoctorService,
}

impl Harness {
    pub async fn new() -> Self {
        // Sunday noon, the day before the bookable morning
        let clock = TimeFixtures::clock_at(2025, 3, 9, 12, 0);
        let store = Arc::new(InMemoryAppointmentStore::with_clock(clock.clone()));

        let doctor_service = DoctorService {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            service_name: "General consultation".to_string(),
            duration_minutes: 30,
            price: 150_000.0,
            working_hours: vec![WorkingHours::new(1, "08:00", "12:00")],
        };
        store.insert_doctor_service(doctor_service.clone()).await;

        let config = TestConfig::default().to_app_config();
        let availability = Arc::new(AvailabilityService::new(store.clone(), &config));
        let booking = Arc::new(AppointmentBookingService::new(
            store.clone(),
            availability.clone(),
            clock.clone(),
        ));

        Self {
            store,
            clock,
            availability,
            booking,
            doctor_service,
        }
    }

    pub fn request(&self, start: &str, end: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: Some(Uuid::new_v4()),
            doctor_service_id: Some(self.doctor_service.id),
            date: Some(BOOKING_DATE.to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            ..Default::default()
        }
    }

    pub async fn book(&self, start: &str, end: &str) -> Appointment {
        self.booking
            .book_appointment(self.request(start, end))
            .await
            .expect("booking should succeed")
            .appointment
    }
}

pub fn seeded_appointment(
    doctor_id: Uuid,
    status: AppointmentStatus,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Some(Uuid::new_v4()),
        patient: None,
        doctor_id,
        service_id: Uuid::new_v4(),
        doctor_service_id: Uuid::new_v4(),
        clinic_id: None,
        date: start_time.date_naive(),
        start_time,
        end_time,
        status,
        payment_status: PaymentStatus::Pending,
        notes: None,
        cancellation_reason: None,
        created_at: start_time,
        updated_at: start_time,
    }
}
