// libs/doctor-cell/tests/availability_test.rs

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use doctor_cell::models::{BookedInterval, DoctorError, DoctorService, WorkingHours};
use doctor_cell::services::{AvailabilityService, DoctorServiceStore, SupabaseDoctorServiceStore};
use shared_database::supabase::SupabaseClient;
use shared_utils::test_utils::{TestConfig, TimeFixtures};

// ==============================================================================
// TEST FIXTURES
// ==============================================================================

struct StaticStore {
    services: Vec<DoctorService>,
    booked: Mutex<Vec<BookedInterval>>,
}

#[async_trait]
impl DoctorServiceStore for StaticStore {
    async fn find_doctor_service(&self, id: Uuid) -> Result<Option<DoctorService>, DoctorError> {
        Ok(self.services.iter().find(|s| s.id == id).cloned())
    }

    async fn find_booked_intervals(
        &self,
        _doctor_id: Uuid,
        _date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<BookedInterval>, DoctorError> {
        Ok(self.booked.lock().unwrap()
            .iter()
            .filter(|b| Some(b.appointment_id) != exclude_appointment_id)
            .cloned()
            .collect())
    }
}

fn monday() -> NaiveDate {
    TimeFixtures::date(2025, 3, 10)
}

fn morning_service(duration_minutes: i32) -> DoctorService {
    DoctorService {
        id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        service_name: "General consultation".to_string(),
        duration_minutes,
        price: 150_000.0,
        working_hours: vec![WorkingHours::new(1, "08:00", "12:00")],
    }
}

fn booked(start: (u32, u32), end: (u32, u32)) -> BookedInterval {
    BookedInterval {
        appointment_id: Uuid::new_v4(),
        start_time: TimeFixtures::utc(2025, 3, 10, start.0, start.1),
        end_time: TimeFixtures::utc(2025, 3, 10, end.0, end.1),
    }
}

fn service_with(service: &DoctorService, booked: Vec<BookedInterval>) -> AvailabilityService {
    let store = Arc::new(StaticStore {
        services: vec![service.clone()],
        booked: Mutex::new(booked),
    });
    AvailabilityService::new(store, &TestConfig::default().to_app_config())
}

fn starts(slots: &[doctor_cell::TimeSlot]) -> Vec<String> {
    slots.iter().map(|s| s.start_time.clone()).collect()
}

// ==============================================================================
// SLOT GENERATION
// ==============================================================================

#[tokio::test]
async fn test_full_morning_yields_eight_half_hour_slots() {
    let service = morning_service(30);
    let availability = service_with(&service, vec![]);

    let slots = availability.get_available_slots(service.id, monday()).await.unwrap();

    assert_eq!(
        starts(&slots),
        vec!["08:00", "08:30", "09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]
    );
    assert_eq!(slots.last().unwrap().end_time, "12:00");
}

#[tokio::test]
async fn test_slots_are_increasing_and_sized_to_duration() {
    let service = morning_service(45);
    let availability = service_with(&service, vec![booked((9, 0), (9, 30))]);

    let slots = availability.get_available_slots(service.id, monday()).await.unwrap();

    let mut previous = -1;
    for slot in &slots {
        let start = shared_utils::time::time_to_minutes(&slot.start_time).unwrap();
        let end = shared_utils::time::time_to_minutes(&slot.end_time).unwrap();
        assert!(start > previous);
        assert_eq!(end - start, 45);
        previous = start;
    }
}

#[tokio::test]
async fn test_touching_boundaries_stay_bookable() {
    let mut service = morning_service(90);
    service.working_hours = vec![WorkingHours::new(1, "07:00", "12:00")];
    let availability = service_with(&service, vec![booked((8, 0), (9, 30))]);

    // 90-minute grid from 07:00: 07:00, 08:30, 10:00 (11:30 would overrun)
    let slots = availability.get_available_slots(service.id, monday()).await.unwrap();
    assert_eq!(starts(&slots), vec!["10:00"]);

    let mut service = morning_service(60);
    service.working_hours = vec![WorkingHours::new(1, "07:00", "08:00")];
    let availability = service_with(&service, vec![booked((8, 0), (9, 30))]);
    let slots = availability.get_available_slots(service.id, monday()).await.unwrap();
    assert_eq!(starts(&slots), vec!["07:00"]);

    let mut service = morning_service(90);
    service.working_hours = vec![WorkingHours::new(1, "09:30", "11:00")];
    let availability = service_with(&service, vec![booked((8, 0), (9, 30))]);
    let slots = availability.get_available_slots(service.id, monday()).await.unwrap();
    assert_eq!(starts(&slots), vec!["09:30"]);

    let mut service = morning_service(90);
    service.working_hours = vec![WorkingHours::new(1, "09:00", "10:30")];
    let availability = service_with(&service, vec![booked((8, 0), (9, 30))]);
    let slots = availability.get_available_slots(service.id, monday()).await.unwrap();
    assert!(slots.is_empty());
}

#[tokio::test]
async fn test_no_working_hours_is_empty_not_error() {
    let service = morning_service(30);
    let availability = service_with(&service, vec![]);

    let sunday = TimeFixtures::date(2025, 3, 9);
    let slots = availability.get_available_slots(service.id, sunday).await.unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn test_excluded_appointment_frees_its_slot() {
    let service = morning_service(30);
    let own = booked((8, 0), (8, 30));
    let own_id = own.appointment_id;
    let availability = service_with(&service, vec![own]);

    let without = availability.slots_for(&service, monday(), None).await.unwrap();
    assert!(!starts(&without).contains(&"08:00".to_string()));

    let with_exclusion = availability.slots_for(&service, monday(), Some(own_id)).await.unwrap();
    assert_eq!(with_exclusion.first().unwrap().start_time, "08:00");
}

#[tokio::test]
async fn test_timezone_offset_shifts_bookings_into_local_time() {
    let service = morning_service(30);
    let store = Arc::new(StaticStore {
        services: vec![service.clone()],
        // 01:00-02:00 UTC is 08:00-09:00 at UTC+7
        booked: Mutex::new(vec![booked((1, 0), (2, 0))]),
    });
    let availability = AvailabilityService::new(store, &TestConfig::default().with_offset(7).to_app_config());

    let slots = availability.get_available_slots(service.id, monday()).await.unwrap();

    assert_eq!(slots.first().unwrap().start_time, "09:00");
    assert_eq!(slots.len(), 6);
}

#[tokio::test]
async fn test_unknown_doctor_service_is_not_found() {
    let service = morning_service(30);
    let availability = service_with(&service, vec![]);

    let result = availability.get_available_slots(Uuid::new_v4(), monday()).await;

    assert_matches!(result, Err(DoctorError::NotFound(_)));
}

#[tokio::test]
async fn test_malformed_working_hours_surface_as_configuration_error() {
    let mut service = morning_service(30);
    service.working_hours = vec![WorkingHours::new(1, "8am", "12:00")];
    let availability = service_with(&service, vec![]);

    let result = availability.get_available_slots(service.id, monday()).await;

    assert_matches!(result, Err(DoctorError::InvalidWorkingHours(_)));
}

#[tokio::test]
async fn test_window_ending_at_midnight_is_a_configuration_error() {
    let mut service = morning_service(30);
    service.working_hours = vec![WorkingHours::new(1, "22:00", "24:00")];
    let availability = service_with(&service, vec![]);

    let result = availability.get_available_slots(service.id, monday()).await;

    assert_matches!(result, Err(DoctorError::InvalidWorkingHours(_)));
}

// ==============================================================================
// SUPABASE STORE
// ==============================================================================

#[tokio::test]
async fn test_supabase_store_reads_service_and_bookings() {
    let mock_server = MockServer::start().await;
    let service_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_services"))
        .and(query_param("id", format!("eq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": service_id,
            "doctor_id": doctor_id,
            "service_id": Uuid::new_v4(),
            "service_name": "Dermatology follow-up",
            "duration_minutes": 30,
            "price": 200000.0,
            "working_hours": [
                { "day_of_week": 1, "start_time": "08:00:00", "end_time": "12:00:00" }
            ]
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2025-03-10"))
        .and(query_param("status", "neq.CANCELLED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "start_time": "2025-03-10T08:00:00Z",
            "end_time": "2025-03-10T09:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let store = Arc::new(SupabaseDoctorServiceStore::new(Arc::new(SupabaseClient::new(&config))));
    let availability = AvailabilityService::new(store, &config);

    let slots = availability.get_available_slots(service_id, monday()).await.unwrap();

    assert_eq!(
        starts(&slots),
        vec!["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]
    );
}

#[tokio::test]
async fn test_supabase_store_missing_service_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let store = Arc::new(SupabaseDoctorServiceStore::new(Arc::new(SupabaseClient::new(&config))));
    let availability = AvailabilityService::new(store, &config);

    let result = availability.get_available_slots(Uuid::new_v4(), monday()).await;

    assert_matches!(result, Err(DoctorError::NotFound(_)));
}

#[tokio::test]
async fn test_supabase_store_failure_is_database_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_services"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let store = Arc::new(SupabaseDoctorServiceStore::new(Arc::new(SupabaseClient::new(&config))));
    let availability = AvailabilityService::new(store, &config);

    let result = availability.get_available_slots(Uuid::new_v4(), monday()).await;

    assert_matches!(result, Err(DoctorError::DatabaseError(_)));
}
