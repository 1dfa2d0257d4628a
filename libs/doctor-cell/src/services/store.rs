use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{BookedInterval, DoctorError, DoctorService};

/// Read side the availability calculator needs from persistence.
#[async_trait]
pub trait DoctorServiceStore: Send + Sync {
    async fn find_doctor_service(&self, id: Uuid) -> Result<Option<DoctorService>, DoctorError>;

    /// Non-cancelled appointments of `doctor_id` whose clinic-local date is
    /// `date`, optionally ignoring one appointment (used when rescheduling).
    async fn find_booked_intervals(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<BookedInterval>, DoctorError>;
}

pub struct SupabaseDoctorServiceStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorServiceStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorServiceStore for SupabaseDoctorServiceStore {
    async fn find_doctor_service(&self, id: Uuid) -> Result<Option<DoctorService>, DoctorError> {
        debug!("Fetching doctor service {}", id);

        let path = format!(
            "/rest/v1/doctor_services?id=eq.{}&select=*,working_hours:doctor_working_hours(day_of_week,start_time,end_time)",
            id
        );
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor service: {}", e)))
    }

    async fn find_booked_intervals(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<BookedInterval>, DoctorError> {
        let mut query_parts = vec![
            "select=id,start_time,end_time".to_string(),
            format!("doctor_id=eq.{}", doctor_id),
            format!("date=eq.{}", date),
            "status=neq.CANCELLED".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointments?{}&order=start_time.asc", query_parts.join("&"));

        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedInterval>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }
}
