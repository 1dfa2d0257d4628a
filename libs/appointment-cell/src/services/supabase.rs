use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::{SupabaseClient, SupabaseError};
use shared_utils::clock::Clock;

use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, Billing, NewAppointment, PaymentStatus,
    ScheduledInterval,
};
use crate::services::repository::{AppointmentRepository, RepositoryError};

/// PostgREST-backed repository. Guarded writes go through Postgres functions
/// so the check and the write share one transaction; an exclusion constraint
/// on `(doctor_id, tstzrange(start_time, end_time))` for non-cancelled rows
/// surfaces as HTTP 409. The functions and constraint live in
/// `supabase/migrations/`.
pub struct SupabaseAppointmentRepository {
    supabase: Arc<SupabaseClient>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct BookingRow {
    appointment: Appointment,
    billing: Billing,
}

impl SupabaseAppointmentRepository {
    pub fn new(supabase: Arc<SupabaseClient>, clock: Arc<dyn Clock>) -> Self {
        Self { supabase, clock }
    }

    fn timestamp(instant: DateTime<Utc>) -> String {
        urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
    }

    fn filter_query(filter: &AppointmentFilter) -> Vec<String> {
        let mut query_parts = Vec::new();

        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(clinic_id) = filter.clinic_id {
            query_parts.push(format!("clinic_id=eq.{}", clinic_id));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(payment_status) = filter.payment_status {
            query_parts.push(format!("payment_status=eq.{}", payment_status));
        }
        if let Some(from_date) = filter.from_date {
            query_parts.push(format!("date=gte.{}", from_date));
        }
        if let Some(to_date) = filter.to_date {
            query_parts.push(format!("date=lte.{}", to_date));
        }

        query_parts
    }

    fn map_error(error: SupabaseError) -> RepositoryError {
        if error.is_conflict() {
            RepositoryError::Overlap
        } else {
            RepositoryError::Database(error.to_string())
        }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, RepositoryError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| RepositoryError::Database(format!("Failed to parse appointments: {}", e)))
    }

    fn first_row(id: Uuid, rows: Vec<Value>) -> Result<Appointment, RepositoryError> {
        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound(id))
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn create_with_billing(
        &self,
        new_appointment: NewAppointment,
    ) -> Result<(Appointment, Billing), RepositoryError> {
        debug!("Booking appointment for doctor {} via RPC", new_appointment.doctor_id);

        let params = json!({
            "p_patient_id": new_appointment.patient_id,
            "p_patient": new_appointment.patient,
            "p_doctor_id": new_appointment.doctor_id,
            "p_service_id": new_appointment.service_id,
            "p_doctor_service_id": new_appointment.doctor_service_id,
            "p_clinic_id": new_appointment.clinic_id,
            "p_date": new_appointment.date,
            "p_start_time": new_appointment.start_time,
            "p_end_time": new_appointment.end_time,
            "p_notes": new_appointment.notes,
            "p_amount": new_appointment.amount,
            "p_now": self.clock.now(),
        });

        let row: BookingRow = self.supabase
            .rpc("book_appointment_with_billing", params)
            .await
            .map_err(Self::map_error)?;

        Ok((row.appointment, row.billing))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(Self::map_error)?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn find_many(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError> {
        let mut query_parts = Self::filter_query(filter);
        query_parts.push("order=start_time.asc".to_string());

        if let Some(limit) = filter.limit {
            query_parts.push(format!("limit={}", limit));
        }
        if let Some(offset) = filter.offset {
            query_parts.push(format!("offset={}", offset));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(Self::map_error)?;

        Self::parse_rows(rows)
    }

    async fn count(&self, filter: &AppointmentFilter) -> Result<i64, RepositoryError> {
        let mut query_parts = vec!["select=id".to_string()];
        query_parts.extend(Self::filter_query(filter));

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        self.supabase.count(&path).await.map_err(Self::map_error)
    }

    async fn find_due_for_sweep(
        &self,
        now: DateTime<Utc>,
        reminder_starts: &[DateTime<Utc>],
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let mut conditions = vec![format!("end_time.eq.{}", Self::timestamp(now))];
        conditions.extend(
            reminder_starts.iter().map(|start| format!("start_time.eq.{}", Self::timestamp(*start))),
        );

        let path = format!(
            "/rest/v1/appointments?status=in.({},{})&or=({})&order=start_time.asc",
            AppointmentStatus::Upcoming,
            AppointmentStatus::OnGoing,
            conditions.join(",")
        );

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(Self::map_error)?;

        Self::parse_rows(rows)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", id, from);

        let mut body = json!({
            "status": to,
            "updated_at": self.clock.now().to_rfc3339(),
        });
        if to == AppointmentStatus::Cancelled {
            body["cancellation_reason"] = json!(cancellation_reason);
        }

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(Self::map_error)?;

        if rows.is_empty() {
            warn!("Appointment {} was not {} when moving to {}", id, from, to);
        }

        Ok(!rows.is_empty())
    }

    async fn reschedule(&self, id: Uuid, interval: ScheduledInterval) -> Result<Appointment, RepositoryError> {
        let params = json!({
            "p_appointment_id": id,
            "p_date": interval.date,
            "p_start_time": interval.start_time,
            "p_end_time": interval.end_time,
            "p_now": self.clock.now(),
        });

        let rows: Vec<Value> = self.supabase
            .rpc("reschedule_appointment", params)
            .await
            .map_err(Self::map_error)?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or(RepositoryError::StatusChanged { id, expected: AppointmentStatus::Upcoming })
    }

    async fn update_notes(&self, id: Uuid, notes: Option<String>) -> Result<Appointment, RepositoryError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let body = json!({
            "notes": notes,
            "updated_at": self.clock.now().to_rfc3339(),
        });

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(Self::map_error)?;

        Self::first_row(id, rows)
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Appointment, RepositoryError> {
        let params = json!({
            "p_appointment_id": id,
            "p_status": status,
            "p_now": self.clock.now(),
        });

        let rows: Vec<Value> = self.supabase
            .rpc("update_appointment_payment_status", params)
            .await
            .map_err(Self::map_error)?;

        Self::first_row(id, rows)
    }

    async fn find_billing(&self, appointment_id: Uuid) -> Result<Option<Billing>, RepositoryError> {
        let path = format!("/rest/v1/billings?appointment_id=eq.{}", appointment_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(Self::map_error)?;

        rows.into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| RepositoryError::Database(format!("Failed to parse billing: {}", e)))
    }
}
