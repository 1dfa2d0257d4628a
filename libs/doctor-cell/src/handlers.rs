use std::sync::Arc;

use axum::extract::State;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{error::AppError, extract::{AppPath, AppQuery}, response::ApiResponse};

use crate::models::{AvailabilityResponse, DoctorError};
use crate::services::availability::AvailabilityService;

pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub availability: Arc<AvailabilityService>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
}

pub fn map_doctor_error(error: DoctorError, config: &AppConfig) -> AppError {
    match error {
        DoctorError::NotFound(id) => AppError::NotFound(format!("Doctor service {} not found", id)),
        DoctorError::InvalidWorkingHours(msg) => AppError::internal(
            format!("Invalid working hours configured: {}", msg),
            config.expose_error_details(),
        ),
        DoctorError::DatabaseError(msg) => AppError::internal(msg, config.expose_error_details()),
    }
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = raw.ok_or_else(|| AppError::ValidationError("date: is required".to_string()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("date: '{}' is not a YYYY-MM-DD date", raw)))
}

#[axum::debug_handler]
pub async fn get_doctor_service_availability(
    State(state): State<Arc<DoctorCellState>>,
    AppPath(doctor_service_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<AvailabilityQuery>,
) -> Result<ApiResponse<AvailabilityResponse>, AppError> {
    let date = parse_date(query.date.as_deref())?;

    let doctor_service = state.availability
        .get_doctor_service(doctor_service_id)
        .await
        .map_err(|e| map_doctor_error(e, &state.config))?;

    let slots = state.availability
        .slots_for(&doctor_service, date, None)
        .await
        .map_err(|e| map_doctor_error(e, &state.config))?;

    Ok(ApiResponse::ok(
        AvailabilityResponse {
            doctor_service_id,
            doctor_id: doctor_service.doctor_id,
            date,
            duration_minutes: doctor_service.duration_minutes,
            slots,
        },
        "Availability retrieved successfully",
    ))
}
