// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::extract::State;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{error::AppError, extract::{AppJson, AppPath, AppQuery}, response::ApiResponse};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatistics, AppointmentWithBilling,
    BookAppointmentRequest, CancelAppointmentRequest, PaymentUpdateRequest, UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::statistics::AppointmentStatisticsService;

pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
    pub statistics: Arc<AppointmentStatisticsService>,
}

pub fn map_appointment_error(error: AppointmentError, config: &AppConfig) -> AppError {
    match error {
        AppointmentError::Validation(_) => AppError::ValidationError(error.to_string()),
        AppointmentError::InvalidTimeRange
        | AppointmentError::PastStartTime
        | AppointmentError::DurationMismatch { .. }
        | AppointmentError::TooLateToModify
        | AppointmentError::InvalidStatusTransition(_)
        | AppointmentError::InvalidPaymentTransition { .. } => AppError::BadRequest(error.to_string()),
        AppointmentError::SlotNoLongerAvailable => AppError::Conflict(error.to_string()),
        AppointmentError::NotFound(_) => AppError::NotFound(error.to_string()),
        AppointmentError::Internal(detail) => AppError::internal(detail, config.expose_error_details()),
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    AppJson(request): AppJson<BookAppointmentRequest>,
) -> Result<ApiResponse<AppointmentWithBilling>, AppError> {
    let booked = state.booking
        .book_appointment(request)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::created(booked, "Appointment booked successfully"))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    AppPath(appointment_id): AppPath<Uuid>,
) -> Result<ApiResponse<AppointmentWithBilling>, AppError> {
    let appointment = state.booking
        .get_appointment_with_billing(appointment_id)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::ok(appointment, "Appointment retrieved successfully"))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppointmentCellState>>,
    AppQuery(filter): AppQuery<AppointmentFilter>,
) -> Result<ApiResponse<Vec<Appointment>>, AppError> {
    let appointments = state.booking
        .search_appointments(filter)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::ok(appointments, "Appointments retrieved successfully"))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    AppPath(appointment_id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateAppointmentRequest>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let appointment = state.booking
        .update_appointment(appointment_id, request)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::ok(appointment, "Appointment updated successfully"))
}

/// `DELETE /appointments/{id}?reason=...&cancelled_by=patient`
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    AppPath(appointment_id): AppPath<Uuid>,
    AppQuery(request): AppQuery<CancelAppointmentRequest>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let appointment = state.booking
        .cancel_appointment(appointment_id, request)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::ok(appointment, "Appointment cancelled successfully"))
}

// ==============================================================================
// LIFECYCLE & PAYMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_in_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    AppPath(appointment_id): AppPath<Uuid>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let appointment = state.booking
        .check_in(appointment_id)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::ok(appointment, "Patient checked in"))
}

#[axum::debug_handler]
pub async fn record_payment(
    State(state): State<Arc<AppointmentCellState>>,
    AppPath(appointment_id): AppPath<Uuid>,
    AppJson(request): AppJson<PaymentUpdateRequest>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let appointment = state.booking
        .record_payment(appointment_id, request.status)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::ok(appointment, "Payment status updated"))
}

#[axum::debug_handler]
pub async fn get_appointment_statistics(
    State(state): State<Arc<AppointmentCellState>>,
    AppQuery(filter): AppQuery<AppointmentFilter>,
) -> Result<ApiResponse<AppointmentStatistics>, AppError> {
    let statistics = state.statistics
        .get_statistics(filter)
        .await
        .map_err(|e| map_appointment_error(e, &state.config))?;

    Ok(ApiResponse::ok(statistics, "Appointment statistics retrieved successfully"))
}
