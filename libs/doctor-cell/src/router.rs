use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use crate::handlers::{self, DoctorCellState};

pub fn doctor_service_routes(state: Arc<DoctorCellState>) -> Router {
    Router::new()
        .route("/{doctor_service_id}/availability", get(handlers::get_doctor_service_availability))
        .with_state(state)
}
