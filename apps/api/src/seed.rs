use anyhow::{anyhow, Context};

use doctor_cell::models::DoctorService;

/// Reads the doctor services the in-memory store starts with.
pub async fn load_doctor_services(path: &str) -> anyhow::Result<Vec<DoctorService>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read doctor services seed file {}", path))?;

    parse_doctor_services(&raw).with_context(|| format!("invalid doctor services seed file {}", path))
}

/// Parses a JSON array of doctor services, rejecting any whose working hours
/// could never produce a bookable slot.
pub fn parse_doctor_services(raw: &str) -> anyhow::Result<Vec<DoctorService>> {
    let services: Vec<DoctorService> = serde_json::from_str(raw)?;

    for service in &services {
        if service.duration_minutes <= 0 {
            return Err(anyhow!("doctor service {} has non-positive duration", service.id));
        }
        for hours in &service.working_hours {
            hours.window_minutes()
                .map_err(|e| anyhow!("doctor service {}: {}", service.id, e))?;
        }
    }

    Ok(services)
}
