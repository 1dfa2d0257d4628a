/// Scheduling endpoint smoke tests
///
/// Runs against a live API instance. Configure with:
/// - `BASE_URL` (default `http://localhost:3000`)
/// - `DOCTOR_SERVICE_ID` (required; a doctor service with working hours)
/// - `BOOKING_DATE` (required; `YYYY-MM-DD`, a future working day)

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(self.client.get(format!("{}{}", self.base_url, path)).send().await?)
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(self.client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?)
    }

    pub async fn delete(&self, path: &str) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(self.client.delete(format!("{}{}", self.base_url, path)).send().await?)
    }
}

#[derive(Debug, Default)]
pub struct TestResults {
    pub passed: u32,
    pub failed: u32,
    pub failures: Vec<String>,
}

impl TestResults {
    pub fn pass(&mut self, test_name: &str) {
        self.passed += 1;
        println!("✅ {}", test_name);
    }

    pub fn fail(&mut self, test_name: &str, error: &str) {
        self.failed += 1;
        self.failures.push(format!("{}: {}", test_name, error));
        println!("❌ {}: {}", test_name, error);
    }

    pub fn expect_status(&mut self, test_name: &str, actual: StatusCode, expected: StatusCode) -> bool {
        if actual == expected {
            self.pass(test_name);
            true
        } else {
            self.fail(test_name, &format!("Status: {} (expected {})", actual, expected));
            false
        }
    }

    pub fn summary(&self) {
        println!("\n📊 Test Summary:");
        println!("✅ Passed: {}", self.passed);
        println!("❌ Failed: {}", self.failed);

        if !self.failures.is_empty() {
            println!("\n🔍 Failures:");
            for failure in &self.failures {
                println!("  - {}", failure);
            }
        }
    }
}

/// First `(start_time, end_time)` pair in an availability envelope.
fn first_slot(availability: &Value) -> Option<(String, String)> {
    let slot = availability["data"]["slots"].as_array()?.first()?;
    Some((
        slot["start_time"].as_str()?.to_string(),
        slot["end_time"].as_str()?.to_string(),
    ))
}

pub async fn run_smoke_tests(
    client: &ApiTestClient,
    doctor_service_id: &str,
    date: &str,
) -> Result<TestResults, Box<dyn std::error::Error>> {
    let mut results = TestResults::default();

    println!("🚀 Starting scheduling smoke tests against {}", client.base_url);

    let response = client.get("/").await?;
    results.expect_status("Health check", response.status(), StatusCode::OK);

    // AVAILABILITY
    let availability_path = format!("/doctor-services/{}/availability?date={}", doctor_service_id, date);
    let response = client.get(&availability_path).await?;
    if !results.expect_status("Availability lookup", response.status(), StatusCode::OK) {
        return Ok(results);
    }
    let availability: Value = response.json().await?;

    let Some((start_time, end_time)) = first_slot(&availability) else {
        results.fail("Open slot", "no open slots on the requested date");
        return Ok(results);
    };
    results.pass("Open slot");

    // BOOKING
    let booking = json!({
        "patient_id": Uuid::new_v4(),
        "doctor_service_id": doctor_service_id,
        "date": date,
        "start_time": start_time,
        "end_time": end_time,
        "notes": "smoke test"
    });

    let response = client.post("/appointments", booking.clone()).await?;
    if !results.expect_status("Book appointment", response.status(), StatusCode::CREATED) {
        return Ok(results);
    }
    let created: Value = response.json().await?;
    let appointment_id = created["data"]["appointment"]["id"].as_str().unwrap_or_default().to_string();

    let response = client.post("/appointments", booking.clone()).await?;
    results.expect_status("Double booking rejected", response.status(), StatusCode::CONFLICT);

    let response = client.get(&format!("/appointments/{}", appointment_id)).await?;
    results.expect_status("Fetch appointment", response.status(), StatusCode::OK);

    let response = client.get(&availability_path).await?;
    let after: Value = response.json().await?;
    match first_slot(&after) {
        Some((start, _)) if start == start_time => results.fail("Slot consumed", "booked slot still listed"),
        _ => results.pass("Slot consumed"),
    }

    // CANCEL & REBOOK
    let response = client
        .delete(&format!("/appointments/{}?reason=smoke%20test&cancelled_by=staff", appointment_id))
        .await?;
    results.expect_status("Cancel appointment", response.status(), StatusCode::OK);

    let response = client.post("/appointments", booking).await?;
    if results.expect_status("Rebook cancelled slot", response.status(), StatusCode::CREATED) {
        let rebooked: Value = response.json().await?;
        if let Some(id) = rebooked["data"]["appointment"]["id"].as_str() {
            client.delete(&format!("/appointments/{}?cancelled_by=staff", id)).await?;
        }
    }

    let response = client.get("/appointments/statistics").await?;
    results.expect_status("Statistics", response.status(), StatusCode::OK);

    Ok(results)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let doctor_service_id = std::env::var("DOCTOR_SERVICE_ID").map_err(|_| "DOCTOR_SERVICE_ID is required")?;
    let date = std::env::var("BOOKING_DATE").map_err(|_| "BOOKING_DATE is required")?;

    let client = ApiTestClient::new(base_url);
    let results = run_smoke_tests(&client, &doctor_service_id, &date).await?;
    results.summary();

    if results.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_slot_reads_envelope() {
        let envelope = json!({
            "data": { "slots": [
                { "start_time": "08:00", "end_time": "08:30", "display_time": "08:00 - 08:30" }
            ] },
            "message": "ok",
            "statusCode": 200
        });

        assert_eq!(first_slot(&envelope), Some(("08:00".to_string(), "08:30".to_string())));
        assert_eq!(first_slot(&json!({ "data": { "slots": [] } })), None);
    }
}
