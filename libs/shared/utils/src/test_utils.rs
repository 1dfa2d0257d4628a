use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use shared_config::AppConfig;

use crate::clock::FixedClock;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub timezone_offset_hours: i32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            timezone_offset_hours: 0,
        }
    }
}

impl TestConfig {
    /// Points the Supabase client at a mock server (e.g. `MockServer::uri()`).
    pub fn with_supabase_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset_hours: i32) -> Self {
        self.timezone_offset_hours = offset_hours;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            timezone_offset_hours: self.timezone_offset_hours,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TimeFixtures;

impl TimeFixtures {
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid test instant")
    }

    pub fn clock_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Self::utc(year, month, day, hour, minute)))
    }
}
