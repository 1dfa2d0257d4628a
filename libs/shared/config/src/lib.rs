use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Clinic-local offset used when no `APP_TIMEZONE_OFFSET_HOURS` is set.
pub const DEFAULT_TIMEZONE_OFFSET_HOURS: i32 = 7;
pub const DEFAULT_RECONCILER_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub timezone_offset_hours: i32,
    pub reconciler_interval_seconds: u64,
    pub environment: String,
    pub port: u16,
    /// JSON file of doctor services loaded into the in-memory store when
    /// Supabase is not configured.
    pub doctor_services_seed_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            timezone_offset_hours: DEFAULT_TIMEZONE_OFFSET_HOURS,
            reconciler_interval_seconds: DEFAULT_RECONCILER_INTERVAL_SECONDS,
            environment: "development".to_string(),
            port: DEFAULT_PORT,
            doctor_services_seed_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            timezone_offset_hours: parse_or_default(
                "APP_TIMEZONE_OFFSET_HOURS",
                DEFAULT_TIMEZONE_OFFSET_HOURS,
            ),
            reconciler_interval_seconds: parse_or_default(
                "RECONCILER_INTERVAL_SECONDS",
                DEFAULT_RECONCILER_INTERVAL_SECONDS,
            ),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            port: parse_or_default("PORT", DEFAULT_PORT),
            doctor_services_seed_file: env::var("DOCTOR_SERVICES_SEED_FILE")
                .ok()
                .filter(|path| !path.trim().is_empty()),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - falling back to the in-memory appointment store");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Internal error detail is only returned to callers outside production.
    pub fn expose_error_details(&self) -> bool {
        !self.is_production()
    }

    pub fn reconciler_interval(&self) -> Duration {
        Duration::from_secs(self.reconciler_interval_seconds.max(1))
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
