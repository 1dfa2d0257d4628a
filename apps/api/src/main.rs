use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;
mod seed;

use appointment_cell::services::{
    AppointmentBookingService, AppointmentRepository, AppointmentStatisticsService,
    InMemoryAppointmentStore, LifecycleReconciler, LoggingReminderNotifier, ReconcilerWorker,
    SupabaseAppointmentRepository,
};
use appointment_cell::AppointmentCellState;
use doctor_cell::services::{AvailabilityService, DoctorServiceStore, SupabaseDoctorServiceStore};
use doctor_cell::DoctorCellState;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};

async fn build_stores(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<(Arc<dyn AppointmentRepository>, Arc<dyn DoctorServiceStore>)> {
    if config.is_configured() {
        info!("Using Supabase at {}", config.supabase_url);
        let supabase = Arc::new(SupabaseClient::new(config));
        let repository: Arc<dyn AppointmentRepository> =
            Arc::new(SupabaseAppointmentRepository::new(Arc::clone(&supabase), clock));
        let doctor_store: Arc<dyn DoctorServiceStore> = Arc::new(SupabaseDoctorServiceStore::new(supabase));
        return Ok((repository, doctor_store));
    }

    let seed_file = config.doctor_services_seed_file.as_deref().ok_or_else(|| {
        anyhow::anyhow!("Supabase is not configured and DOCTOR_SERVICES_SEED_FILE is not set")
    })?;
    let doctor_services = seed::load_doctor_services(seed_file).await?;

    warn!("Supabase is not configured; appointments are kept in memory and lost on restart");
    let store = Arc::new(InMemoryAppointmentStore::with_clock(clock));
    for doctor_service in doctor_services {
        info!("Seeding doctor service {} ({})", doctor_service.id, doctor_service.service_name);
        store.insert_doctor_service(doctor_service).await;
    }

    let repository: Arc<dyn AppointmentRepository> = store.clone();
    let doctor_store: Arc<dyn DoctorServiceStore> = store;
    Ok((repository, doctor_store))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Wire services
    let (repository, doctor_store) = build_stores(&config, Arc::clone(&clock)).await?;
    let availability = Arc::new(AvailabilityService::new(doctor_store, &config));
    let booking = Arc::new(AppointmentBookingService::new(
        Arc::clone(&repository),
        Arc::clone(&availability),
        Arc::clone(&clock),
    ));
    let statistics = Arc::new(AppointmentStatisticsService::new(Arc::clone(&repository)));

    let doctor_state = Arc::new(DoctorCellState {
        config: Arc::clone(&config),
        availability,
    });
    let appointment_state = Arc::new(AppointmentCellState {
        config: Arc::clone(&config),
        booking,
        statistics,
    });

    // Background lifecycle sweep
    let reconciler = Arc::new(LifecycleReconciler::new(
        repository,
        Arc::new(LoggingReminderNotifier),
        clock,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler_handle = ReconcilerWorker::new(reconciler, config.reconciler_interval()).spawn(shutdown_rx);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(doctor_state, appointment_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    shutdown_tx.send(true).ok();
    reconciler_handle.await.context("reconciler task panicked")?;

    info!("Server stopped");
    Ok(())
}
