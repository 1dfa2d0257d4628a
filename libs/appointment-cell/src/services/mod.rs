pub mod booking;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod statistics;
pub mod supabase;
pub mod worker;

pub use booking::AppointmentBookingService;
pub use lifecycle::{
    plan_sweep, LifecycleReconciler, LoggingReminderNotifier, NotificationError, ReminderLead,
    ReminderNotifier, SweepPlan, SweepReport,
};
pub use memory::InMemoryAppointmentStore;
pub use repository::{AppointmentRepository, RepositoryError};
pub use statistics::AppointmentStatisticsService;
pub use supabase::SupabaseAppointmentRepository;
pub use worker::ReconcilerWorker;
