// libs/appointment-cell/src/services/lifecycle.rs
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_utils::clock::Clock;
use shared_utils::time::truncate_to_minute;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::repository::AppointmentRepository;

// ==============================================================================
// REMINDERS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderLead {
    DayBefore,
    HourBefore,
}

impl ReminderLead {
    pub const ALL: [ReminderLead; 2] = [ReminderLead::DayBefore, ReminderLead::HourBefore];

    pub fn lead_time(&self) -> Duration {
        match self {
            ReminderLead::DayBefore => Duration::hours(24),
            ReminderLead::HourBefore => Duration::hours(1),
        }
    }
}

impl fmt::Display for ReminderLead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderLead::DayBefore => write!(f, "24h"),
            ReminderLead::HourBefore => write!(f, "1h"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Reminder delivery failed: {0}")]
    Delivery(String),
}

/// Outbound reminder channel. Delivery is best effort; the reconciler logs
/// failures and moves on.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send_reminder(&self, appointment_id: Uuid, lead: ReminderLead) -> Result<(), NotificationError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReminderNotifier;

#[async_trait]
impl ReminderNotifier for LoggingReminderNotifier {
    async fn send_reminder(&self, appointment_id: Uuid, lead: ReminderLead) -> Result<(), NotificationError> {
        info!("Reminder ({}) dispatched for appointment {}", lead, appointment_id);
        Ok(())
    }
}

// ==============================================================================
// SWEEP PLANNING
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransition {
    pub appointment_id: Uuid,
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedReminder {
    pub appointment_id: Uuid,
    pub lead: ReminderLead,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepPlan {
    pub transitions: Vec<PlannedTransition>,
    pub reminders: Vec<PlannedReminder>,
}

impl SweepPlan {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.reminders.is_empty()
    }
}

/// Start instants that are due a reminder at `now`.
pub fn reminder_starts(now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let now = truncate_to_minute(now);
    ReminderLead::ALL.iter().map(|lead| now + lead.lead_time()).collect()
}

/// Decides what a sweep at `now` should do. Matching is on the exact
/// minute: an appointment whose end (or reminder instant) fell between two
/// sweeps is not picked up later.
pub fn plan_sweep(appointments: &[Appointment], now: DateTime<Utc>) -> SweepPlan {
    let now = truncate_to_minute(now);
    let mut plan = SweepPlan::default();

    for appointment in appointments {
        match appointment.status {
            AppointmentStatus::OnGoing if appointment.end_time == now => {
                plan.transitions.push(PlannedTransition {
                    appointment_id: appointment.id,
                    from: AppointmentStatus::OnGoing,
                    to: AppointmentStatus::Completed,
                });
            }
            AppointmentStatus::Upcoming if appointment.end_time == now => {
                plan.transitions.push(PlannedTransition {
                    appointment_id: appointment.id,
                    from: AppointmentStatus::Upcoming,
                    to: AppointmentStatus::Cancelled,
                });
            }
            AppointmentStatus::Upcoming => {
                for lead in ReminderLead::ALL {
                    if appointment.start_time == now + lead.lead_time() {
                        plan.reminders.push(PlannedReminder { appointment_id: appointment.id, lead });
                    }
                }
            }
            _ => {}
        }
    }

    plan
}

// ==============================================================================
// RECONCILER
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub completed: usize,
    pub cancelled: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reminders_sent: usize,
    pub reminders_failed: usize,
}

pub struct LifecycleReconciler {
    repository: Arc<dyn AppointmentRepository>,
    notifier: Arc<dyn ReminderNotifier>,
    clock: Arc<dyn Clock>,
}

impl LifecycleReconciler {
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        notifier: Arc<dyn ReminderNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repository, notifier, clock }
    }

    /// One pass over due appointments. Each step is applied independently;
    /// only a failure to load candidates fails the sweep.
    #[instrument(skip(self))]
    pub async fn run_sweep(&self) -> Result<SweepReport, AppointmentError> {
        let now = truncate_to_minute(self.clock.now());

        let candidates = self.repository
            .find_due_for_sweep(now, &reminder_starts(now))
            .await
            .map_err(|e| {
                error!("Sweep at {} could not load appointments: {}", now, e);
                AppointmentError::from(e)
            })?;

        let plan = plan_sweep(&candidates, now);
        if plan.is_empty() {
            debug!("Nothing due at {}", now);
            return Ok(SweepReport::default());
        }

        let mut report = SweepReport::default();

        for transition in &plan.transitions {
            let reason = (transition.to == AppointmentStatus::Cancelled)
                .then(|| "Appointment ended without check-in".to_string());

            match self.repository
                .transition_status(transition.appointment_id, transition.from, transition.to, reason)
                .await
            {
                Ok(true) => {
                    info!(
                        "Appointment {} moved {} -> {}",
                        transition.appointment_id, transition.from, transition.to
                    );
                    match transition.to {
                        AppointmentStatus::Completed => report.completed += 1,
                        _ => report.cancelled += 1,
                    }
                }
                Ok(false) => {
                    debug!("Appointment {} already left {}", transition.appointment_id, transition.from);
                    report.skipped += 1;
                }
                Err(e) => {
                    error!("Failed to move appointment {}: {}", transition.appointment_id, e);
                    report.failed += 1;
                }
            }
        }

        for reminder in &plan.reminders {
            match self.notifier.send_reminder(reminder.appointment_id, reminder.lead).await {
                Ok(()) => report.reminders_sent += 1,
                Err(e) => {
                    warn!("Reminder for appointment {} not delivered: {}", reminder.appointment_id, e);
                    report.reminders_failed += 1;
                }
            }
        }

        info!("Sweep at {} finished: {:?}", now, report);
        Ok(report)
    }
}
