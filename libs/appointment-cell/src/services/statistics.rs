use std::sync::Arc;

use futures::try_join;
use tracing::debug;

use crate::models::{AppointmentError, AppointmentFilter, AppointmentStatistics, AppointmentStatus, PaymentStatus};
use crate::services::repository::AppointmentRepository;

pub struct AppointmentStatisticsService {
    repository: Arc<dyn AppointmentRepository>,
}

impl AppointmentStatisticsService {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// Counts per status and per payment status, scoped by `filter`. The
    /// status dimension being counted replaces any status in the filter.
    pub async fn get_statistics(
        &self,
        filter: AppointmentFilter,
    ) -> Result<AppointmentStatistics, AppointmentError> {
        debug!("Computing appointment statistics for {:?}", filter);

        let base = AppointmentFilter {
            limit: None,
            offset: None,
            ..filter
        };
        let by_status = [
            AppointmentStatus::Upcoming,
            AppointmentStatus::OnGoing,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ]
        .map(|status| base.with_status(status));
        let by_payment = [PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Refunded]
            .map(|status| base.with_payment_status(status));
        let repo = &self.repository;

        let (total, upcoming, on_going, completed, cancelled, payment_pending, paid, refunded) = try_join!(
            repo.count(&base),
            repo.count(&by_status[0]),
            repo.count(&by_status[1]),
            repo.count(&by_status[2]),
            repo.count(&by_status[3]),
            repo.count(&by_payment[0]),
            repo.count(&by_payment[1]),
            repo.count(&by_payment[2]),
        )?;

        Ok(AppointmentStatistics {
            total,
            upcoming,
            on_going,
            completed,
            cancelled,
            payment_pending,
            paid,
            refunded,
        })
    }
}
