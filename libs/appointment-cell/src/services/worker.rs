use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use crate::services::lifecycle::LifecycleReconciler;

/// Drives `LifecycleReconciler::run_sweep` on a fixed interval until the
/// shutdown channel flips to `true` or its sender is dropped.
pub struct ReconcilerWorker {
    reconciler: Arc<LifecycleReconciler>,
    period: Duration,
}

impl ReconcilerWorker {
    pub fn new(reconciler: Arc<LifecycleReconciler>, period: Duration) -> Self {
        Self { reconciler, period }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    #[instrument(skip_all, fields(period_secs = self.period.as_secs()))]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Lifecycle reconciler started");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reconciler.run_sweep().await {
                        error!("Lifecycle sweep failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Reconciler loop stopping due to shutdown");
                        break;
                    }
                }
            }
        }

        info!("Lifecycle reconciler stopped");
    }
}
