use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::usecases::daily_job::DailyJobUseCase;

/// Timer-driven entry point for the batch job. The same usecase is also
/// reachable over the internal HTTP route for manual runs.
pub async fn run(usecase: Arc<DailyJobUseCase>, interval_secs: u64) -> Result<()> {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick of a tokio interval fires immediately. Consume it so a
    // restart does not rerun the batch right away.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        info!("job_loop: daily job timer fired");

        match usecase.run().await {
            Ok(summary) => info!(
                reminders_sent = summary.reminders_sent,
                overdue_count = summary.overdue_count,
                suspended_count = summary.suspended_count,
                suspend_failed = summary.suspend_failed,
                "job_loop: daily job finished"
            ),
            Err(err) => error!(error = ?err, "job_loop: daily job failed"),
        }
    }
}
