//! Cron-driven execution of the hourly cycle.

use crate::cycle::PipelineCycle;
use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

pub struct PipelineScheduler {
    cycle: Arc<PipelineCycle>,
    cron_schedule: String,
}

impl PipelineScheduler {
    #[must_use]
    pub fn new(cycle: Arc<PipelineCycle>, cron_schedule: String) -> Self {
        Self {
            cycle,
            cron_schedule,
        }
    }

    /// Starts the scheduler. The returned handle keeps jobs firing until
    /// dropped or shut down; the caller owns process lifetime.
    ///
    /// # Errors
    /// Returns an error if the cron expression is invalid or the scheduler
    /// fails to start.
    pub async fn start(&self) -> Result<JobScheduler> {
        info!(cron = %self.cron_schedule, "Starting pipeline scheduler");

        let scheduler = JobScheduler::new().await?;
        let cycle = Arc::clone(&self.cycle);

        let job = Job::new_async(self.cron_schedule.as_str(), move |_uuid, _lock| {
            let cycle = Arc::clone(&cycle);
            Box::pin(async move {
                if let Err(e) = cycle.run().await {
                    error!(error = %e, "Cycle failed");
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;
        info!("Pipeline scheduler started");
        Ok(scheduler)
    }
}
