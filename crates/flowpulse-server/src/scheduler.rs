//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! nightly collection job.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use flowpulse_collector::{CollectError, Collector};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(collector: Arc<Collector>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_collection_job(&scheduler, collector).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Registers the nightly collection job, running at 02:00 UTC every day
/// (`0 0 2 * * *`). If a manual run is still in flight at that time, the
/// scheduled run is skipped rather than queued.
async fn register_collection_job(
    scheduler: &JobScheduler,
    collector: Arc<Collector>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 0 2 * * *", move |_uuid, _lock| {
        let collector = Arc::clone(&collector);

        Box::pin(async move {
            tracing::info!("scheduler: starting nightly collection run");
            match collector.run("schedule").await {
                Ok(report) => {
                    tracing::info!(
                        run_id = report.run_id,
                        status = report.status.as_str(),
                        "scheduler: nightly collection run finished"
                    );
                }
                Err(CollectError::Busy) => {
                    tracing::warn!("scheduler: skipping nightly run, another run is in progress");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: nightly collection run failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
