//! Background job scheduler.
//!
//! Runs the resume check on its own timer so cool-down can end while the
//! sweep loop is asleep.

use std::sync::Arc;

use jobscout_engine::{run_resume_check, EngineState};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(engine: Arc<EngineState>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_resume_check_job(&scheduler, engine).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the repeated resume check, every `resume_check_interval`.
async fn register_resume_check_job(
    scheduler: &JobScheduler,
    engine: Arc<EngineState>,
) -> Result<(), JobSchedulerError> {
    let every = engine.settings().resume_check_interval;

    let job = Job::new_repeated_async(every, move |_uuid, _lock| {
        let engine = Arc::clone(&engine);

        Box::pin(async move {
            if let Some(reason) = run_resume_check(&engine).await {
                tracing::info!(%reason, "scheduler: resume check ended cool-down");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(every = ?every, "scheduler: resume check registered");
    Ok(())
}
