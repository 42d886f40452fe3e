use anyhow::{Context, Result};
use gitpulse_core::models::{JobKey, JobUpdate};
use time::UtcDateTime;

use crate::{JobContext, RunStatus, process_metrics_job};

/// Run every job of the configured task that is due at `now`, one at a time.
/// Returns the number of runs that completed successfully.
pub async fn dispatch_due_jobs(ctx: &JobContext, now: UtcDateTime) -> Result<usize> {
    let task = &ctx.config.scheduler.task;
    let jobs = ctx.queue.due_jobs(task, now).await.context("Failed to list due jobs")?;
    if jobs.is_empty() {
        tracing::debug!("No {} jobs due", task);
        return Ok(0);
    }
    let mut succeeded = 0;
    for job in &jobs {
        if process_metrics_job(ctx, job.installation_id).await == RunStatus::Success {
            succeeded += 1;
        }
    }
    tracing::info!("Dispatched {} {} jobs, {} succeeded", jobs.len(), task, succeeded);
    Ok(succeeded)
}

/// Make the installation's job due immediately. Also releases a claim left
/// behind by a run that never finished.
pub async fn enqueue_now(ctx: &JobContext, installation_id: u64) -> Result<()> {
    let key = JobKey { installation_id, task: ctx.config.scheduler.task.clone() };
    if ctx.queue.get_job(&key).await?.is_some_and(|job| job.processing) {
        tracing::warn!("Releasing stale {} claim for installation {}", key.task, installation_id);
    }
    ctx.queue.submit(&key, JobUpdate::reschedule(UtcDateTime::now())).await?;
    tracing::info!("Enqueued {} job for installation {}", key.task, installation_id);
    Ok(())
}
