use anyhow::Result;
use gitpulse_jobs::{JobContext, dispatch_due_jobs};
use time::UtcDateTime;
use tokio_cron_scheduler::{Job, JobScheduler};

pub type Scheduler = JobScheduler;

pub async fn create(ctx: JobContext) -> Result<Scheduler> {
    let sched = JobScheduler::new().await?;

    // Run whatever jobs are due
    {
        let schedule = ctx.config.scheduler.schedule.clone();
        sched
            .add(Job::new_async(schedule.as_str(), move |_uuid, _l| {
                let ctx = ctx.clone();
                Box::pin(async move {
                    if let Err(e) = dispatch_due_jobs(&ctx, UtcDateTime::now()).await {
                        tracing::error!("Failed to dispatch due jobs: {:?}", e);
                    }
                })
            })?)
            .await?;
    }

    sched.start().await?;
    Ok(sched)
}
