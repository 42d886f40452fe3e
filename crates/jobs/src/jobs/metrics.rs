use anyhow::{Context, Result};
use gitpulse_core::models::{JobKey, JobUpdate, OrgUpdate, Organization, RepoTarget};
use time::{Duration, UtcDateTime};

use crate::{JobContext, sync_repository};

/// Final status of a metrics run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Another run holds the job record.
    AlreadyRunning,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::AlreadyRunning => "already_running",
            Self::Error => "error",
        }
    }
}

/// Collect metrics for every eligible repository of an installation.
///
/// Never fails: every failure is logged and reported as [`RunStatus::Error`].
/// Once the job record is claimed, every exit path releases it; only a
/// completed run moves the next expiry forward.
pub async fn process_metrics_job(ctx: &JobContext, installation_id: u64) -> RunStatus {
    tracing::info!("Processing metrics job for installation {}", installation_id);
    let org = match eligible_org(ctx, installation_id).await {
        Ok(Some(org)) => org,
        Ok(None) => return RunStatus::Error,
        Err(e) => {
            tracing::error!("Failed to load installation {}: {:?}", installation_id, e);
            return RunStatus::Error;
        }
    };

    let key = JobKey { installation_id, task: ctx.config.scheduler.task.clone() };
    match ctx.queue.try_start(&key).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Metrics job for {} is already running", org.org_name);
            return RunStatus::AlreadyRunning;
        }
        Err(e) => {
            tracing::error!("Failed to claim metrics job for {}: {:?}", org.org_name, e);
            return RunStatus::Error;
        }
    }

    match run(ctx, &key, &org).await {
        Ok(status) => {
            tracing::info!("Metrics job for {} finished: {}", org.org_name, status.as_str());
            status
        }
        Err(e) => {
            tracing::error!("Metrics job for {} failed: {:?}", org.org_name, e);
            if let Err(e) = ctx.queue.submit(&key, JobUpdate::processing(false)).await {
                tracing::error!("Failed to release metrics job for {}: {:?}", org.org_name, e);
            }
            RunStatus::Error
        }
    }
}

/// The organization, if it may be processed at all.
async fn eligible_org(ctx: &JobContext, installation_id: u64) -> Result<Option<Organization>> {
    let Some(org) = ctx.directory.get_org(installation_id).await? else {
        tracing::warn!("Installation {} not found", installation_id);
        return Ok(None);
    };
    if org.org_name.is_empty() || !org.status.is_active() || !org.onboard_complete {
        tracing::warn!(
            "Installation {} ({}) is not eligible: status {}, onboarded {}",
            installation_id,
            org.org_name,
            org.status,
            org.onboard_complete
        );
        return Ok(None);
    }
    Ok(Some(org))
}

async fn run(ctx: &JobContext, key: &JobKey, org: &Organization) -> Result<RunStatus> {
    if org.api_limit_exceeded {
        tracing::debug!("{} is parked after exceeding its API limit, skipping", org.org_name);
        ctx.queue.submit(key, JobUpdate::processing(false)).await?;
        return Ok(RunStatus::Success);
    }

    let remote = match ctx.api.list_repositories(&org.org_name, &org.token).await {
        Ok(remote) => remote,
        Err(e) if e.is_rate_limited() => {
            tracing::warn!("{} hit the API limit listing repositories: {}", org.org_name, e);
            return park(ctx, key, org).await;
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to list repositories of {}", org.org_name));
        }
    };
    ctx.directory.replace_repositories(&org.org_name, &remote).await?;
    let repositories = ctx.directory.eligible_repositories(&org.org_name).await?;
    tracing::info!("{}: syncing {} repositories", org.org_name, repositories.len());

    for repo in &repositories {
        let target = RepoTarget::new(org, repo);
        let report = sync_repository(ctx, &target).await;
        if let Some((dataset, message)) = report.rate_limit() {
            tracing::warn!(
                "{:?}: {} hit the API limit ({}), stopping run for {}",
                report.target,
                dataset,
                message,
                org.org_name
            );
            return park(ctx, key, org).await;
        }
        if report.failed() > 0 {
            tracing::warn!("{:?}: {} datasets failed", report.target, report.failed());
        }
    }

    let now = UtcDateTime::now();
    let interval = Duration::seconds(i64::try_from(ctx.config.scheduler.interval_secs)?);
    let expires_at = now - Duration::nanoseconds(now.nanosecond().into()) + interval;
    ctx.queue.submit(key, JobUpdate::reschedule(expires_at)).await?;
    Ok(RunStatus::Success)
}

/// Flag the organization as over its API limit and release the job without
/// advancing its expiry.
async fn park(ctx: &JobContext, key: &JobKey, org: &Organization) -> Result<RunStatus> {
    ctx.directory
        .update_org(key.installation_id, OrgUpdate {
            api_limit_exceeded: Some(true),
            api_limit_reached_count: Some(org.api_limit_reached_count + 1),
        })
        .await
        .with_context(|| format!("Failed to flag {} as rate limited", org.org_name))?;
    ctx.queue.submit(key, JobUpdate::processing(false)).await?;
    Ok(RunStatus::Error)
}
