//! Event datasets that accumulate across runs.

use anyhow::Result;
use gitpulse_core::{
    merge::{merge_events, merge_releases},
    models::RepoTarget,
    records::{Actions, Record, Releases},
    store,
};

use super::today;
use crate::{JobContext, SyncStatus, remote};

pub async fn sync_releases(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    let (stored, fresh) = tokio::try_join!(
        store::load::<Releases>(ctx.store.as_ref(), target.repo_id),
        remote::fetch_releases(ctx, target),
    )?;
    let Some(mut record) = stored else {
        store::save(ctx.store.as_ref(), &target.org_name, &Record::new(target, fresh)).await?;
        return Ok(SyncStatus::Created);
    };
    if fresh.list.is_empty() {
        return Ok(SyncStatus::Unchanged);
    }
    record.data.list = merge_releases(record.data.list, fresh.list, &today());
    store::save(ctx.store.as_ref(), &target.org_name, &record).await?;
    Ok(SyncStatus::Merged)
}

pub async fn sync_actions(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    let (stored, fresh) = tokio::try_join!(
        store::load::<Actions>(ctx.store.as_ref(), target.repo_id),
        remote::fetch_actions(ctx, target),
    )?;
    let Some(mut record) = stored else {
        store::save(ctx.store.as_ref(), &target.org_name, &Record::new(target, fresh)).await?;
        return Ok(SyncStatus::Created);
    };
    if fresh.list.is_empty() {
        return Ok(SyncStatus::Unchanged);
    }
    let before = record.data.list.len();
    record.data.list = merge_events(record.data.list, fresh.list);
    if record.data.list.len() == before {
        return Ok(SyncStatus::Unchanged);
    }
    store::save(ctx.store.as_ref(), &target.org_name, &record).await?;
    Ok(SyncStatus::Merged)
}
