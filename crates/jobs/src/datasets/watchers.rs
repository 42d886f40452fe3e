use anyhow::Result;
use gitpulse_core::{
    merge::merge_watchers,
    models::RepoTarget,
    records::{Record, Watchers},
    store,
};

use super::today;
use crate::{JobContext, SyncStatus, remote};

pub async fn sync(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    let (stored, fresh) = tokio::try_join!(
        store::load::<Watchers>(ctx.store.as_ref(), target.repo_id),
        remote::fetch_watchers(ctx, target),
    )?;
    let Some(mut record) = stored else {
        store::save(ctx.store.as_ref(), &target.org_name, &Record::new(target, fresh)).await?;
        return Ok(SyncStatus::Created);
    };
    if fresh.list.is_empty() {
        return Ok(SyncStatus::Unchanged);
    }
    record.data.list = merge_watchers(record.data.list, fresh.list, &today());
    record.data.watchers = fresh.watchers;
    store::save(ctx.store.as_ref(), &target.org_name, &record).await?;
    Ok(SyncStatus::Merged)
}
