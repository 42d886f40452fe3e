//! Datasets overwritten with the latest snapshot on every run.

use anyhow::Result;
use gitpulse_core::{
    models::RepoTarget,
    records::{DatasetKind, Record},
    store,
};

use crate::{JobContext, SyncStatus, remote};

async fn replace<T: DatasetKind>(
    ctx: &JobContext,
    target: &RepoTarget,
    data: T,
) -> Result<SyncStatus> {
    store::save(ctx.store.as_ref(), &target.org_name, &Record::new(target, data)).await?;
    Ok(SyncStatus::Replaced)
}

pub async fn sync_forks(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    replace(ctx, target, remote::fetch_forks(ctx, target).await?).await
}

pub async fn sync_license(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    replace(ctx, target, remote::fetch_license(ctx, target).await?).await
}

pub async fn sync_language(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    replace(ctx, target, remote::fetch_language(ctx, target).await?).await
}
