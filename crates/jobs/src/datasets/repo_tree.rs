use anyhow::Result;
use gitpulse_core::{
    merge::latest_commit,
    models::RepoTarget,
    records::{Commits, Record},
    store,
};

use crate::{JobContext, SyncStatus, remote};

/// Snapshot the file tree at the most recent stored commit.
pub async fn sync(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    let Some(commits) = store::load::<Commits>(ctx.store.as_ref(), target.repo_id).await? else {
        tracing::debug!("No commits stored for {:?}, skipping tree", target);
        return Ok(SyncStatus::Skipped);
    };
    let Some(sha) = latest_commit(&commits.data.list).and_then(|c| c.sha.as_deref()) else {
        tracing::debug!("Latest commit of {:?} has no sha, skipping tree", target);
        return Ok(SyncStatus::Skipped);
    };
    let Some(tree) = remote::fetch_tree(ctx, target, sha).await? else {
        tracing::info!("Tree {} not found for {:?}", sha, target);
        return Ok(SyncStatus::Skipped);
    };
    store::save(ctx.store.as_ref(), &target.org_name, &Record::new(target, tree)).await?;
    Ok(SyncStatus::Replaced)
}
