//! One synchronizer per dataset. Each reconciles the stored record for a
//! repository with a fresh fetch and writes the result back.

mod history;
mod repo_tree;
mod snapshot;
mod traffic;
mod watchers;

use anyhow::{Result, bail};
use gitpulse_core::{
    models::{Dataset, RepoTarget},
    records::{Clones, Views},
    util::format_date,
};
use time::UtcDateTime;

use crate::{JobContext, SyncStatus};

/// Synchronize a single dataset of `target`.
pub async fn sync_dataset(
    ctx: &JobContext,
    dataset: Dataset,
    target: &RepoTarget,
) -> Result<SyncStatus> {
    match dataset {
        Dataset::Watchers => watchers::sync(ctx, target).await,
        Dataset::Clones => traffic::sync::<Clones>(ctx, target).await,
        Dataset::Views => traffic::sync::<Views>(ctx, target).await,
        Dataset::Releases => history::sync_releases(ctx, target).await,
        Dataset::Actions => history::sync_actions(ctx, target).await,
        Dataset::Forks => snapshot::sync_forks(ctx, target).await,
        Dataset::License => snapshot::sync_license(ctx, target).await,
        Dataset::Language => snapshot::sync_language(ctx, target).await,
        Dataset::RepoTree => repo_tree::sync(ctx, target).await,
        Dataset::Commits => bail!("{} is not synchronized by the metrics job", dataset),
    }
}

/// Current UTC calendar day as `YYYY-MM-DD`.
fn today() -> String { format_date(UtcDateTime::now().date()) }
