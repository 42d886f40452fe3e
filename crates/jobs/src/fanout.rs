use gitpulse_core::models::{Dataset, RepoTarget, SYNCED_DATASETS};
use tokio::task::JoinSet;

use crate::{DatasetOutcome, JobContext, SyncStatus, sync_dataset};

/// Outcomes of every dataset synchronizer launched for one repository.
#[derive(Debug, Clone)]
pub struct RepoSyncReport {
    pub target: RepoTarget,
    /// One entry per synced dataset, in launch order.
    pub outcomes: Vec<(Dataset, DatasetOutcome)>,
}

impl RepoSyncReport {
    /// The first dataset that hit the provider's quota, with its message.
    pub fn rate_limit(&self) -> Option<(Dataset, &str)> {
        self.outcomes.iter().find_map(|(dataset, outcome)| match outcome {
            DatasetOutcome::RateLimited(message) => Some((*dataset, message.as_str())),
            _ => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| !matches!(o, DatasetOutcome::Ok(_))).count()
    }
}

/// Run every synchronizer for `target` concurrently and wait for all of them,
/// whether or not some fail.
pub async fn sync_repository(ctx: &JobContext, target: &RepoTarget) -> RepoSyncReport {
    struct TaskResult {
        dataset: Dataset,
        outcome: DatasetOutcome,
    }

    let mut set = JoinSet::new();
    for &dataset in SYNCED_DATASETS {
        let ctx = ctx.clone();
        let target = target.clone();
        set.spawn(async move {
            let result = sync_dataset(&ctx, dataset, &target).await;
            TaskResult { dataset, outcome: DatasetOutcome::from_result(result) }
        });
    }

    let mut outcomes = Vec::with_capacity(SYNCED_DATASETS.len());
    while let Some(join_result) = set.join_next().await {
        match join_result {
            Ok(TaskResult { dataset, outcome }) => {
                match &outcome {
                    DatasetOutcome::Ok(SyncStatus::Skipped | SyncStatus::Unchanged) => {
                        tracing::debug!("{:?}: {} {:?}", target, dataset, outcome);
                    }
                    DatasetOutcome::Ok(status) => {
                        tracing::info!("{:?}: {} {:?}", target, dataset, status);
                    }
                    DatasetOutcome::RateLimited(message) => {
                        tracing::warn!("{:?}: {} rate limited: {}", target, dataset, message);
                    }
                    DatasetOutcome::TransientError(message) => {
                        tracing::error!("{:?}: failed to sync {}: {}", target, dataset, message);
                    }
                }
                outcomes.push((dataset, outcome));
            }
            Err(e) => {
                tracing::error!("{:?}: dataset task failed: {:?}", target, e);
            }
        }
    }
    // Tasks that panicked never reported back.
    for &dataset in SYNCED_DATASETS {
        if !outcomes.iter().any(|(d, _)| *d == dataset) {
            outcomes.push((dataset, DatasetOutcome::TransientError("TASK FAILED".to_string())));
        }
    }
    outcomes.sort_by_key(|(dataset, _)| SYNCED_DATASETS.iter().position(|d| d == dataset));
    RepoSyncReport { target: target.clone(), outcomes }
}
