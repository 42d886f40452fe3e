use anyhow::{Context, Result};
use async_trait::async_trait;
use time::UtcDateTime;

use crate::{
    models::{
        Dataset, JobKey, JobRecord, JobUpdate, OrgUpdate, Organization, RemoteRepository,
        Repository,
    },
    records::{DatasetKind, Record},
};

/// Per-dataset documents keyed by repository id.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn get_document(
        &self,
        dataset: Dataset,
        repo_id: u64,
    ) -> Result<Option<serde_json::Value>>;

    /// Replace the whole document for `(dataset, repo_id)`.
    async fn set_document(
        &self,
        dataset: Dataset,
        org_name: &str,
        repo_id: u64,
        repo_name: &str,
        document: serde_json::Value,
    ) -> Result<()>;
}

pub async fn load<T: DatasetKind>(
    store: &dyn DatasetStore,
    repo_id: u64,
) -> Result<Option<Record<T>>> {
    let Some(document) = store.get_document(T::DATASET, repo_id).await? else {
        return Ok(None);
    };
    let record = serde_json::from_value(document)
        .with_context(|| format!("Malformed {} document for repo {repo_id}", T::DATASET))?;
    Ok(Some(record))
}

pub async fn save<T: DatasetKind>(
    store: &dyn DatasetStore,
    org_name: &str,
    record: &Record<T>,
) -> Result<()> {
    let document = serde_json::to_value(record)?;
    store
        .set_document(T::DATASET, org_name, record.repo_id, &record.repo_name, document)
        .await
        .with_context(|| format!("Failed to store {} for repo {}", T::DATASET, record.repo_id))
}

/// Scheduled job records.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn get_job(&self, key: &JobKey) -> Result<Option<JobRecord>>;

    /// Upsert: create the record if missing, then set the given fields.
    async fn submit(&self, key: &JobKey, update: JobUpdate) -> Result<()>;

    /// Set `processing` only if it is currently unset. Returns `false` when
    /// another run already holds the record.
    async fn try_start(&self, key: &JobKey) -> Result<bool>;

    /// Records for `task` that are not processing and expire at or before `now`.
    async fn due_jobs(&self, task: &str, now: UtcDateTime) -> Result<Vec<JobRecord>>;
}

/// Organizations and their repositories.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_org(&self, installation_id: u64) -> Result<Option<Organization>>;

    async fn update_org(&self, installation_id: u64, update: OrgUpdate) -> Result<()>;

    /// Replace the organization's repository list with `repositories`, keyed by repo id.
    async fn replace_repositories(
        &self,
        org_name: &str,
        repositories: &[RemoteRepository],
    ) -> Result<()>;

    /// Onboarded, enabled and not deleted repositories of the organization.
    async fn eligible_repositories(&self, org_name: &str) -> Result<Vec<Repository>>;
}
