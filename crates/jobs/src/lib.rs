mod datasets;
mod fanout;
mod jobs;
mod outcome;
mod remote;

use std::sync::Arc;

use gitpulse_core::{
    api::MetricsApi,
    config::Config,
    store::{DatasetStore, Directory, JobQueue},
};
use gitpulse_db::Database;
use gitpulse_github::GitHub;

pub use datasets::sync_dataset;
pub use fanout::{RepoSyncReport, sync_repository};
pub use jobs::{RunStatus, dispatch_due_jobs, enqueue_now, process_metrics_job};
pub use outcome::{DatasetOutcome, SyncStatus};

/// Shared context available to all job handlers.
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<Config>,
    pub api: Arc<dyn MetricsApi>,
    pub store: Arc<dyn DatasetStore>,
    pub queue: Arc<dyn JobQueue>,
    pub directory: Arc<dyn Directory>,
}

impl JobContext {
    /// Context backed by the SQLite database and the GitHub API.
    pub fn new(config: Arc<Config>, db: Arc<Database>, github: Arc<GitHub>) -> Self {
        Self { config, api: github, store: db.clone(), queue: db.clone(), directory: db }
    }

    pub(crate) fn host(&self) -> &str { &self.config.github.host }
}
