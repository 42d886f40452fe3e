#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use gitpulse_core::{
    api::{FetchError, FetchRequest, FetchResponse, MetricsApi},
    config::{Config, DbConfig, GitHubConfig, SchedulerConfig},
    models::{
        Dataset, JobKey, JobRecord, JobUpdate, OrgStatus, OrgUpdate, Organization,
        RemoteRepository, RepoTarget, Repository,
    },
    store::{DatasetStore, Directory, JobQueue},
};
use gitpulse_jobs::JobContext;
use serde_json::Value;
use time::UtcDateTime;

pub const HOST: &str = "api.github.test";
pub const INSTALLATION_ID: u64 = 1;
pub const ORG: &str = "acme";

#[derive(Debug, Clone)]
pub struct Requested {
    pub path: String,
    pub query: Option<String>,
    pub accept: Option<String>,
}

/// Serves canned JSON by URL path; unknown paths answer 404.
#[derive(Default)]
pub struct FakeApi {
    routes: Mutex<HashMap<String, Result<Value, FetchError>>>,
    listings: Mutex<HashMap<String, Result<Vec<RemoteRepository>, FetchError>>>,
    requests: Mutex<Vec<Requested>>,
    list_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn route(&self, path: &str, body: Value) {
        self.routes.lock().unwrap().insert(path.to_string(), Ok(body));
    }

    pub fn fail(&self, path: &str, error: FetchError) {
        self.routes.lock().unwrap().insert(path.to_string(), Err(error));
    }

    pub fn list(&self, org_name: &str, repositories: Vec<RemoteRepository>) {
        self.listings.lock().unwrap().insert(org_name.to_string(), Ok(repositories));
    }

    pub fn fail_list(&self, org_name: &str, error: FetchError) {
        self.listings.lock().unwrap().insert(org_name.to_string(), Err(error));
    }

    pub fn requests(&self) -> Vec<Requested> { self.requests.lock().unwrap().clone() }

    pub fn requested(&self, prefix: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|r| r.path.starts_with(prefix))
    }

    pub fn list_calls(&self) -> usize { self.list_calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl MetricsApi for FakeApi {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchResponse, FetchError> {
        let path = request.url.path().to_string();
        self.requests.lock().unwrap().push(Requested {
            path: path.clone(),
            query: request.url.query().map(str::to_string),
            accept: request.accept.map(str::to_string),
        });
        match self.routes.lock().unwrap().get(&path) {
            Some(Ok(body)) => Ok(FetchResponse { body: body.clone(), quota_remaining: Some(4999) }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(FetchError::api(404, "Not Found", Some(4999))),
        }
    }

    async fn list_repositories(
        &self,
        org_name: &str,
        _token: &str,
    ) -> Result<Vec<RemoteRepository>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listings.lock().unwrap().get(org_name).cloned().unwrap_or_else(|| Ok(vec![]))
    }
}

#[derive(Default)]
struct State {
    documents: HashMap<(Dataset, u64), Value>,
    writes: Vec<(Dataset, u64)>,
    orgs: HashMap<u64, Organization>,
    repositories: BTreeMap<u64, (String, Repository)>,
    jobs: HashMap<JobKey, JobRecord>,
}

/// In-memory dataset store, job queue and directory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn put(&self, dataset: Dataset, repo_id: u64, document: Value) {
        self.state.lock().unwrap().documents.insert((dataset, repo_id), document);
    }

    pub fn document(&self, dataset: Dataset, repo_id: u64) -> Option<Value> {
        self.state.lock().unwrap().documents.get(&(dataset, repo_id)).cloned()
    }

    pub fn writes(&self) -> Vec<(Dataset, u64)> { self.state.lock().unwrap().writes.clone() }

    pub fn add_org(&self, org: Organization) {
        self.state.lock().unwrap().orgs.insert(org.installation_id, org);
    }

    pub fn org(&self, installation_id: u64) -> Option<Organization> {
        self.state.lock().unwrap().orgs.get(&installation_id).cloned()
    }

    pub fn add_repository(&self, repo: Repository) {
        self.state.lock().unwrap().repositories.insert(repo.repo_id, (repo.org_name.clone(), repo));
    }

    pub fn repository(&self, repo_id: u64) -> Option<Repository> {
        self.state.lock().unwrap().repositories.get(&repo_id).map(|(_, r)| r.clone())
    }

    pub fn add_job(&self, job: JobRecord) {
        let key = JobKey { installation_id: job.installation_id, task: job.task.clone() };
        self.state.lock().unwrap().jobs.insert(key, job);
    }

    pub fn job(&self, installation_id: u64) -> Option<JobRecord> {
        self.state.lock().unwrap().jobs.get(&JobKey::metrics(installation_id)).cloned()
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn get_document(&self, dataset: Dataset, repo_id: u64) -> Result<Option<Value>> {
        Ok(self.document(dataset, repo_id))
    }

    async fn set_document(
        &self,
        dataset: Dataset,
        _org_name: &str,
        repo_id: u64,
        _repo_name: &str,
        document: Value,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.documents.insert((dataset, repo_id), document);
        state.writes.push((dataset, repo_id));
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryStore {
    async fn get_job(&self, key: &JobKey) -> Result<Option<JobRecord>> {
        Ok(self.state.lock().unwrap().jobs.get(key).cloned())
    }

    async fn submit(&self, key: &JobKey, update: JobUpdate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let job = state.jobs.entry(key.clone()).or_insert_with(|| JobRecord {
            installation_id: key.installation_id,
            task: key.task.clone(),
            expires_at: None,
            processing: false,
        });
        if let Some(expires_at) = update.expires_at {
            job.expires_at = Some(expires_at);
        }
        if let Some(processing) = update.processing {
            job.processing = processing;
        }
        Ok(())
    }

    async fn try_start(&self, key: &JobKey) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let job = state.jobs.entry(key.clone()).or_insert_with(|| JobRecord {
            installation_id: key.installation_id,
            task: key.task.clone(),
            expires_at: None,
            processing: false,
        });
        if job.processing {
            return Ok(false);
        }
        job.processing = true;
        Ok(true)
    }

    async fn due_jobs(&self, task: &str, now: UtcDateTime) -> Result<Vec<JobRecord>> {
        let state = self.state.lock().unwrap();
        let mut jobs: Vec<JobRecord> = state
            .jobs
            .values()
            .filter(|job| job.task == task && !job.processing)
            .filter(|job| job.expires_at.is_none_or(|expires_at| expires_at <= now))
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.installation_id);
        Ok(jobs)
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn get_org(&self, installation_id: u64) -> Result<Option<Organization>> {
        Ok(self.org(installation_id))
    }

    async fn update_org(&self, installation_id: u64, update: OrgUpdate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(org) = state.orgs.get_mut(&installation_id) else {
            bail!("Installation {installation_id} not found");
        };
        if let Some(exceeded) = update.api_limit_exceeded {
            org.api_limit_exceeded = exceeded;
        }
        if let Some(count) = update.api_limit_reached_count {
            org.api_limit_reached_count = count;
        }
        Ok(())
    }

    async fn replace_repositories(
        &self,
        org_name: &str,
        repositories: &[RemoteRepository],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for (owner, repo) in state.repositories.values_mut() {
            if owner == org_name {
                repo.deleted = true;
            }
        }
        for remote in repositories {
            let entry = state.repositories.entry(remote.repo_id).or_insert_with(|| {
                (org_name.to_string(), Repository {
                    repo_id: remote.repo_id,
                    org_name: org_name.to_string(),
                    repo_name: remote.repo_name.clone(),
                    onboard_complete: false,
                    enabled: false,
                    deleted: false,
                })
            });
            entry.1.repo_name = remote.repo_name.clone();
            entry.1.deleted = false;
        }
        Ok(())
    }

    async fn eligible_repositories(&self, org_name: &str) -> Result<Vec<Repository>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .repositories
            .values()
            .filter(|(owner, repo)| owner == org_name && repo.is_eligible())
            .map(|(_, repo)| repo.clone())
            .collect())
    }
}

pub fn config() -> Config {
    Config {
        db: DbConfig { url: "sqlite::memory:".into() },
        github: GitHubConfig { host: HOST.into(), ..Default::default() },
        scheduler: SchedulerConfig::default(),
    }
}

pub fn context(api: &Arc<FakeApi>, store: &Arc<MemoryStore>) -> JobContext {
    JobContext {
        config: Arc::new(config()),
        api: api.clone(),
        store: store.clone(),
        queue: store.clone(),
        directory: store.clone(),
    }
}

pub fn org(installation_id: u64, org_name: &str) -> Organization {
    Organization {
        installation_id,
        org_name: org_name.to_string(),
        token: "t0ken".into(),
        status: OrgStatus::Active,
        onboard_complete: true,
        api_limit_exceeded: false,
        api_limit_reached_count: 0,
    }
}

pub fn repository(repo_id: u64, org_name: &str, repo_name: &str) -> Repository {
    Repository {
        repo_id,
        org_name: org_name.to_string(),
        repo_name: repo_name.to_string(),
        onboard_complete: true,
        enabled: true,
        deleted: false,
    }
}

pub fn remote(repo_id: u64, repo_name: &str) -> RemoteRepository {
    RemoteRepository { repo_id, repo_name: repo_name.to_string(), archived: false }
}

pub fn target(repo_id: u64, repo_name: &str) -> RepoTarget {
    RepoTarget::new(&org(INSTALLATION_ID, ORG), &repository(repo_id, ORG, repo_name))
}

/// An onboarded organization owning onboarded repositories, all listed remotely.
pub fn seed(api: &FakeApi, store: &MemoryStore, repos: &[(u64, &str)]) {
    store.add_org(org(INSTALLATION_ID, ORG));
    for &(repo_id, repo_name) in repos {
        store.add_repository(repository(repo_id, ORG, repo_name));
    }
    api.list(ORG, repos.iter().map(|&(id, name)| remote(id, name)).collect());
}
