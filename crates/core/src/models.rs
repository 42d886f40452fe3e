use std::{convert::Infallible, fmt, str::FromStr};

use time::UtcDateTime;

/// Task name of the recurring metrics job.
pub const METRICS_TASK: &str = "Metrics";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OrgStatus {
    Active,
    Other(String),
}

impl OrgStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

impl FromStr for OrgStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("active") {
            Ok(Self::Active)
        } else {
            Ok(Self::Other(s.to_ascii_uppercase()))
        }
    }
}

impl fmt::Display for OrgStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Eq, PartialEq)]
pub struct Organization {
    pub installation_id: u64,
    pub org_name: String,
    pub token: String,
    pub status: OrgStatus,
    pub onboard_complete: bool,
    pub api_limit_exceeded: bool,
    pub api_limit_reached_count: i64,
}

impl fmt::Debug for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organization")
            .field("installation_id", &self.installation_id)
            .field("org_name", &self.org_name)
            .field("token", &"[redacted]")
            .field("status", &self.status)
            .field("onboard_complete", &self.onboard_complete)
            .field("api_limit_exceeded", &self.api_limit_exceeded)
            .field("api_limit_reached_count", &self.api_limit_reached_count)
            .finish()
    }
}

/// Partial update of an organization row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OrgUpdate {
    pub api_limit_exceeded: Option<bool>,
    pub api_limit_reached_count: Option<i64>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Repository {
    pub repo_id: u64,
    pub org_name: String,
    pub repo_name: String,
    pub onboard_complete: bool,
    pub enabled: bool,
    pub deleted: bool,
}

impl Repository {
    pub fn is_eligible(&self) -> bool { self.onboard_complete && self.enabled && !self.deleted }
}

/// Repository as listed by the remote provider.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemoteRepository {
    pub repo_id: u64,
    pub repo_name: String,
    pub archived: bool,
}

/// Everything a dataset synchronizer needs to address one repository.
///
/// Built once per repository and cloned into each synchronizer task, so no
/// synchronizer can observe another's parameters.
#[derive(Clone)]
pub struct RepoTarget {
    pub org_name: String,
    pub repo_id: u64,
    pub repo_name: String,
    pub token: String,
}

impl RepoTarget {
    pub fn new(org: &Organization, repo: &Repository) -> Self {
        Self {
            org_name: org.org_name.clone(),
            repo_id: repo.repo_id,
            repo_name: repo.repo_name.clone(),
            token: org.token.clone(),
        }
    }
}

impl fmt::Debug for RepoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.org_name, self.repo_name, self.repo_id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dataset {
    Watchers,
    Releases,
    RepoTree,
    Clones,
    Views,
    Actions,
    Forks,
    License,
    Language,
    /// Populated elsewhere; read by the repo tree synchronizer.
    Commits,
}

/// Datasets merged on every run, in launch order.
pub const SYNCED_DATASETS: &[Dataset] = &[
    Dataset::Actions,
    Dataset::Watchers,
    Dataset::Clones,
    Dataset::Views,
    Dataset::Forks,
    Dataset::Releases,
    Dataset::License,
    Dataset::Language,
    Dataset::RepoTree,
];

impl Dataset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Watchers => "watchers",
            Self::Releases => "releases",
            Self::RepoTree => "repo_tree",
            Self::Clones => "clones",
            Self::Views => "views",
            Self::Actions => "actions",
            Self::Forks => "forks",
            Self::License => "license",
            Self::Language => "language",
            Self::Commits => "commits",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct JobKey {
    pub installation_id: u64,
    pub task: String,
}

impl JobKey {
    pub fn metrics(installation_id: u64) -> Self {
        Self { installation_id, task: METRICS_TASK.to_string() }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct JobRecord {
    pub installation_id: u64,
    pub task: String,
    pub expires_at: Option<UtcDateTime>,
    pub processing: bool,
}

/// Fields to set on a job record; the record is created if missing.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JobUpdate {
    pub expires_at: Option<UtcDateTime>,
    pub processing: Option<bool>,
}

impl JobUpdate {
    pub fn processing(processing: bool) -> Self {
        Self { expires_at: None, processing: Some(processing) }
    }

    pub fn reschedule(expires_at: UtcDateTime) -> Self {
        Self { expires_at: Some(expires_at), processing: Some(false) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_status_parse() {
        assert_eq!("ACTIVE".parse::<OrgStatus>(), Ok(OrgStatus::Active));
        assert_eq!("active".parse::<OrgStatus>(), Ok(OrgStatus::Active));
        assert_eq!("suspended".parse::<OrgStatus>(), Ok(OrgStatus::Other("SUSPENDED".into())));
    }

    #[test]
    fn test_synced_dataset_names() {
        let names: std::collections::BTreeSet<_> =
            SYNCED_DATASETS.iter().map(|dataset| dataset.to_string()).collect();
        assert_eq!(names.len(), 9);
        assert!(names.contains("repo_tree"));
        assert!(!SYNCED_DATASETS.contains(&Dataset::Commits));
    }

    #[test]
    fn test_token_not_in_debug() {
        let org = Organization {
            installation_id: 1,
            org_name: "acme".into(),
            token: "ghs_secret".into(),
            status: OrgStatus::Active,
            onboard_complete: true,
            api_limit_exceeded: false,
            api_limit_reached_count: 0,
        };
        assert!(!format!("{org:?}").contains("ghs_secret"));
    }
}
