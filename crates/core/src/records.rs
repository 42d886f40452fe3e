//! Persisted dataset documents.
//!
//! Every document carries the repository identity next to its payload; the
//! payload type decides which [`Dataset`] the document belongs to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::models::{Dataset, RepoTarget};

/// Payload types stored in the dataset store.
pub trait DatasetKind: Serialize + DeserializeOwned + Send + Sync + 'static {
    const DATASET: Dataset;
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub repo_id: u64,
    pub repo_name: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(target: &RepoTarget, data: T) -> Self {
        Self { repo_id: target.repo_id, repo_name: target.repo_name.clone(), data }
    }
}

/// One calendar day of a time-series dataset.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    /// ISO-8601 UTC timestamp at the start of the day.
    pub date: String,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniques: Option<u64>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Watchers {
    pub list: Vec<DailyCount>,
    pub watchers: u64,
}

impl DatasetKind for Watchers {
    const DATASET: Dataset = Dataset::Watchers;
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Clones {
    pub list: Vec<DailyCount>,
}

impl DatasetKind for Clones {
    const DATASET: Dataset = Dataset::Clones;
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Views {
    pub list: Vec<DailyCount>,
}

impl DatasetKind for Views {
    const DATASET: Dataset = Dataset::Views;
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Publication timestamp, or creation timestamp for unpublished releases.
    pub date: String,
    #[serde(default)]
    pub prerelease: bool,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Releases {
    pub list: Vec<Release>,
}

impl DatasetKind for Releases {
    const DATASET: Dataset = Dataset::Releases;
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ActionRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub event: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    pub head_sha: String,
    pub run_number: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Actions {
    pub list: Vec<ActionRun>,
}

impl DatasetKind for Actions {
    const DATASET: Dataset = Dataset::Actions;
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Fork {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Forks {
    pub list: Vec<Fork>,
}

impl DatasetKind for Forks {
    const DATASET: Dataset = Dataset::Forks;
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// `None` when the repository has no detectable license.
    pub license: Option<LicenseInfo>,
}

impl DatasetKind for License {
    const DATASET: Dataset = Dataset::License;
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Language {
    /// Bytes of code per language.
    pub language: BTreeMap<String, u64>,
}

impl DatasetKind for Language {
    const DATASET: Dataset = Dataset::Language;
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RepoTree {
    pub list: Vec<TreeEntry>,
}

impl DatasetKind for RepoTree {
    const DATASET: Dataset = Dataset::RepoTree;
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CommitEntry {
    #[serde(default)]
    pub sha: Option<String>,
    pub date: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Commits {
    pub list: Vec<CommitEntry>,
}

impl DatasetKind for Commits {
    const DATASET: Dataset = Dataset::Commits;
}
