//! Fetchers for the remote side of each dataset.
//!
//! Each fetcher issues a single page request (up to 100 items) and maps the
//! provider's JSON into the stored payload type.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use gitpulse_core::{
    api::{FetchError, FetchRequest, STAR_MEDIA_TYPE},
    models::RepoTarget,
    records::{
        ActionRun, Actions, DailyCount, Fork, Forks, Language, License, LicenseInfo, Release,
        Releases, RepoTree, TreeEntry, Watchers,
    },
    util::{api_url, date_key},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::JobContext;

const PER_PAGE: &str = "100";

struct Get<'a> {
    path: &'a [&'a str],
    paged: bool,
    accept: Option<&'a str>,
}

impl<'a> Get<'a> {
    fn new(path: &'a [&'a str]) -> Self { Self { path, paged: false, accept: None } }

    fn paged(mut self) -> Self {
        self.paged = true;
        self
    }

    fn accept(mut self, accept: &'a str) -> Self {
        self.accept = Some(accept);
        self
    }
}

async fn get_raw(
    ctx: &JobContext,
    target: &RepoTarget,
    request: Get<'_>,
) -> Result<Value, FetchError> {
    let mut segments = vec!["repos", target.org_name.as_str(), target.repo_name.as_str()];
    segments.extend_from_slice(request.path);
    let mut url =
        api_url(ctx.host(), &segments).map_err(|e| FetchError::Transport(format!("{e:#}")))?;
    if request.paged {
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);
    }
    let mut fetch = FetchRequest::new(url, &target.token);
    if let Some(accept) = request.accept {
        fetch = fetch.accept(accept);
    }
    let response = ctx.api.fetch(fetch).await?;
    if let Some(remaining) = response.quota_remaining {
        tracing::trace!("{:?}: {} requests remaining", target, remaining);
    }
    Ok(response.body)
}

async fn get<T: DeserializeOwned>(
    ctx: &JobContext,
    target: &RepoTarget,
    request: Get<'_>,
) -> Result<T> {
    let what =
        if request.path.is_empty() { "repository".to_string() } else { request.path.join("/") };
    let body = get_raw(ctx, target, request)
        .await
        .with_context(|| format!("Failed to fetch {what} for {target:?}"))?;
    serde_json::from_value(body).with_context(|| format!("Unexpected {what} response"))
}

#[derive(Deserialize)]
struct RepoSummary {
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Deserialize)]
struct Stargazer {
    starred_at: String,
}

/// Total stargazers plus new stars per day for the first page of stargazers.
pub async fn fetch_watchers(ctx: &JobContext, target: &RepoTarget) -> Result<Watchers> {
    let (summary, stargazers) = tokio::try_join!(
        get::<RepoSummary>(ctx, target, Get::new(&[])),
        get::<Vec<Stargazer>>(
            ctx,
            target,
            Get::new(&["stargazers"]).paged().accept(STAR_MEDIA_TYPE)
        ),
    )?;
    let mut by_day = BTreeMap::<&str, u64>::new();
    for star in &stargazers {
        *by_day.entry(date_key(&star.starred_at)).or_default() += 1;
    }
    let list = by_day
        .into_iter()
        .map(|(day, count)| DailyCount { date: format!("{day}T00:00:00Z"), count, uniques: None })
        .collect();
    Ok(Watchers { list, watchers: summary.stargazers_count })
}

#[derive(Deserialize)]
struct TrafficPoint {
    timestamp: String,
    count: u64,
    #[serde(default)]
    uniques: Option<u64>,
}

/// Daily entries of a traffic endpoint (`clones` or `views`), whose body holds
/// the series under a key of the same name.
pub async fn fetch_traffic(
    ctx: &JobContext,
    target: &RepoTarget,
    kind: &str,
) -> Result<Vec<DailyCount>> {
    let mut body: BTreeMap<String, Value> = get(ctx, target, Get::new(&["traffic", kind])).await?;
    let points: Vec<TrafficPoint> = match body.remove(kind) {
        Some(series) => serde_json::from_value(series)
            .with_context(|| format!("Unexpected traffic/{kind} series"))?,
        None => vec![],
    };
    Ok(points
        .into_iter()
        .map(|p| DailyCount { date: p.timestamp, count: p.count, uniques: p.uniques })
        .collect())
}

#[derive(Deserialize)]
struct WorkflowRuns {
    workflow_runs: Vec<ActionRun>,
}

pub async fn fetch_actions(ctx: &JobContext, target: &RepoTarget) -> Result<Actions> {
    let runs: WorkflowRuns = get(ctx, target, Get::new(&["actions", "runs"]).paged()).await?;
    Ok(Actions { list: runs.workflow_runs })
}

#[derive(Deserialize)]
struct Owner {
    login: String,
}

#[derive(Deserialize)]
struct RemoteFork {
    id: u64,
    full_name: String,
    owner: Option<Owner>,
    created_at: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
}

pub async fn fetch_forks(ctx: &JobContext, target: &RepoTarget) -> Result<Forks> {
    let forks: Vec<RemoteFork> = get(ctx, target, Get::new(&["forks"]).paged()).await?;
    let list = forks
        .into_iter()
        .map(|fork| Fork {
            id: fork.id,
            full_name: fork.full_name,
            owner: fork.owner.map(|o| o.login),
            created_at: fork.created_at,
            stargazers_count: fork.stargazers_count,
        })
        .collect();
    Ok(Forks { list })
}

#[derive(Deserialize)]
struct RemoteRelease {
    id: u64,
    tag_name: String,
    name: Option<String>,
    published_at: Option<String>,
    created_at: String,
    #[serde(default)]
    prerelease: bool,
}

pub async fn fetch_releases(ctx: &JobContext, target: &RepoTarget) -> Result<Releases> {
    let releases: Vec<RemoteRelease> = get(ctx, target, Get::new(&["releases"]).paged()).await?;
    let list = releases
        .into_iter()
        .map(|r| Release {
            id: r.id,
            tag_name: r.tag_name,
            name: r.name,
            date: r.published_at.unwrap_or(r.created_at),
            prerelease: r.prerelease,
        })
        .collect();
    Ok(Releases { list })
}

#[derive(Deserialize)]
struct LicenseBody {
    license: Option<LicenseInfo>,
}

/// The detected license; a repository without one answers 404.
pub async fn fetch_license(ctx: &JobContext, target: &RepoTarget) -> Result<License> {
    match get_raw(ctx, target, Get::new(&["license"])).await {
        Ok(body) => {
            let body: LicenseBody =
                serde_json::from_value(body).context("Unexpected license response")?;
            Ok(License { license: body.license })
        }
        Err(e) if e.is_not_found() => {
            tracing::debug!("No license detected for {:?}", target);
            Ok(License { license: None })
        }
        Err(e) => Err(e).with_context(|| format!("Failed to fetch license for {target:?}")),
    }
}

pub async fn fetch_language(ctx: &JobContext, target: &RepoTarget) -> Result<Language> {
    let language: BTreeMap<String, u64> = get(ctx, target, Get::new(&["languages"])).await?;
    Ok(Language { language })
}

#[derive(Deserialize)]
struct TreeBody {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// Top-level tree of the commit `sha`. `None` when the provider does not know
/// the commit.
pub async fn fetch_tree(
    ctx: &JobContext,
    target: &RepoTarget,
    sha: &str,
) -> Result<Option<RepoTree>> {
    let body = match get_raw(ctx, target, Get::new(&["git", "trees", sha])).await {
        Ok(body) => body,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to fetch tree {sha} for {target:?}"));
        }
    };
    let body: TreeBody = serde_json::from_value(body).context("Unexpected tree response")?;
    if body.truncated {
        tracing::warn!("Tree {} for {:?} was truncated by the provider", sha, target);
    }
    Ok(Some(RepoTree { list: body.tree }))
}
