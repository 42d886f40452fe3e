use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gitpulse_core::{
    api::{FetchError, FetchRequest, FetchResponse, MetricsApi},
    config::GitHubConfig,
    models::RemoteRepository,
};
use octocrab::Octocrab;
use reqwest::{
    StatusCode,
    header::{ACCEPT, HeaderMap},
};
use serde::Deserialize;

const DEFAULT_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

#[derive(Clone)]
pub struct GitHub {
    http: reqwest::Client,
    host: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GitHub {
    pub fn new(config: &GitHubConfig) -> Result<Arc<Self>> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Arc::new(Self { http, host: config.host.trim_end_matches('/').to_string() }))
    }

    fn client_for_token(&self, token: &str) -> Result<Octocrab, FetchError> {
        Octocrab::builder()
            .base_uri(format!("https://{}", self.host))
            .map_err(from_octocrab)?
            .personal_token(token.to_string())
            .build()
            .map_err(from_octocrab)
    }
}

/// Remaining request quota reported by the provider.
fn quota_remaining(headers: &HeaderMap) -> Option<u64> {
    headers.get("x-ratelimit-remaining").and_then(|v| v.to_str().ok()).and_then(|v| v.parse().ok())
}

fn from_octocrab(error: octocrab::Error) -> FetchError {
    match error {
        octocrab::Error::GitHub { source, .. } => {
            FetchError::api(source.status_code.as_u16(), &source.message, None)
        }
        other => FetchError::Transport(other.to_string()),
    }
}

#[async_trait]
impl MetricsApi for GitHub {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchResponse, FetchError> {
        let response = self
            .http
            .get(request.url.clone())
            .bearer_auth(request.token)
            .header(ACCEPT, request.accept.unwrap_or(DEFAULT_MEDIA_TYPE))
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let quota_remaining = quota_remaining(response.headers());
        let status = response.status();
        if status.is_success() {
            let body = if status == StatusCode::NO_CONTENT {
                serde_json::Value::Null
            } else {
                response.json().await.map_err(|e| FetchError::Decode(e.to_string()))?
            };
            return Ok(FetchResponse { body, quota_remaining });
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
        if quota_remaining == Some(0) {
            tracing::warn!("GitHub quota exhausted fetching {}: {}", request.url.path(), message);
        } else {
            tracing::debug!("GitHub returned {} for {}: {}", status, request.url.path(), message);
        }
        Err(FetchError::api(status.as_u16(), &message, quota_remaining))
    }

    async fn list_repositories(
        &self,
        org_name: &str,
        token: &str,
    ) -> Result<Vec<RemoteRepository>, FetchError> {
        let client = self.client_for_token(token)?;
        let page =
            client.orgs(org_name).list_repos().per_page(100).send().await.map_err(from_octocrab)?;
        let repositories = client.all_pages(page).await.map_err(from_octocrab)?;
        tracing::info!("Fetched {} repositories for {}", repositories.len(), org_name);
        Ok(repositories
            .into_iter()
            .map(|repo| RemoteRepository {
                repo_id: repo.id.into_inner(),
                repo_name: repo.name,
                archived: repo.archived.unwrap_or(false),
            })
            .collect())
    }
}
