use async_trait::async_trait;
use url::Url;

use crate::models::RemoteRepository;

/// Accept header for stargazer listings that include `starred_at`.
pub const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: Url,
    pub token: &'a str,
    pub accept: Option<&'a str>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(url: Url, token: &'a str) -> Self { Self { url, token, accept: None } }

    pub fn accept(mut self, accept: &'a str) -> Self {
        self.accept = Some(accept);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub body: serde_json::Value,
    /// Value of the provider's remaining-quota header, when present.
    pub quota_remaining: Option<u64>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String, quota_remaining: Option<u64> },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn api(status: u16, message: &str, quota_remaining: Option<u64>) -> Self {
        Self::Api { status, message: message.to_uppercase(), quota_remaining }
    }

    /// Uppercased failure message.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.to_uppercase(),
            Self::Transport(message) | Self::Decode(message) => message.to_uppercase(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, message, .. } => {
                *status == 404 || message.eq_ignore_ascii_case("not found")
            }
            _ => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Api { status: 403 | 429, quota_remaining: Some(0), .. } => true,
            _ => is_rate_limit_message(&self.message()),
        }
    }
}

/// Whether a provider message reports quota exhaustion.
pub fn is_rate_limit_message(message: &str) -> bool {
    let message = message.to_uppercase();
    message.contains("API LIMIT") || message.contains("RATE LIMIT")
}

/// Authenticated access to the remote metrics provider.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// GET a JSON document.
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchResponse, FetchError>;

    /// List every repository of an organization.
    async fn list_repositories(
        &self,
        org_name: &str,
        token: &str,
    ) -> Result<Vec<RemoteRepository>, FetchError>;
}
