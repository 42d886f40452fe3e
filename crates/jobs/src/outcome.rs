use anyhow::Result;
use gitpulse_core::api::{FetchError, is_rate_limit_message};

/// What a synchronizer did with its dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No stored record existed; the fresh payload was written as-is.
    Created,
    /// Stored and fresh data were merged and written back.
    Merged,
    /// The stored record was overwritten with the fresh snapshot.
    Replaced,
    /// Nothing new to write.
    Unchanged,
    /// Preconditions were missing; nothing was fetched or written.
    Skipped,
}

/// Result of one dataset synchronization within a repository fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetOutcome {
    Ok(SyncStatus),
    /// The provider refused the request for quota reasons. Carries the
    /// uppercased provider message.
    RateLimited(String),
    TransientError(String),
}

impl DatasetOutcome {
    pub fn from_result(result: Result<SyncStatus>) -> Self {
        match result {
            Ok(status) => Self::Ok(status),
            Err(e) => Self::from_error(&e),
        }
    }

    pub fn from_error(error: &anyhow::Error) -> Self {
        if let Some(fetch) = error.chain().find_map(|e| e.downcast_ref::<FetchError>()) {
            if fetch.is_rate_limited() {
                return Self::RateLimited(fetch.message());
            }
        }
        let message = format!("{error:#}").to_uppercase();
        if is_rate_limit_message(&message) {
            Self::RateLimited(message)
        } else {
            Self::TransientError(message)
        }
    }

    pub fn is_rate_limited(&self) -> bool { matches!(self, Self::RateLimited(_)) }
}
