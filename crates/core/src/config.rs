use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DbConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// API host, without scheme. GitHub Enterprise uses e.g. `github.example.com/api/v3`.
    #[serde(default = "default_github_host")]
    pub host: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self { Self { host: default_github_host(), user_agent: default_user_agent() } }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// How often to look for due jobs (English or cron syntax).
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Delay between the end of a successful run and the next one.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_task")]
    pub task: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            interval_secs: default_interval_secs(),
            task: default_task(),
        }
    }
}

fn default_github_host() -> String { "api.github.com".to_string() }

fn default_user_agent() -> String { "gitpulse".to_string() }

fn default_schedule() -> String { "every 1 minute".to_string() }

fn default_interval_secs() -> u64 { 3600 }

fn default_task() -> String { crate::models::METRICS_TASK.to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "db": { "url": "sqlite://metrics.db" }
        }))
        .unwrap();
        assert_eq!(config.github.host, "api.github.com");
        assert_eq!(config.scheduler.interval_secs, 3600);
        assert_eq!(config.scheduler.task, "Metrics");
        assert_eq!(config.scheduler.schedule, "every 1 minute");
    }
}
