use anyhow::{Context, Result};
use async_trait::async_trait;
use gitpulse_core::{
    config::DbConfig,
    models::{
        Dataset, JobKey, JobRecord, JobUpdate, OrgStatus, OrgUpdate, Organization,
        RemoteRepository, Repository,
    },
    store::{DatasetStore, Directory, JobQueue},
    util::{format_timestamp, parse_timestamp},
};
use sqlx::{
    Pool, Row, Sqlite,
    migrate::MigrateDatabase,
    sqlite::{SqlitePoolOptions, SqliteRow},
};
use time::UtcDateTime;

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(config: &DbConfig) -> Result<Self> {
        let in_memory = config.url.contains(":memory:");
        if !in_memory && !Sqlite::database_exists(&config.url).await.unwrap_or(false) {
            tracing::info!(url = %config.url, "Creating database");
            Sqlite::create_database(&config.url).await.context("Failed to create database")?;
            tracing::info!("Database created");
        }
        // Every connection to an in-memory database is a separate database
        let mut options = SqlitePoolOptions::new().max_connections(8);
        if in_memory {
            options = options.max_connections(1).idle_timeout(None).max_lifetime(None);
        }
        let pool = options
            .connect(&config.url)
            .await
            .context("Failed to connect to database")?;
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    pub async fn close(&self) { self.pool.close().await }

    /// Insert or replace an organization.
    pub async fn upsert_org(&self, org: &Organization) -> Result<()> {
        let installation_id = org.installation_id as i64;
        sqlx::query(
            r#"
            INSERT INTO organizations (installation_id, org_name, token, org_status, onboard_complete, api_limit_exceeded, api_limit_reached_count)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (installation_id) DO UPDATE
            SET org_name = excluded.org_name, token = excluded.token, org_status = excluded.org_status,
                onboard_complete = excluded.onboard_complete, api_limit_exceeded = excluded.api_limit_exceeded,
                api_limit_reached_count = excluded.api_limit_reached_count, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(installation_id)
        .bind(&org.org_name)
        .bind(&org.token)
        .bind(org.status.as_str())
        .bind(org.onboard_complete)
        .bind(org.api_limit_exceeded)
        .bind(org.api_limit_reached_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Update the onboarding and enablement flags of a repository.
    pub async fn set_repository_flags(
        &self,
        repo_id: u64,
        onboard_complete: bool,
        enabled: bool,
    ) -> Result<()> {
        let repo_id_db = repo_id as i64;
        let result = sqlx::query(
            r#"
            UPDATE repositories
            SET onboard_complete = ?, repo_enabled = ?, updated_at = CURRENT_TIMESTAMP
            WHERE repo_id = ?
            "#,
        )
        .bind(onboard_complete)
        .bind(enabled)
        .bind(repo_id_db)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Repository {repo_id} not found");
        }
        Ok(())
    }
}

#[async_trait]
impl DatasetStore for Database {
    async fn get_document(
        &self,
        dataset: Dataset,
        repo_id: u64,
    ) -> Result<Option<serde_json::Value>> {
        let repo_id_db = repo_id as i64;
        let Some(row) = sqlx::query(
            r#"
            SELECT data
            FROM dataset_records
            WHERE dataset = ? AND repo_id = ?
            "#,
        )
        .bind(dataset.as_str())
        .bind(repo_id_db)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let data: String = row.try_get("data")?;
        let document = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {dataset} document for repo {repo_id}"))?;
        Ok(Some(document))
    }

    async fn set_document(
        &self,
        dataset: Dataset,
        org_name: &str,
        repo_id: u64,
        repo_name: &str,
        document: serde_json::Value,
    ) -> Result<()> {
        let repo_id_db = repo_id as i64;
        let data = serde_json::to_string(&document)?;
        sqlx::query(
            r#"
            INSERT INTO dataset_records (dataset, repo_id, org_name, repo_name, data, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (dataset, repo_id) DO UPDATE
            SET org_name = excluded.org_name, repo_name = excluded.repo_name, data = excluded.data,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(dataset.as_str())
        .bind(repo_id_db)
        .bind(org_name)
        .bind(repo_name)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn job_from_row(row: &SqliteRow) -> Result<JobRecord> {
    let expires_at: Option<String> = row.try_get("expires_at")?;
    Ok(JobRecord {
        installation_id: row.try_get::<i64, _>("installation_id")? as u64,
        task: row.try_get("task")?,
        expires_at: expires_at.as_deref().and_then(parse_timestamp),
        processing: row.try_get("processing")?,
    })
}

#[async_trait]
impl JobQueue for Database {
    async fn get_job(&self, key: &JobKey) -> Result<Option<JobRecord>> {
        let installation_id = key.installation_id as i64;
        sqlx::query(
            r#"
            SELECT installation_id, task, expires_at, processing
            FROM jobs
            WHERE installation_id = ? AND task = ?
            "#,
        )
        .bind(installation_id)
        .bind(&key.task)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| job_from_row(&row))
        .transpose()
    }

    async fn submit(&self, key: &JobKey, update: JobUpdate) -> Result<()> {
        let installation_id = key.installation_id as i64;
        let expires_at = update.expires_at.map(format_timestamp);
        sqlx::query(
            r#"
            INSERT INTO jobs (installation_id, task, expires_at, processing, created_at, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT (installation_id, task) DO UPDATE
            SET expires_at = COALESCE(excluded.expires_at, jobs.expires_at),
                processing = COALESCE(?, jobs.processing),
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(installation_id)
        .bind(&key.task)
        .bind(expires_at)
        .bind(update.processing.unwrap_or(false))
        .bind(update.processing)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn try_start(&self, key: &JobKey) -> Result<bool> {
        let installation_id = key.installation_id as i64;
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (installation_id, task, processing, created_at, updated_at)
            VALUES (?, ?, TRUE, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT (installation_id, task) DO UPDATE
            SET processing = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE jobs.processing = FALSE
            "#,
        )
        .bind(installation_id)
        .bind(&key.task)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn due_jobs(&self, task: &str, now: UtcDateTime) -> Result<Vec<JobRecord>> {
        let now = format_timestamp(now);
        let rows = sqlx::query(
            r#"
            SELECT installation_id, task, expires_at, processing
            FROM jobs
            WHERE task = ? AND processing = FALSE AND (expires_at IS NULL OR expires_at <= ?)
            ORDER BY expires_at, installation_id
            "#,
        )
        .bind(task)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(job_from_row).collect()
    }
}

fn repository_from_row(row: &SqliteRow) -> Result<Repository> {
    Ok(Repository {
        repo_id: row.try_get::<i64, _>("repo_id")? as u64,
        org_name: row.try_get("org_name")?,
        repo_name: row.try_get("repo_name")?,
        onboard_complete: row.try_get("onboard_complete")?,
        enabled: row.try_get("repo_enabled")?,
        deleted: row.try_get("deleted")?,
    })
}

#[async_trait]
impl Directory for Database {
    async fn get_org(&self, installation_id: u64) -> Result<Option<Organization>> {
        let installation_id_db = installation_id as i64;
        let Some(row) = sqlx::query(
            r#"
            SELECT org_name, token, org_status, onboard_complete, api_limit_exceeded, api_limit_reached_count
            FROM organizations
            WHERE installation_id = ?
            "#,
        )
        .bind(installation_id_db)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let status: String = row.try_get("org_status")?;
        Ok(Some(Organization {
            installation_id,
            org_name: row.try_get("org_name")?,
            token: row.try_get("token")?,
            status: status.parse::<OrgStatus>().unwrap_or_else(|e| match e {}),
            onboard_complete: row.try_get("onboard_complete")?,
            api_limit_exceeded: row.try_get("api_limit_exceeded")?,
            api_limit_reached_count: row.try_get("api_limit_reached_count")?,
        }))
    }

    async fn update_org(&self, installation_id: u64, update: OrgUpdate) -> Result<()> {
        let installation_id_db = installation_id as i64;
        sqlx::query(
            r#"
            UPDATE organizations
            SET api_limit_exceeded = COALESCE(?, api_limit_exceeded),
                api_limit_reached_count = COALESCE(?, api_limit_reached_count),
                updated_at = CURRENT_TIMESTAMP
            WHERE installation_id = ?
            "#,
        )
        .bind(update.api_limit_exceeded)
        .bind(update.api_limit_reached_count)
        .bind(installation_id_db)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_repositories(
        &self,
        org_name: &str,
        repositories: &[RemoteRepository],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        // Anything the provider no longer lists is gone
        sqlx::query(
            r#"
            UPDATE repositories
            SET deleted = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE org_name = ? COLLATE NOCASE AND deleted = FALSE
            "#,
        )
        .bind(org_name)
        .execute(&mut *tx)
        .await?;
        for repository in repositories {
            let repo_id = repository.repo_id as i64;
            sqlx::query(
                r#"
                INSERT INTO repositories (repo_id, org_name, repo_name, archived, created_at, updated_at)
                VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
                ON CONFLICT (repo_id) DO UPDATE
                SET org_name = excluded.org_name, repo_name = excluded.repo_name,
                    archived = excluded.archived, deleted = FALSE, updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(repo_id)
            .bind(org_name)
            .bind(&repository.repo_name)
            .bind(repository.archived)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        tracing::debug!("Stored {} repositories for {}", repositories.len(), org_name);
        Ok(())
    }

    async fn eligible_repositories(&self, org_name: &str) -> Result<Vec<Repository>> {
        let rows = sqlx::query(
            r#"
            SELECT repo_id, org_name, repo_name, onboard_complete, repo_enabled, deleted
            FROM repositories
            WHERE org_name = ? COLLATE NOCASE
                  AND onboard_complete = TRUE AND repo_enabled = TRUE AND deleted = FALSE
            ORDER BY repo_id
            "#,
        )
        .bind(org_name)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(repository_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::utc_datetime;

    use super::*;

    async fn memory_db() -> Database {
        Database::new(&DbConfig { url: "sqlite::memory:".to_string() }).await.unwrap()
    }

    fn org() -> Organization {
        Organization {
            installation_id: 11,
            org_name: "acme".into(),
            token: "token".into(),
            status: OrgStatus::Active,
            onboard_complete: true,
            api_limit_exceeded: false,
            api_limit_reached_count: 2,
        }
    }

    fn remote(repo_id: u64, repo_name: &str) -> RemoteRepository {
        RemoteRepository { repo_id, repo_name: repo_name.into(), archived: false }
    }

    #[tokio::test]
    async fn test_dataset_documents_are_replaced() {
        let db = memory_db().await;
        assert_eq!(db.get_document(Dataset::Clones, 1).await.unwrap(), None);
        db.set_document(Dataset::Clones, "acme", 1, "widgets", json!({ "list": [1, 2] }))
            .await
            .unwrap();
        db.set_document(Dataset::Clones, "acme", 1, "widgets", json!({ "list": [3] }))
            .await
            .unwrap();
        assert_eq!(
            db.get_document(Dataset::Clones, 1).await.unwrap(),
            Some(json!({ "list": [3] }))
        );
        assert_eq!(db.get_document(Dataset::Views, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_org_round_trip_and_update() {
        let db = memory_db().await;
        db.upsert_org(&org()).await.unwrap();
        assert_eq!(db.get_org(11).await.unwrap(), Some(org()));
        assert_eq!(db.get_org(12).await.unwrap(), None);

        db.update_org(11, OrgUpdate {
            api_limit_exceeded: Some(true),
            api_limit_reached_count: Some(3),
        })
        .await
        .unwrap();
        let updated = db.get_org(11).await.unwrap().unwrap();
        assert!(updated.api_limit_exceeded);
        assert_eq!(updated.api_limit_reached_count, 3);
        assert_eq!(updated.token, "token");
    }

    #[tokio::test]
    async fn test_replace_repositories() {
        let db = memory_db().await;
        db.replace_repositories("acme", &[remote(1, "one"), remote(2, "two")]).await.unwrap();
        // New repositories wait for onboarding
        assert!(db.eligible_repositories("acme").await.unwrap().is_empty());

        db.set_repository_flags(1, true, true).await.unwrap();
        db.set_repository_flags(2, true, false).await.unwrap();
        let eligible = db.eligible_repositories("acme").await.unwrap();
        assert_eq!(eligible.iter().map(|r| r.repo_id).collect::<Vec<_>>(), vec![1]);

        // Renamed repo 1 keeps its flags, repo 2 disappears, repo 3 appears
        db.replace_repositories("acme", &[remote(1, "uno"), remote(3, "three")]).await.unwrap();
        let eligible = db.eligible_repositories("acme").await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].repo_name, "uno");

        db.set_repository_flags(2, true, true).await.unwrap();
        db.set_repository_flags(3, true, true).await.unwrap();
        let eligible = db.eligible_repositories("acme").await.unwrap();
        assert_eq!(eligible.iter().map(|r| r.repo_id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(db.set_repository_flags(99, true, true).await.is_err());
    }

    #[tokio::test]
    async fn test_job_submit_and_try_start() {
        let db = memory_db().await;
        let key = JobKey::metrics(11);
        assert!(db.try_start(&key).await.unwrap());
        assert!(!db.try_start(&key).await.unwrap());
        let job = db.get_job(&key).await.unwrap().unwrap();
        assert!(job.processing);
        assert_eq!(job.expires_at, None);

        let expires_at = utc_datetime!(2024-05-01 10:00:00);
        db.submit(&key, JobUpdate::reschedule(expires_at)).await.unwrap();
        let job = db.get_job(&key).await.unwrap().unwrap();
        assert!(!job.processing);
        assert_eq!(job.expires_at, Some(expires_at));

        // Setting only the flag keeps the expiry
        db.submit(&key, JobUpdate::processing(true)).await.unwrap();
        db.submit(&key, JobUpdate::processing(false)).await.unwrap();
        let job = db.get_job(&key).await.unwrap().unwrap();
        assert_eq!(job.expires_at, Some(expires_at));
        assert!(db.try_start(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_due_jobs() {
        let db = memory_db().await;
        let now = utc_datetime!(2024-05-01 10:00:00);
        db.submit(&JobKey::metrics(1), JobUpdate::reschedule(utc_datetime!(2024-05-01 09:00:00)))
            .await
            .unwrap();
        db.submit(&JobKey::metrics(2), JobUpdate::reschedule(utc_datetime!(2024-05-01 11:00:00)))
            .await
            .unwrap();
        db.submit(&JobKey::metrics(3), JobUpdate::reschedule(utc_datetime!(2024-05-01 08:00:00)))
            .await
            .unwrap();
        db.submit(&JobKey::metrics(3), JobUpdate::processing(true)).await.unwrap();
        db.submit(&JobKey { installation_id: 4, task: "Other".into() }, JobUpdate::default())
            .await
            .unwrap();

        let due = db.due_jobs("Metrics", now).await.unwrap();
        assert_eq!(due.iter().map(|j| j.installation_id).collect::<Vec<_>>(), vec![1]);
    }
}
