// src/repositories/postgres.rs - Data access
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use sqlx::PgPool;

use super::short_link::{Result, ShortLinkRepositoryTrait};
use crate::db::Database;
use crate::errors::RepositoryError;
use crate::models::ShortLink;

const SELECT_COLUMNS: &str = "SELECT id, target, owner_id, created_at, expires_at, visit_count, last_visit_at, password_hash FROM short_links";

pub struct PostgresShortLinkRepository {
    db: Database,
}

impl PostgresShortLinkRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        self.db.get_pool()
    }
}

#[async_trait]
impl ShortLinkRepositoryTrait for PostgresShortLinkRepository {
    async fn insert(&self, link: &ShortLink) -> Result<()> {
        // The conditional upsert only overwrites a holder that has expired, so
        // uniqueness among live links is decided by the database in one statement.
        let inserted: Option<(String,)> = sqlx::query_as(
            r#"
                INSERT INTO short_links
                (id, target, owner_id, created_at, expires_at, visit_count, last_visit_at, password_hash)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    target = EXCLUDED.target,
                    owner_id = EXCLUDED.owner_id,
                    created_at = EXCLUDED.created_at,
                    expires_at = EXCLUDED.expires_at,
                    visit_count = EXCLUDED.visit_count,
                    last_visit_at = EXCLUDED.last_visit_at,
                    password_hash = EXCLUDED.password_hash
                WHERE short_links.expires_at IS NOT NULL AND short_links.expires_at <= $9
                RETURNING id
            "#,
        )
        .bind(&link.id)
        .bind(&link.target)
        .bind(link.owner_id)
        .bind(link.created_at)
        .bind(link.expires_at)
        .bind(link.visit_count)
        .bind(link.last_visit_at)
        .bind(&link.password_hash)
        .bind(Utc::now())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            error!("Failed to insert short link: {}", e);
            RepositoryError::from(e)
        })?;

        match inserted {
            Some(_) => Ok(()),
            None => Err(RepositoryError::Conflict(format!(
                "Link '{}' already exists",
                link.id
            ))),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ShortLink>> {
        sqlx::query_as::<_, ShortLink>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(RepositoryError::Database)
    }

    async fn update(&self, link: &ShortLink) -> Result<()> {
        debug!("Updating link with id: {}", link.id);

        let result = sqlx::query(
            r#"
                UPDATE short_links
                SET target = $1, owner_id = $2, visit_count = $3, last_visit_at = $4
                WHERE id = $5
            "#,
        )
        .bind(&link.target)
        .bind(link.owner_id)
        .bind(link.visit_count)
        .bind(link.last_visit_at)
        .bind(&link.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Link '{}' not found", link.id)));
        }
        Ok(())
    }

    async fn record_visit(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE short_links SET visit_count = visit_count + 1, last_visit_at = $1 WHERE id = $2",
        )
        .bind(at)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Link '{}' not found", id)));
        }
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(&format!(
            "{} ORDER BY created_at DESC, id ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(links)
    }

    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(&format!(
            "{} WHERE owner_id = $1 ORDER BY created_at DESC, id ASC",
            SELECT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;

        Ok(links)
    }

    async fn close(&self) {
        self.db.shutdown().await;
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

// Run against a disposable database:
// LINKGATE_TEST_DATABASE_URL=postgres://... cargo test -- --ignored
#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::config::DatabaseConfig;

    async fn repository() -> Option<PostgresShortLinkRepository> {
        let url = std::env::var("LINKGATE_TEST_DATABASE_URL").ok()?;
        let config = DatabaseConfig {
            url,
            max_connections: 2,
            min_connections: 1,
            use_migrations: true,
            skip_db_exists_check: false,
            connect_timeout_seconds: 5,
            create_database_if_missing: true,
        };
        let db = Database::connect(&config).await.unwrap();
        Some(PostgresShortLinkRepository::new(db))
    }

    fn unique_id() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    #[tokio::test]
    #[ignore = "needs LINKGATE_TEST_DATABASE_URL"]
    async fn test_insert_conflicts_with_live_holder() {
        let Some(repo) = repository().await else { return };
        let id = unique_id();

        let first = ShortLink::new(id.clone(), "https://example.com/first".into(), None);
        repo.insert(&first).await.unwrap();

        let second = ShortLink::new(id.clone(), "https://example.com/second".into(), None);
        let err = repo.insert(&second).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.target, "https://example.com/first");
    }

    #[tokio::test]
    #[ignore = "needs LINKGATE_TEST_DATABASE_URL"]
    async fn test_insert_reclaims_expired_holder() {
        let Some(repo) = repository().await else { return };
        let id = unique_id();

        let mut stale = ShortLink::new(id.clone(), "https://example.com/old".into(), Some(1))
            .with_password_hash(Some("stale-hash".into()));
        stale.expires_at = Some(Utc::now() - Duration::seconds(60));
        stale.visit_count = 9;
        repo.insert(&stale).await.unwrap();

        let fresh = ShortLink::new(id.clone(), "https://example.com/new".into(), None);
        repo.insert(&fresh).await.unwrap();

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.target, "https://example.com/new");
        assert_eq!(stored.owner_id, None);
        assert_eq!(stored.expires_at, None);
        assert_eq!(stored.visit_count, 0);
        assert_eq!(stored.password_hash, None);
    }

    #[tokio::test]
    #[ignore = "needs LINKGATE_TEST_DATABASE_URL"]
    async fn test_record_visit_increments_atomically() {
        let Some(repo) = repository().await else { return };
        let repo = std::sync::Arc::new(repo);
        let id = unique_id();

        repo.insert(&ShortLink::new(id.clone(), "https://example.com".into(), None))
            .await
            .unwrap();

        let visits = (0..20).map(|_| {
            let repo = repo.clone();
            let id = id.clone();
            tokio::spawn(async move { repo.record_visit(&id, Utc::now()).await })
        });
        for visit in futures_util::future::join_all(visits).await {
            visit.unwrap().unwrap();
        }

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.visit_count, 20);
        assert!(stored.last_visit_at.is_some());

        let err = repo.record_visit("missing-link-id", Utc::now()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
