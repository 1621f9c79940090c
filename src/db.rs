use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres};
use thiserror::Error;
use url::Url;

use crate::config::DatabaseConfig;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migrate(#[from] MigrateError),

    #[error("Database not found: {0}")]
    Missing(String),

    #[error("Failed to create database: {0}")]
    Provision(String),
}

pub type DbResult<T> = Result<T, DatabaseError>;

/// Pool over the database holding the `short_links` table
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    Healthy,
    /// Reachable, but the link table is missing or behind the embedded migrations
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, FromRow)]
pub struct LinkTableStats {
    pub total_links: i64,
    pub live_links: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaState {
    pub applied_version: Option<i64>,
    pub expected_version: Option<i64>,
    pub pending_migrations: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkTableStats>,
}

impl SchemaState {
    pub fn new(
        applied_version: Option<i64>,
        expected_version: Option<i64>,
        links: Option<LinkTableStats>,
    ) -> Self {
        Self {
            applied_version,
            expected_version,
            pending_migrations: applied_version < expected_version,
            links,
        }
    }

    pub fn state(&self) -> StoreState {
        if self.pending_migrations || self.links.is_none() {
            StoreState::Degraded
        } else {
            StoreState::Healthy
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseHealth {
    pub status: StoreState,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Newest migration embedded in the binary
pub fn expected_schema_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        debug!(
            "Connecting link store: max_conn={}, min_conn={}, timeout={}s",
            config.max_connections, config.min_connections, config.connect_timeout_seconds
        );

        if !config.skip_db_exists_check {
            Self::provision(config).await?;
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await
            .inspect_err(|e| warn!("Link store unreachable: {}", e))?;

        if config.use_migrations {
            info!(
                "Applying link store migrations up to {:?}",
                expected_schema_version()
            );
            MIGRATOR.run(&pool).await?;
        }

        info!("Link store connected");
        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Reports reachability, migration level and link counts
    pub async fn health_check(&self) -> DatabaseHealth {
        let started = Instant::now();

        if let Err(e) = sqlx::query("SELECT 1").execute(&self.pool).await {
            return DatabaseHealth {
                status: StoreState::Unhealthy,
                response_time_ms: started.elapsed().as_millis() as u64,
                schema: None,
                message: Some(format!("Database query failed: {}", e)),
            };
        }

        // Both queries fail when migrations never ran; that is a degraded store, not a dead one
        let applied = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(version) FROM _sqlx_migrations WHERE success",
        )
        .fetch_one(&self.pool)
        .await
        .ok()
        .flatten();

        let links = sqlx::query_as::<_, LinkTableStats>(
            r#"
                SELECT COUNT(*) AS total_links,
                       COUNT(*) FILTER (WHERE expires_at IS NULL OR expires_at > NOW()) AS live_links
                FROM short_links
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .ok();

        let schema = SchemaState::new(applied, expected_schema_version(), links);
        let status = schema.state();
        let message = match status {
            StoreState::Degraded => Some("short_links schema is missing or out of date".to_string()),
            _ => None,
        };

        DatabaseHealth {
            status,
            response_time_ms: started.elapsed().as_millis() as u64,
            schema: Some(schema),
            message,
        }
    }

    /// Creates the target database when it is missing and creation is allowed
    async fn provision(config: &DatabaseConfig) -> DbResult<()> {
        let name = database_name(&config.url).ok_or_else(|| {
            DatabaseError::Missing("no database name in DATABASE_URL".to_string())
        })?;

        if Postgres::database_exists(&config.url).await? {
            return Ok(());
        }
        if !config.create_database_if_missing {
            return Err(DatabaseError::Missing(name));
        }

        info!("Creating database '{}'", name);
        Postgres::create_database(&config.url)
            .await
            .map_err(|e| DatabaseError::Provision(format!("'{}': {}", name, e)))
    }

    pub async fn shutdown(&self) {
        let connections = self.pool.size();
        self.pool.close().await;
        info!("Link store closed, {} connections released", connections);
    }
}

fn database_name(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.path_segments()?
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
