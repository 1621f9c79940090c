// src/repositories/short_link.rs - Storage port
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::RepositoryError;
use crate::models::ShortLink;

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Storage port of the shortening service.
///
/// Reads are raw: expired records are returned as stored, and filtering them
/// out is the caller's job. Only `insert` looks at expiry, to decide whether an
/// existing holder of the id may be replaced.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortLinkRepositoryTrait: Send + Sync {
    /// Atomically stores `link` unless a live record already holds its id
    ///
    /// ### Errors
    /// * `RepositoryError::Conflict` - A non-expired record with the same id exists
    /// * `RepositoryError::Database` - If a database error occurs
    async fn insert(&self, link: &ShortLink) -> Result<()>;

    /// Finds a link by id, expired or not
    ///
    /// ### Returns
    /// * `Result<Option<ShortLink>>` - The link if stored, or `None`
    async fn find_by_id(&self, id: &str) -> Result<Option<ShortLink>>;

    /// Replaces every mutable field of an existing record
    ///
    /// ### Errors
    /// * `RepositoryError::NotFound` - No record with that id exists
    async fn update(&self, link: &ShortLink) -> Result<()>;

    /// Atomically increments `visit_count` and sets `last_visit_at`
    ///
    /// ### Errors
    /// * `RepositoryError::NotFound` - No record with that id exists
    async fn record_visit(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// All stored links, newest first
    async fn find_all(&self) -> Result<Vec<ShortLink>>;

    /// Links created by `owner_id`, newest first
    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<ShortLink>>;

    /// Releases underlying resources
    async fn close(&self);

    fn backend_name(&self) -> &'static str;
}
