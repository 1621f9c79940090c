// src/services/short_link.rs - Business logic
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};

use crate::config::ShortenerConfig;
use crate::errors::{RepositoryError, ServiceError};
use crate::models::{ShortLink, ShortLinkResponseDto, ShortenRequest};
use crate::repositories::ShortLinkRepositoryTrait;
use crate::utils::{id_generator, password};
use crate::validations::{validate_custom_slug, validate_expires_in, validate_url};

type Result<T> = std::result::Result<T, ServiceError>;

#[async_trait]
pub trait ShortLinkServiceTrait {
    /// Creates a link under a custom slug or a freshly allocated id
    async fn shorten(&self, request: ShortenRequest) -> Result<ShortLinkResponseDto>;

    /// Content access: requires the password when the link has one
    async fn get(&self, id: &str, password: Option<&str>) -> Result<ShortLink>;

    /// Existence check: no password, no visit
    async fn get_without_password(&self, id: &str) -> Result<ShortLink>;

    /// `Ok(true)` when the link has no password or `password` matches it
    async fn verify_password(&self, id: &str, password: &str) -> Result<bool>;

    /// Content access followed by a best-effort visit count
    async fn redirect(&self, id: &str, password: Option<&str>) -> Result<ShortLink>;

    async fn list(&self) -> Result<Vec<ShortLinkResponseDto>>;

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<ShortLinkResponseDto>>;
}

pub struct ShortLinkService {
    repository: Arc<dyn ShortLinkRepositoryTrait>,
    config: ShortenerConfig,
}

impl ShortLinkService {
    pub fn new(repository: Arc<dyn ShortLinkRepositoryTrait>, config: ShortenerConfig) -> Self {
        Self { repository, config }
    }

    /// Runs one storage call under the configured deadline
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, RepositoryError>> + Send,
    {
        match tokio::time::timeout(self.config.operation_timeout, call).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => {
                warn!(
                    "Storage operation '{}' exceeded {:?}",
                    operation, self.config.operation_timeout
                );
                Err(ServiceError::Internal(format!(
                    "storage operation '{}' timed out",
                    operation
                )))
            }
        }
    }

    /// The single lookup path: expired links are reported as not found
    async fn find_live(&self, id: &str) -> Result<ShortLink> {
        match self.bounded("find_by_id", self.repository.find_by_id(id)).await? {
            Some(link) if !link.is_expired() => Ok(link),
            Some(_) => {
                debug!("Link '{}' has expired", id);
                Err(ServiceError::NotFound)
            }
            None => Err(ServiceError::NotFound),
        }
    }

    /// Draws ids until one is inserted, failing closed after the configured attempts
    async fn allocate(&self, prototype: ShortLink) -> Result<ShortLink> {
        let attempts = self.config.max_allocation_attempts;

        for attempt in 1..=attempts {
            let link = ShortLink {
                id: id_generator::generate_short_id(self.config.key_length),
                ..prototype.clone()
            };

            match self.bounded("insert", self.repository.insert(&link)).await {
                Ok(()) => return Ok(link),
                Err(ServiceError::Repository(RepositoryError::Conflict(_))) => {
                    debug!(
                        "Generated id '{}' collided (attempt {}/{})",
                        link.id, attempt, attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        error!(
            "Could not allocate a unique id of length {} after {} attempts",
            self.config.key_length, attempts
        );
        Err(ServiceError::Internal(format!(
            "key space exhausted for length {}",
            self.config.key_length
        )))
    }

    /// Stores the link under the caller's slug; a live holder means unavailable
    async fn reserve(&self, link: ShortLink) -> Result<ShortLink> {
        match self.bounded("insert", self.repository.insert(&link)).await {
            Ok(()) => Ok(link),
            Err(ServiceError::Repository(RepositoryError::Conflict(_))) => {
                Err(ServiceError::SlugUnavailable(link.id))
            }
            Err(e) => Err(e),
        }
    }

    fn to_responses(&self, links: Vec<ShortLink>) -> Vec<ShortLinkResponseDto> {
        let now = Utc::now();
        links
            .into_iter()
            .filter(|link| !link.is_expired_at(now))
            .map(|link| ShortLinkResponseDto::from_link(link, &self.config.base_url))
            .collect()
    }
}

async fn hash_password(plain: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| ServiceError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

async fn check_password(link: &ShortLink, candidate: &str) -> Result<()> {
    let Some(hash) = link.password_hash.clone() else {
        return Ok(());
    };
    let candidate = candidate.to_owned();

    let matches = tokio::task::spawn_blocking(move || password::verify_password(&candidate, &hash))
        .await
        .map_err(|e| ServiceError::Internal(format!("password check task failed: {}", e)))?
        .map_err(|e| {
            error!("Stored password hash of '{}' is unusable: {}", link.id, e);
            ServiceError::Internal(e.to_string())
        })?;

    if matches {
        Ok(())
    } else {
        Err(ServiceError::InvalidPassword)
    }
}

#[async_trait]
impl ShortLinkServiceTrait for ShortLinkService {
    async fn shorten(&self, request: ShortenRequest) -> Result<ShortLinkResponseDto> {
        // Validate everything before touching storage
        validate_url(&request.target).map_err(|_| ServiceError::InvalidUrl)?;

        if let Some(slug) = &request.custom_slug {
            validate_custom_slug(slug).map_err(|e| {
                ServiceError::InvalidSlug(
                    e.message
                        .map(|m| m.into_owned())
                        .unwrap_or_else(|| e.code.into_owned()),
                )
            })?;
        }

        if let Some(lifetime) = &request.expires_in {
            validate_expires_in(lifetime).map_err(|_| ServiceError::InvalidExpiration)?;
        }

        let password_hash = match request.password {
            Some(plain) => Some(hash_password(plain).await?),
            None => None,
        };

        let mut prototype = ShortLink::new(String::new(), request.target, request.owner_id)
            .with_password_hash(password_hash);
        if let Some(lifetime) = request.expires_in {
            prototype = prototype.expiring_in(lifetime);
        }

        let link = match request.custom_slug {
            Some(slug) => self.reserve(ShortLink { id: slug, ..prototype }).await?,
            None => self.allocate(prototype).await?,
        };

        info!(
            "Created link '{}' -> '{}' (protected: {}, expires: {:?})",
            link.id,
            link.target,
            link.is_password_protected(),
            link.expires_at
        );

        Ok(ShortLinkResponseDto::from_link(link, &self.config.base_url))
    }

    async fn get(&self, id: &str, password: Option<&str>) -> Result<ShortLink> {
        let link = self.find_live(id).await?;

        if link.is_password_protected() {
            let candidate = password.ok_or(ServiceError::InvalidPassword)?;
            check_password(&link, candidate).await?;
        }

        Ok(link)
    }

    async fn get_without_password(&self, id: &str) -> Result<ShortLink> {
        self.find_live(id).await
    }

    async fn verify_password(&self, id: &str, password: &str) -> Result<bool> {
        let link = self.find_live(id).await?;
        check_password(&link, password).await?;
        Ok(true)
    }

    async fn redirect(&self, id: &str, password: Option<&str>) -> Result<ShortLink> {
        let mut link = self.get(id, password).await?;

        let now = Utc::now();
        match self.bounded("record_visit", self.repository.record_visit(id, now)).await {
            Ok(()) => link.increment_visits(now),
            // The visitor still gets redirected
            Err(e) => warn!("Failed to record visit for '{}': {}", id, e),
        }

        Ok(link)
    }

    async fn list(&self) -> Result<Vec<ShortLinkResponseDto>> {
        let links = self.bounded("find_all", self.repository.find_all()).await?;
        Ok(self.to_responses(links))
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<ShortLinkResponseDto>> {
        let links = self
            .bounded("find_by_owner", self.repository.find_by_owner(owner_id))
            .await?;
        Ok(self.to_responses(links))
    }
}
