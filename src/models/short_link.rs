// src/models/short_link.rs - Pure data structures
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A short id mapped to its target URL
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ShortLink {
    /// Generated id or custom slug
    pub id: String,

    /// The original, long URL
    pub target: String,

    /// Account that created the link, `None` for anonymous links
    pub owner_id: Option<i64>,

    pub created_at: DateTime<Utc>,

    /// When this link expires (None means it never expires)
    pub expires_at: Option<DateTime<Utc>>,

    pub visit_count: i64,

    pub last_visit_at: Option<DateTime<Utc>>,

    /// Argon2 PHC string; presence means the link is password protected
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
}

impl ShortLink {
    pub fn new(id: String, target: String, owner_id: Option<i64>) -> Self {
        Self {
            id,
            target,
            owner_id,
            created_at: Utc::now(),
            expires_at: None,
            visit_count: 0,
            last_visit_at: None,
            password_hash: None,
        }
    }

    /// Sets `expires_at` relative to `created_at`
    pub fn expiring_in(mut self, duration: Duration) -> Self {
        self.expires_at = Some(
            self.created_at
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        self
    }

    pub fn with_password_hash(mut self, hash: Option<String>) -> Self {
        self.password_hash = hash;
        self
    }

    /// Whether the link has expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }

    /// Checks if the link has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Applies one visit to this copy of the record
    pub fn increment_visits(&mut self, at: DateTime<Utc>) {
        self.visit_count += 1;
        self.last_visit_at = Some(at);
    }
}

/// DTO for creating a new short link
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct CreateShortLinkDto {
    #[validate(length(min = 1, max = 2048, message = "URL must be between 1 and 2048 characters"))]
    pub url: String,

    #[validate(length(max = 64, message = "Custom slug must be at most 64 characters"))]
    pub custom_slug: Option<String>,

    /// Lifetime in seconds
    #[validate(range(
        min = 1i64,
        max = 3_153_600_000i64,
        message = "Expiration must be between 1 second and 100 years"
    ))]
    pub expires_in_seconds: Option<i64>,

    #[validate(length(max = 256, message = "Password must be at most 256 characters"))]
    pub password: Option<String>,

    pub owner_id: Option<i64>,
}

/// Domain input of the shorten operation
#[derive(Debug, Default, Clone)]
pub struct ShortenRequest {
    pub target: String,
    pub owner_id: Option<i64>,
    pub custom_slug: Option<String>,
    pub expires_in: Option<Duration>,
    pub password: Option<String>,
}

impl From<CreateShortLinkDto> for ShortenRequest {
    fn from(dto: CreateShortLinkDto) -> Self {
        ShortenRequest {
            target: dto.url,
            owner_id: dto.owner_id,
            // An empty slug means "generate one"
            custom_slug: dto.custom_slug.filter(|s| !s.is_empty()),
            // Out-of-range lifetimes become zero so the service rejects them
            expires_in: dto
                .expires_in_seconds
                .map(|secs| Duration::try_seconds(secs).unwrap_or_else(Duration::zero)),
            password: dto.password.filter(|p| !p.is_empty()),
        }
    }
}

/// Response body describing a created or listed link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortLinkResponseDto {
    pub id: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub visits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_password_protected: bool,
}

impl ShortLinkResponseDto {
    pub fn from_link(link: ShortLink, base_url: &str) -> Self {
        ShortLinkResponseDto {
            short_url: format!("{}/{}", base_url, link.id),
            is_password_protected: link.is_password_protected(),
            id: link.id,
            original_url: link.target,
            created_at: link.created_at,
            visits: link.visit_count,
            owner_id: link.owner_id,
            expires_at: link.expires_at,
        }
    }
}

/// Existence-check metadata; the target is withheld for protected links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkInfoDto {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_password_protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
}

impl From<ShortLink> for LinkInfoDto {
    fn from(link: ShortLink) -> Self {
        let is_password_protected = link.is_password_protected();
        LinkInfoDto {
            original_url: (!is_password_protected).then_some(link.target),
            id: link.id,
            created_at: link.created_at,
            expires_at: link.expires_at,
            is_password_protected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordDto {
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShortLinkQueryParams {
    pub owner_id: Option<i64>,
}
