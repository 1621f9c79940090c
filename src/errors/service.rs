use thiserror::Error;

use super::RepositoryError;

/// Errors surfaced by the shortening service.
///
/// Expired and absent links both become [`ServiceError::NotFound`]; callers
/// cannot tell the two apart.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid URL: target must be an http or https URL with a host")]
    InvalidUrl,

    #[error("Invalid slug: {0}")]
    InvalidSlug(String),

    #[error("Slug unavailable: '{0}' is already in use")]
    SlugUnavailable(String),

    #[error("Invalid expiration: duration must be positive")]
    InvalidExpiration,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Not found: link not found or expired")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
