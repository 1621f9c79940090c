use std::borrow::Cow;

use chrono::Duration;
use url::Url;
use validator::ValidationError;

/// Slugs that would shadow application routes; `api` and `health` are served by this app
pub const RESERVED_SLUGS: &[&str] = &["admin", "login", "signup", "api", "health"];

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Validates that a URL string is properly formatted and uses http/https
pub fn validate_url(url_str: &str) -> Result<(), ValidationError> {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(error("url_scheme", "URL scheme must be http or https"));
            }

            match url.host_str() {
                Some(host) if !host.is_empty() => Ok(()),
                _ => Err(error("url_host", "URL must have a host")),
            }
        }
        Err(_) => Err(error("url_format", "Invalid URL format")),
    }
}

/// Validates a custom slug:
/// - Not empty
/// - Only ASCII letters, digits, hyphens and underscores
/// - Not one of the reserved words, compared case-insensitively
pub fn validate_custom_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Err(error("slug_empty", "custom slug must not be empty"));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(error(
            "slug_charset",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    let lowered = slug.to_ascii_lowercase();
    if RESERVED_SLUGS.contains(&lowered.as_str()) {
        return Err(error("slug_reserved", "this custom slug is not allowed"));
    }

    Ok(())
}

/// Validates that a lifetime is strictly positive
pub fn validate_expires_in(duration: &Duration) -> Result<(), ValidationError> {
    if *duration <= Duration::zero() {
        return Err(error("expires_in", "expiration must be positive"));
    }

    Ok(())
}
