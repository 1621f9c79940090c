mod short_link;

pub use short_link::{validate_custom_slug, validate_expires_in, validate_url};

#[cfg(test)]
pub use short_link::RESERVED_SLUGS;
