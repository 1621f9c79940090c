use std::sync::Arc;

use actix_web::web;

mod short_link;

pub use short_link::{ShortLinkService, ShortLinkServiceTrait};

use crate::{config::ShortenerConfig, repositories::ShortLinkRepositoryTrait};

/// Service Register
pub fn register(
    repository: Arc<dyn ShortLinkRepositoryTrait>,
    config: ShortenerConfig,
) -> web::Data<ShortLinkService> {
    web::Data::new(ShortLinkService::new(repository, config))
}
