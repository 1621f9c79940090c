mod memory;
mod postgres;
mod short_link;

pub use memory::MemoryShortLinkRepository;
pub use postgres::PostgresShortLinkRepository;
pub use short_link::ShortLinkRepositoryTrait;

#[cfg(test)]
pub use short_link::MockShortLinkRepositoryTrait;
