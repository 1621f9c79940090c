// src/repositories/memory.rs - In-process storage
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;

use super::short_link::{Result, ShortLinkRepositoryTrait};
use crate::errors::RepositoryError;
use crate::models::ShortLink;

/// Links kept in a map behind a single reader/writer lock.
///
/// The lock is never held across an await point.
#[derive(Default)]
pub struct MemoryShortLinkRepository {
    links: RwLock<HashMap<String, ShortLink>>,
}

impl MemoryShortLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_newest_first(mut links: Vec<ShortLink>) -> Vec<ShortLink> {
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        links
    }
}

#[async_trait]
impl ShortLinkRepositoryTrait for MemoryShortLinkRepository {
    async fn insert(&self, link: &ShortLink) -> Result<()> {
        let mut links = self.links.write();

        if let Some(existing) = links.get(&link.id) {
            if !existing.is_expired_at(Utc::now()) {
                return Err(RepositoryError::Conflict(format!(
                    "Link '{}' already exists",
                    link.id
                )));
            }
            debug!("Reclaiming expired id '{}'", link.id);
        }

        links.insert(link.id.clone(), link.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ShortLink>> {
        Ok(self.links.read().get(id).cloned())
    }

    async fn update(&self, link: &ShortLink) -> Result<()> {
        let mut links = self.links.write();

        match links.get_mut(&link.id) {
            Some(slot) => {
                // expiry and password are immutable once stored
                slot.target = link.target.clone();
                slot.owner_id = link.owner_id;
                slot.visit_count = link.visit_count;
                slot.last_visit_at = link.last_visit_at;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("Link '{}' not found", link.id))),
        }
    }

    async fn record_visit(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut links = self.links.write();

        match links.get_mut(id) {
            Some(link) => {
                link.increment_visits(at);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("Link '{}' not found", id))),
        }
    }

    async fn find_all(&self) -> Result<Vec<ShortLink>> {
        let links = self.links.read().values().cloned().collect();
        Ok(Self::sorted_newest_first(links))
    }

    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<ShortLink>> {
        let links = self
            .links
            .read()
            .values()
            .filter(|link| link.owner_id == Some(owner_id))
            .cloned()
            .collect();
        Ok(Self::sorted_newest_first(links))
    }

    async fn close(&self) {
        debug!("Closing in-memory link store");
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn link(id: &str, owner_id: Option<i64>) -> ShortLink {
        ShortLink::new(id.to_string(), format!("https://example.com/{}", id), owner_id)
    }

    fn expired(id: &str) -> ShortLink {
        let mut link = link(id, None);
        link.created_at = Utc::now() - Duration::hours(2);
        link.expires_at = Some(Utc::now() - Duration::hours(1));
        link
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let repo = MemoryShortLinkRepository::new();
        repo.insert(&link("abc", None)).await.unwrap();

        let found = repo.find_by_id("abc").await.unwrap().unwrap();
        assert_eq!(found.target, "https://example.com/abc");
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_conflicts_with_live_record() {
        let repo = MemoryShortLinkRepository::new();
        repo.insert(&link("abc", None)).await.unwrap();

        let err = repo.insert(&link("abc", Some(1))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.find_by_id("abc").await.unwrap().unwrap().owner_id, None);
    }

    #[tokio::test]
    async fn test_insert_reclaims_expired_record() {
        let repo = MemoryShortLinkRepository::new();
        repo.insert(&expired("abc")).await.unwrap();

        repo.insert(&link("abc", Some(9))).await.unwrap();
        let found = repo.find_by_id("abc").await.unwrap().unwrap();
        assert_eq!(found.owner_id, Some(9));
        assert_eq!(found.expires_at, None);
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let repo = MemoryShortLinkRepository::new();
        let err = repo.update(&link("nope", None)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));

        let mut stored = link("abc", None);
        repo.insert(&stored).await.unwrap();
        stored.target = "https://example.org".into();
        repo.update(&stored).await.unwrap();
        assert_eq!(
            repo.find_by_id("abc").await.unwrap().unwrap().target,
            "https://example.org"
        );
    }

    #[tokio::test]
    async fn test_record_visit_increments() {
        let repo = MemoryShortLinkRepository::new();
        repo.insert(&link("abc", None)).await.unwrap();

        let at = Utc::now();
        repo.record_visit("abc", at).await.unwrap();
        repo.record_visit("abc", at).await.unwrap();

        let found = repo.find_by_id("abc").await.unwrap().unwrap();
        assert_eq!(found.visit_count, 2);
        assert_eq!(found.last_visit_at, Some(at));

        let err = repo.record_visit("missing", at).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_visits_are_not_lost() {
        let repo = Arc::new(MemoryShortLinkRepository::new());
        repo.insert(&link("hot", None)).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.record_visit("hot", Utc::now()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.find_by_id("hot").await.unwrap().unwrap().visit_count, 50);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_same_id_admit_one() {
        let repo = Arc::new(MemoryShortLinkRepository::new());

        let handles: Vec<_> = (0..20)
            .map(|owner| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.insert(&link("race", Some(owner))).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_listing_is_raw_and_filtered_by_owner() {
        let repo = MemoryShortLinkRepository::new();
        repo.insert(&link("a", Some(1))).await.unwrap();
        repo.insert(&link("b", Some(2))).await.unwrap();
        repo.insert(&expired("c")).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 3);

        let owned = repo.find_by_owner(1).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, "a");
        assert!(repo.find_by_owner(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let repo = MemoryShortLinkRepository::new();
        let mut old = link("old", None);
        old.created_at = Utc::now() - Duration::minutes(5);
        repo.insert(&old).await.unwrap();
        repo.insert(&link("new", None)).await.unwrap();

        let ids: Vec<_> = repo.find_all().await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }
}
