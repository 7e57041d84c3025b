use std::time::SystemTime;
use tracing::debug;

use crate::auth::AccessGate;
use crate::error::{Error, Result};
use crate::feed::Article;
use crate::storage::{FeedCache, Freshness, RegistryEntry, RegistryStore, StatusTracker};

/// A snapshot served verbatim, with what the caller needs for caching headers.
#[derive(Debug, Clone)]
pub struct CachedFeed {
    pub name: String,
    pub bytes: Vec<u8>,
    pub etag: String,
    pub modified: Option<SystemTime>,
    pub freshness: Freshness,
}

/// Read path over the registry and the snapshot directory. Every operation
/// checks the request body's token before touching any data.
#[derive(Clone)]
pub struct QueryService {
    registry: RegistryStore,
    cache: FeedCache,
    status: StatusTracker,
    gate: AccessGate,
}

impl QueryService {
    pub fn new(registry: RegistryStore, cache: FeedCache, status: StatusTracker, gate: AccessGate) -> Self {
        Self {
            registry,
            cache,
            status,
            gate,
        }
    }

    pub async fn list_feeds(&self, body: &[u8]) -> Result<Vec<RegistryEntry>> {
        self.gate.require(body).await?;
        Ok(self.registry.list().to_vec())
    }

    pub async fn get_feed(&self, body: &[u8], name: &str) -> Result<CachedFeed> {
        self.gate.require(body).await?;
        self.ensure_registered(name)?;

        let bytes = self.cache.read_raw(name)?;
        let modified = self.cache.metadata(name).ok().map(|m| m.modified);
        debug!("Serving {} bytes for feed {}", bytes.len(), name);

        Ok(CachedFeed {
            name: name.to_string(),
            etag: format!("\"{}\"", blake3::hash(&bytes).to_hex()),
            bytes,
            modified,
            freshness: self.status.freshness(name),
        })
    }

    pub async fn get_article(&self, body: &[u8], name: &str, index: &str) -> Result<Article> {
        self.gate.require(body).await?;

        let index: usize = index
            .parse()
            .map_err(|_| Error::Invalid(format!("'{}' is not an article index", index)))?;
        self.ensure_registered(name)?;

        self.cache.article(name, index)
    }

    // Only registry names map to snapshot files.
    fn ensure_registered(&self, name: &str) -> Result<()> {
        if self.registry.contains(name) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Feed '{}' not found", name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, TokenValidator};
    use crate::feed::NormalizedFeed;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FixedValidator(Option<bool>);

    #[async_trait]
    impl TokenValidator for FixedValidator {
        async fn validate(&self, token: &AccessToken) -> Result<bool> {
            match self.0 {
                Some(valid) => Ok(valid && token.value == "letmein"),
                None => Err(Error::ServiceUnavailable("down".to_string())),
            }
        }
    }

    const BODY: &[u8] = br#"{"Token":"letmein"}"#;

    fn feed_with(count: usize) -> NormalizedFeed {
        NormalizedFeed {
            title: "Feed".to_string(),
            items: (0..count)
                .map(|i| Article { title: format!("Article {}", i), ..Default::default() })
                .collect(),
            ..Default::default()
        }
    }

    fn service(oracle: Option<bool>, count: usize) -> (TempDir, QueryService) {
        let temp_dir = TempDir::new().unwrap();
        let registry = RegistryStore::from_entries(vec![
            RegistryEntry::new("A", "http://x"),
            RegistryEntry::new("never-fetched", "http://y"),
        ])
        .unwrap();
        let cache = FeedCache::new(temp_dir.path()).unwrap();
        cache.persist(&registry.list()[0], &feed_with(count)).unwrap();

        let gate = AccessGate::new(Arc::new(FixedValidator(oracle)));
        let service = QueryService::new(registry, cache, StatusTracker::new(), gate);
        (temp_dir, service)
    }

    #[tokio::test]
    async fn test_list_feeds() {
        let (_temp_dir, service) = service(Some(true), 1);

        let feeds = service.list_feeds(BODY).await.unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].name, "A");
    }

    #[tokio::test]
    async fn test_every_operation_is_gated() {
        let (_temp_dir, service) = service(Some(true), 1);
        let bad = br#"{"Token":"nope"}"#;

        assert!(matches!(service.list_feeds(bad).await, Err(Error::AuthDenied)));
        assert!(matches!(service.get_feed(bad, "A").await, Err(Error::AuthDenied)));
        assert!(matches!(service.get_article(bad, "A", "0").await, Err(Error::AuthDenied)));
        // Denial wins over lookups that would fail anyway.
        assert!(matches!(service.get_feed(b"", "missing").await, Err(Error::AuthDenied)));
        assert!(matches!(service.get_article(b"", "A", "x").await, Err(Error::AuthDenied)));
    }

    #[tokio::test]
    async fn test_unreachable_oracle_surfaces_as_unavailable() {
        let (_temp_dir, service) = service(None, 1);

        assert!(matches!(service.list_feeds(BODY).await, Err(Error::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_get_feed_returns_stored_bytes() {
        let (_temp_dir, service) = service(Some(true), 2);

        let cached = service.get_feed(BODY, "A").await.unwrap();
        assert_eq!(cached.bytes, serde_json::to_vec(&feed_with(2)).unwrap());
        assert_eq!(cached.freshness, Freshness::Stale);
        assert!(cached.modified.is_some());
        assert!(cached.etag.starts_with('"') && cached.etag.len() == 66);
    }

    #[tokio::test]
    async fn test_missing_feeds_are_not_found() {
        let (_temp_dir, service) = service(Some(true), 1);

        assert!(matches!(service.get_feed(BODY, "missing").await, Err(Error::NotFound(_))));
        assert!(matches!(service.get_feed(BODY, "never-fetched").await, Err(Error::NotFound(_))));
        assert!(matches!(service.get_article(BODY, "never-fetched", "0").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_non_numeric_index_is_invalid() {
        let (_temp_dir, service) = service(Some(true), 1);

        assert!(matches!(service.get_article(BODY, "A", "first").await, Err(Error::Invalid(_))));
        assert!(matches!(service.get_article(BODY, "A", "-1").await, Err(Error::Invalid(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_article_lookup_matches_stored_feed(count in 0usize..20, index in 0usize..40) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (_temp_dir, service) = service(Some(true), count);

            let result = runtime.block_on(service.get_article(BODY, "A", &index.to_string()));

            if index < count {
                let stored: NormalizedFeed =
                    serde_json::from_slice(&service.cache.read_raw("A").unwrap()).unwrap();
                prop_assert_eq!(result.unwrap(), stored.items[index].clone());
            } else {
                let is_index_error = matches!(
                    result,
                    Err(Error::IndexOutOfRange { index: i, len, .. }) if i == index && len == count
                );
                prop_assert!(is_index_error);
            }
        }
    }
}
