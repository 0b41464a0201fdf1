//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::tags::Tag;
use super::traits::{CacheResult, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the resource caches and the HTTP client. Reads are
/// served from storage while the entry is neither invalidated nor older than
/// the stale time; anything else goes to the network. Network errors are
/// always returned to the caller.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// How long before cached data is considered stale
  stale_time: Duration,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      stale_time: Duration::minutes(5),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Check if cached data is stale based on cached_at timestamp.
  fn is_expired(&self, cached_at: DateTime<Utc>) -> bool {
    Utc::now() - cached_at > self.stale_time
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. Check cache - if present, not invalidated and not expired, return it
  /// 2. Otherwise fetch from network, propagating any error
  /// 3. Store the result under the tags derived from it, already stale if one
  ///    of those tags was invalidated while the fetch was in flight
  pub async fn fetch<T, K, G, F, Fut, E>(
    &self,
    key: &K,
    tags: G,
    fetcher: F,
  ) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    K: QueryKey,
    G: FnOnce(&T) -> Vec<Tag>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let hash = key.cache_hash();

    if let Some(cached) = self.storage.get(&hash) {
      if !cached.stale && !self.is_expired(cached.cached_at) {
        match serde_json::from_value::<T>(cached.data) {
          Ok(data) => {
            debug!(query = %key.description(), "cache hit");
            return Ok(CacheResult::from_cache(data, cached.cached_at));
          }
          Err(e) => {
            warn!(query = %key.description(), error = %e, "discarding undecodable cache entry");
          }
        }
      }
    }

    debug!(query = %key.description(), "cache miss, fetching");
    let since = self.storage.generation();
    let data = fetcher().await?;

    match serde_json::to_value(&data) {
      Ok(value) => {
        let tags = tags(&data);
        self.storage.put(&hash, value, tags, since);
      }
      Err(e) => warn!(query = %key.description(), error = %e, "result not cached"),
    }

    Ok(CacheResult::from_network(data))
  }

  /// Mark every entry labelled with any of `tags` stale.
  pub fn invalidate(&self, tags: &[Tag]) -> usize {
    let hit = self.storage.invalidate(tags);
    debug!(
      tags = %tags.iter().map(Tag::to_string).collect::<Vec<_>>().join(","),
      entries = hit,
      "invalidated"
    );
    hit
  }

  /// Drop every cached entry.
  pub fn clear(&self) {
    self.storage.clear();
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      stale_time: self.stale_time,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{MemoryStorage, NoopStorage};
  use crate::cache::traits::CacheSource;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct Key(&'static str);

  impl QueryKey for Key {
    fn cache_hash(&self) -> String {
      self.0.to_string()
    }

    fn description(&self) -> String {
      self.0.to_string()
    }
  }

  fn list_tags(_: &Vec<u32>) -> Vec<Tag> {
    vec![Tag::list("Items")]
  }

  async fn fetch_counting(
    cache: &CacheLayer,
    key: &'static str,
    calls: &AtomicU32,
  ) -> Result<CacheResult<Vec<u32>>, String> {
    cache
      .fetch(&Key(key), list_tags, || async {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(vec![n])
      })
      .await
  }

  #[tokio::test]
  async fn test_second_read_is_served_from_cache() {
    let cache = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let first = fetch_counting(&cache, "items", &calls).await.unwrap();
    let second = fetch_counting(&cache, "items", &calls).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, vec![0]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let cache = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    fetch_counting(&cache, "items", &calls).await.unwrap();
    assert_eq!(cache.invalidate(&[Tag::list("Items")]), 1);

    let after = fetch_counting(&cache, "items", &calls).await.unwrap();
    assert_eq!(after.source, CacheSource::Network);
    assert_eq!(after.data, vec![1]);
  }

  #[tokio::test]
  async fn test_unrelated_tag_keeps_entry() {
    let cache = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    fetch_counting(&cache, "items", &calls).await.unwrap();
    assert_eq!(cache.invalidate(&[Tag::list("Other")]), 0);

    let after = fetch_counting(&cache, "items", &calls).await.unwrap();
    assert_eq!(after.source, CacheSource::Cache);
  }

  #[tokio::test]
  async fn test_expired_entry_is_refetched() {
    let cache = CacheLayer::new(MemoryStorage::new()).with_stale_time(Duration::zero());
    let calls = AtomicU32::new(0);

    fetch_counting(&cache, "items", &calls).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    fetch_counting(&cache, "items", &calls).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_error_propagates_and_is_not_cached() {
    let cache = CacheLayer::new(MemoryStorage::new());

    let result: Result<CacheResult<Vec<u32>>, String> = cache
      .fetch(&Key("items"), list_tags, || async { Err("boom".to_string()) })
      .await;
    assert_eq!(result.unwrap_err(), "boom");

    let calls = AtomicU32::new(0);
    let after = fetch_counting(&cache, "items", &calls).await.unwrap();
    assert_eq!(after.source, CacheSource::Network);
  }

  #[tokio::test]
  async fn test_distinct_keys_cached_independently() {
    let cache = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let a = fetch_counting(&cache, "items?page=1", &calls).await.unwrap();
    let b = fetch_counting(&cache, "items?page=2", &calls).await.unwrap();
    assert_eq!(a.data, vec![0]);
    assert_eq!(b.data, vec![1]);

    cache.invalidate(&[Tag::list("Items")]);
    fetch_counting(&cache, "items?page=1", &calls).await.unwrap();
    fetch_counting(&cache, "items?page=2", &calls).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }

  #[tokio::test]
  async fn test_invalidation_during_fetch_leaves_entry_stale() {
    let cache = CacheLayer::new(MemoryStorage::new());
    let layer = &cache;

    let first = cache
      .fetch(&Key("items"), list_tags, move || async move {
        layer.invalidate(&[Tag::list("Items")]);
        Ok::<_, String>(vec![99])
      })
      .await
      .unwrap();
    assert_eq!(first.data, vec![99]);

    let calls = AtomicU32::new(0);
    let after = fetch_counting(&cache, "items", &calls).await.unwrap();
    assert_eq!(after.source, CacheSource::Network);
    assert_eq!(after.data, vec![0]);
  }

  #[tokio::test]
  async fn test_noop_storage_always_fetches() {
    let cache = CacheLayer::new(NoopStorage);
    let calls = AtomicU32::new(0);

    fetch_counting(&cache, "items", &calls).await.unwrap();
    fetch_counting(&cache, "items", &calls).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
