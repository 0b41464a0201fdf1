//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::tags::{Tag, TagIndex};

/// A single cached query result.
#[derive(Debug, Clone)]
pub struct StoredEntry {
  /// Serialized result
  pub data: Value,
  /// When the result was cached
  pub cached_at: DateTime<Utc>,
  /// Set when one of the entry's tags was invalidated
  pub stale: bool,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get a cached query result.
  fn get(&self, key: &str) -> Option<StoredEntry>;

  /// Invalidation counter, read before a fetch starts and handed back to `put`.
  fn generation(&self) -> u64;

  /// Store a query result under `tags`, replacing any previous entry.
  ///
  /// `since` is the generation observed before the result was fetched. If any
  /// of `tags` was invalidated after it, the entry is stored already stale; if
  /// the storage was cleared after it, nothing is stored.
  fn put(&self, key: &str, data: Value, tags: Vec<Tag>, since: u64);

  /// Mark every entry labelled with any of `tags` stale. Returns how many were hit.
  fn invalidate(&self, tags: &[Tag]) -> usize;

  /// Drop everything.
  fn clear(&self);
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Option<StoredEntry> {
    None // Always miss
  }

  fn generation(&self) -> u64 {
    0
  }

  fn put(&self, _key: &str, _data: Value, _tags: Vec<Tag>, _since: u64) {}

  fn invalidate(&self, _tags: &[Tag]) -> usize {
    0
  }

  fn clear(&self) {}
}

#[derive(Default)]
struct MemoryState {
  entries: HashMap<String, StoredEntry>,
  index: TagIndex,
  /// Bumped by every invalidate and clear
  generation: u64,
  /// Generation at which each tag was last invalidated
  invalidated_at: HashMap<Tag, u64>,
  cleared_at: u64,
}

/// Process-local cache storage.
#[derive(Default)]
pub struct MemoryStorage {
  state: Mutex<MemoryState>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, MemoryState> {
    // Every critical section leaves the maps consistent, so a poisoned lock is still usable.
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.lock().entries.len()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Option<StoredEntry> {
    self.lock().entries.get(key).cloned()
  }

  fn generation(&self) -> u64 {
    self.lock().generation
  }

  fn put(&self, key: &str, data: Value, tags: Vec<Tag>, since: u64) {
    let mut state = self.lock();
    if since < state.cleared_at {
      return;
    }
    let stale = tags
      .iter()
      .any(|tag| state.invalidated_at.get(tag).is_some_and(|&at| at > since));

    state.index.attach(key, tags);
    state.entries.insert(
      key.to_string(),
      StoredEntry {
        data,
        cached_at: Utc::now(),
        stale,
      },
    );
  }

  fn invalidate(&self, tags: &[Tag]) -> usize {
    let mut state = self.lock();
    state.generation += 1;
    let generation = state.generation;
    for tag in tags {
      state.invalidated_at.insert(tag.clone(), generation);
    }

    let keys = state.index.entries_for(tags);
    let mut hit = 0;
    for key in keys {
      if let Some(entry) = state.entries.get_mut(&key) {
        entry.stale = true;
        hit += 1;
      }
    }
    hit
  }

  fn clear(&self) {
    let mut state = self.lock();
    state.generation += 1;
    state.cleared_at = state.generation;
    state.invalidated_at.clear();
    state.entries.clear();
    state.index.clear();
  }
}
