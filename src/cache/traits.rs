//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::tags::Tag;

/// Trait for entities that can be cached.
///
/// Implementors provide the backend identity used for their entity tag and the
/// resource name shared by every tag of the same type.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Backend identifier for this entity (e.g., a product `_id`)
  fn cache_id(&self) -> &str;

  /// Resource name used as the tag namespace (e.g., "Products")
  fn resource() -> &'static str;

  /// Tag identifying this specific entity.
  fn entity_tag(&self) -> Tag {
    Tag::entity(Self::resource(), self.cache_id())
  }
}

/// Key identifying one cached query.
pub trait QueryKey {
  /// Stable, fixed-length key for storage lookup.
  fn cache_hash(&self) -> String;

  /// Human-readable description for logging.
  fn description(&self) -> String;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  Cache,
}
