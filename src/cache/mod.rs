//! Tag-invalidated query cache.
//!
//! This module provides an API-agnostic caching mechanism that:
//! - Caches query results keyed by a stable hash of the query
//! - Labels each result with tags (one per entity plus a collection tag)
//! - Marks every dependent result stale when a tag is invalidated
//! - Refetches stale or expired results on the next read

mod layer;
mod storage;
mod tags;
mod traits;

pub use layer::CacheLayer;
pub use storage::{MemoryStorage, NoopStorage};
pub use tags::Tag;
pub use traits::{Cacheable, QueryKey};
