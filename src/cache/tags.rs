//! Cache tags and the tag ↔ entry index used for invalidation.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Tag id shared by every list query over one resource type.
pub const LIST_ID: &str = "LIST";

/// Label attached to cached query results.
///
/// A tag is either the collection marker of a resource (`Products:LIST`) or the
/// identity of one entity (`Products:65f0c1…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
  resource: &'static str,
  id: TagId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum TagId {
  List,
  Entity(String),
}

impl Tag {
  /// Collection tag for a resource.
  pub fn list(resource: &'static str) -> Self {
    Self {
      resource,
      id: TagId::List,
    }
  }

  /// Entity tag for one item of a resource.
  pub fn entity(resource: &'static str, id: impl Into<String>) -> Self {
    Self {
      resource,
      id: TagId::Entity(id.into()),
    }
  }

}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.id {
      TagId::List => write!(f, "{}:{}", self.resource, LIST_ID),
      TagId::Entity(id) => write!(f, "{}:{}", self.resource, id),
    }
  }
}

/// Bipartite map between tags and the cache entries they label.
///
/// Both directions are kept so that re-tagging an entry drops its old edges
/// and invalidating a tag finds every dependent entry.
#[derive(Debug, Default)]
pub struct TagIndex {
  entries_by_tag: HashMap<Tag, HashSet<String>>,
  tags_by_entry: HashMap<String, HashSet<Tag>>,
}

impl TagIndex {
  /// Replace the tags of `entry` with `tags`.
  pub fn attach(&mut self, entry: &str, tags: impl IntoIterator<Item = Tag>) {
    self.detach(entry);

    let tags: HashSet<Tag> = tags.into_iter().collect();
    for tag in &tags {
      self
        .entries_by_tag
        .entry(tag.clone())
        .or_default()
        .insert(entry.to_string());
    }
    if !tags.is_empty() {
      self.tags_by_entry.insert(entry.to_string(), tags);
    }
  }

  /// Remove every edge of `entry`.
  pub fn detach(&mut self, entry: &str) {
    let Some(tags) = self.tags_by_entry.remove(entry) else {
      return;
    };
    for tag in tags {
      if let Some(entries) = self.entries_by_tag.get_mut(&tag) {
        entries.remove(entry);
        if entries.is_empty() {
          self.entries_by_tag.remove(&tag);
        }
      }
    }
  }

  /// Entries labelled with any of `tags`, deduplicated.
  pub fn entries_for<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> HashSet<String> {
    tags
      .into_iter()
      .filter_map(|tag| self.entries_by_tag.get(tag))
      .flatten()
      .cloned()
      .collect()
  }

  /// Tags currently attached to `entry`.
  #[cfg(test)]
  pub fn tags_of(&self, entry: &str) -> Option<&HashSet<Tag>> {
    self.tags_by_entry.get(entry)
  }

  pub fn clear(&mut self) {
    self.entries_by_tag.clear();
    self.tags_by_entry.clear();
  }
}
