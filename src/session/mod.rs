//! Session state: the administrator credential and its persistent copy.

mod storage;

use color_eyre::Result;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

pub use storage::{SqliteTokenStorage, TokenStorage};

#[cfg(test)]
pub use storage::MemoryTokenStorage;

/// Well-known storage key holding the credential.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Holder of the current bearer credential.
///
/// Starts empty. [`SessionStore::hydrate`] copies the persisted credential
/// into memory and must run before any authenticated request; setters write
/// through to storage. Clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
  credential: Arc<RwLock<Option<String>>>,
  storage: Arc<dyn TokenStorage>,
}

impl SessionStore {
  pub fn new(storage: impl TokenStorage + 'static) -> Self {
    Self {
      credential: Arc::new(RwLock::new(None)),
      storage: Arc::new(storage),
    }
  }

  /// Load the persisted credential into memory. Safe to call repeatedly.
  pub fn hydrate(&self) -> Result<()> {
    let stored = self
      .storage
      .read(ACCESS_TOKEN_KEY)?
      .filter(|t| !t.is_empty());
    debug!(present = stored.is_some(), "session hydrated");
    self.replace(stored);
    Ok(())
  }

  /// Set the credential and persist it.
  pub fn set_credential(&self, token: &str) -> Result<()> {
    self.replace(Some(token.to_string()));
    self.storage.write(ACCESS_TOKEN_KEY, token)
  }

  /// Forget the credential in memory and in storage.
  pub fn clear(&self) -> Result<()> {
    self.replace(None);
    self.storage.remove(ACCESS_TOKEN_KEY)
  }

  /// Current in-memory credential.
  pub fn credential(&self) -> Option<String> {
    self
      .credential
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Whether a credential is present in memory or, failing that, in storage.
  pub fn has_credential(&self) -> bool {
    self.credential().is_some()
      || matches!(self.storage.read(ACCESS_TOKEN_KEY), Ok(Some(t)) if !t.is_empty())
  }

  fn replace(&self, value: Option<String>) {
    *self
      .credential
      .write()
      .unwrap_or_else(PoisonError::into_inner) = value;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_starts_empty() {
    let session = SessionStore::new(MemoryTokenStorage::default());
    assert_eq!(session.credential(), None);
    assert!(!session.has_credential());
  }

  #[test]
  fn test_hydrate_is_idempotent() {
    let storage = MemoryTokenStorage::default();
    storage.write(ACCESS_TOKEN_KEY, "T1").unwrap();
    let session = SessionStore::new(storage);

    session.hydrate().unwrap();
    let once = session.credential();
    session.hydrate().unwrap();

    assert_eq!(once.as_deref(), Some("T1"));
    assert_eq!(session.credential(), once);
  }

  #[test]
  fn test_empty_stored_value_counts_as_absent() {
    let storage = MemoryTokenStorage::default();
    storage.write(ACCESS_TOKEN_KEY, "").unwrap();
    let session = SessionStore::new(storage);

    session.hydrate().unwrap();
    assert_eq!(session.credential(), None);
    assert!(!session.has_credential());
  }

  #[test]
  fn test_set_credential_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.db");

    let session = SessionStore::new(SqliteTokenStorage::open_at(&path).unwrap());
    session.set_credential("T1").unwrap();
    assert_eq!(session.credential().as_deref(), Some("T1"));

    let reloaded = SessionStore::new(SqliteTokenStorage::open_at(&path).unwrap());
    assert_eq!(reloaded.credential(), None);
    reloaded.hydrate().unwrap();
    assert_eq!(reloaded.credential().as_deref(), Some("T1"));
  }

  #[test]
  fn test_clear_removes_persisted_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.db");

    let session = SessionStore::new(SqliteTokenStorage::open_at(&path).unwrap());
    session.set_credential("T1").unwrap();
    session.clear().unwrap();
    assert_eq!(session.credential(), None);

    let reloaded = SessionStore::new(SqliteTokenStorage::open_at(&path).unwrap());
    reloaded.hydrate().unwrap();
    assert_eq!(reloaded.credential(), None);
  }

  #[test]
  fn test_clones_share_state() {
    let session = SessionStore::new(MemoryTokenStorage::default());
    let other = session.clone();

    session.set_credential("T1").unwrap();
    assert_eq!(other.credential().as_deref(), Some("T1"));
  }
}
