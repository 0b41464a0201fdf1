use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Base URL used when neither the config file nor the environment sets one.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api/v1";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub session: SessionConfig,
  /// Email offered by the login prompt
  pub admin_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_API_BASE.to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
  /// Disable to send every read to the network
  pub enabled: bool,
  /// Seconds before a cached result is refetched even if never invalidated
  pub stale_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_secs: 300,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
  /// Credential store location (default: <data_dir>/oadmin/session.db)
  pub path: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./oadmin.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/oadmin/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("oadmin.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("oadmin").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes as null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Apply the base URL override (`--api-base` or `OADMIN_API_BASE`).
  pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
    if let Some(base) = api_base.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()) {
      self.api.base_url = base;
    }
    self
  }

  pub fn stale_time(&self) -> Result<chrono::Duration> {
    let secs = self.cache.stale_secs;
    i64::try_from(secs)
      .ok()
      .and_then(chrono::Duration::try_seconds)
      .ok_or_else(|| eyre!("cache.stale_secs {} is out of range", secs))
  }

  /// Get the administrator password from the environment, if set.
  ///
  /// Checks OADMIN_PASSWORD.
  pub fn get_password() -> Option<String> {
    std::env::var("OADMIN_PASSWORD").ok().filter(|p| !p.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, DEFAULT_API_BASE);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.stale_secs, 300);
    assert_eq!(config.session.path, None);
    assert_eq!(config.stale_time().unwrap(), chrono::Duration::minutes(5));
  }

  #[test]
  fn test_parse_partial_file() {
    let config = Config::parse(
      r#"
api:
  base_url: https://shop.example.com/api/v1
cache:
  stale_secs: 30
admin_email: admin@example.com
"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "https://shop.example.com/api/v1");
    assert!(config.cache.enabled);
    assert_eq!(config.cache.stale_secs, 30);
    assert_eq!(config.admin_email.as_deref(), Some("admin@example.com"));
  }

  #[test]
  fn test_huge_stale_secs_is_an_error() {
    let config = Config::parse("cache:\n  stale_secs: 100000000000000000\n").unwrap();
    let err = config.stale_time().unwrap_err();
    assert!(err.to_string().contains("stale_secs"));

    let config = Config::parse("cache:\n  stale_secs: 18446744073709551615\n").unwrap();
    assert!(config.stale_time().is_err());
  }

  #[test]
  fn test_parse_empty_file() {
    assert_eq!(Config::parse("").unwrap(), Config::default());
    assert_eq!(Config::parse("\n  \n").unwrap(), Config::default());
  }

  #[test]
  fn test_parse_rejects_wrong_types() {
    assert!(Config::parse("cache:\n  enabled: maybe\n").is_err());
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cache:\n  enabled: false\nsession:\n  path: /tmp/oadmin-test.db").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert!(!config.cache.enabled);
    assert_eq!(config.session.path, Some(PathBuf::from("/tmp/oadmin-test.db")));
  }

  #[test]
  fn test_load_missing_explicit_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("nope.yaml"))).is_err());
  }

  #[test]
  fn test_api_base_override() {
    let config = Config::default().with_api_base(Some(" http://10.0.0.2:5000/api/v1 ".into()));
    assert_eq!(config.api.base_url, "http://10.0.0.2:5000/api/v1");

    let config = Config::default().with_api_base(Some("  ".into()));
    assert_eq!(config.api.base_url, DEFAULT_API_BASE);

    let config = Config::default().with_api_base(None);
    assert_eq!(config.api.base_url, DEFAULT_API_BASE);
  }
}
