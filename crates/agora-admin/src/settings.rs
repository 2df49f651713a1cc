//! Runtime configuration for `agora-admin`.

use std::path::{Path, PathBuf};

use agora_store_sqlite::StoreOptions;
use serde::Deserialize;

/// Settings read from `agora.toml` and `AGORA_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
  pub store_path:         PathBuf,
  /// Rows scanned per backfill page when `--limit` is not given.
  pub backfill_batch:     u32,
  pub dispersal_capacity: usize,
}

impl Default for AdminConfig {
  fn default() -> Self {
    Self {
      store_path:         PathBuf::from("agora.db"),
      backfill_batch:     500,
      dispersal_capacity: StoreOptions::default().dispersal_capacity,
    }
  }
}

impl AdminConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("AGORA"))
      .build()?
      .try_deserialize()
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions { dispersal_capacity: self.dispersal_capacity }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = AdminConfig::load(Path::new("/nonexistent/agora.toml")).unwrap();
    assert_eq!(cfg.backfill_batch, 500);
    assert_eq!(cfg.dispersal_capacity, 64);
    assert_eq!(cfg.store_path, PathBuf::from("agora.db"));
  }

  #[test]
  fn store_options_follow_the_configured_capacity() {
    let cfg = AdminConfig { dispersal_capacity: 8, ..AdminConfig::default() };
    assert_eq!(cfg.store_options().dispersal_capacity, 8);
    assert_eq!(
      AdminConfig::default().store_options().dispersal_capacity,
      StoreOptions::default().dispersal_capacity
    );
  }

  #[test]
  fn tilde_only_expands_as_a_prefix() {
    assert_eq!(expand_tilde(Path::new("/var/agora.db")), PathBuf::from("/var/agora.db"));
    assert_eq!(expand_tilde(Path::new("a/~/b")), PathBuf::from("a/~/b"));
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/agora.db")),
        PathBuf::from(home).join("agora.db")
      );
    }
  }
}
