//! Runtime configuration: an optional TOML file layered under
//! `HIREBOT_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Capacity of the change-event channel; slow subscribers past this lag.
  pub change_buffer: usize,
}

impl ServerConfig {
  /// Load from `path` (if it exists) and the environment, over defaults.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8000)?
      .set_default("store_path", "hirebot.db")?
      .set_default("change_buffer", 256)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("HIREBOT"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
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
  fn defaults_apply_without_a_file() {
    let cfg = ServerConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(cfg.change_buffer, 256);
    assert!(!cfg.host.is_empty());
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/data/hirebot.db")), PathBuf::from(home).join("data/hirebot.db"));
    assert_eq!(expand_tilde(Path::new("/abs/hirebot.db")), PathBuf::from("/abs/hirebot.db"));
  }
}
