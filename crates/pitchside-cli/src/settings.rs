//! Application configuration, read from `pitchside.toml` and `PITCHSIDE__*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use pitchside_core::{session::SessionOptions, sync::SyncPolicy};
use pitchside_remote::RemoteConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// SQLite file holding attempts; a leading `~/` is expanded.
  pub store_path: PathBuf,
  pub remote:     RemoteSection,
  pub session:    SessionSection,
  pub sync:       SyncSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
  /// Without a base URL link puzzles cannot be played and sync is skipped.
  pub base_url:     Option<String>,
  pub api_key:      Option<String>,
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
  pub link_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSection {
  pub base_delay_secs: u64,
  pub max_delay_secs:  u64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/pitchside/attempts.db"),
      remote:     RemoteSection::default(),
      session:    SessionSection::default(),
      sync:       SyncSection::default(),
    }
  }
}

impl Default for RemoteSection {
  fn default() -> Self { Self { base_url: None, api_key: None, timeout_secs: 10 } }
}

impl Default for SessionSection {
  fn default() -> Self { Self { link_timeout_secs: 8 } }
}

impl Default for SyncSection {
  fn default() -> Self { Self { base_delay_secs: 5, max_delay_secs: 600 } }
}

impl AppConfig {
  /// Layer the optional config file under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PITCHSIDE").separator("__"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn remote_config(&self) -> Option<RemoteConfig> {
    let base_url = self.remote.base_url.clone().filter(|url| !url.trim().is_empty())?;
    Some(RemoteConfig {
      base_url,
      api_key: self.remote.api_key.clone(),
      timeout: Duration::from_secs(self.remote.timeout_secs),
    })
  }

  pub fn session_options(&self) -> SessionOptions {
    SessionOptions { link_timeout: Duration::from_secs(self.session.link_timeout_secs) }
  }

  pub fn sync_policy(&self) -> SyncPolicy {
    SyncPolicy {
      base_delay: Duration::from_secs(self.sync.base_delay_secs),
      max_delay:  Duration::from_secs(self.sync.max_delay_secs),
    }
  }
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
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> AppConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.store_path, PathBuf::from("~/.local/share/pitchside/attempts.db"));
    assert!(cfg.remote_config().is_none());
    assert_eq!(cfg.session_options().link_timeout, Duration::from_secs(8));
    assert_eq!(cfg.sync_policy(), SyncPolicy::default());
  }

  #[test]
  fn sections_override_defaults() {
    let cfg = parse(
      r#"
        store_path = "/var/lib/pitchside/attempts.db"

        [remote]
        base_url = "https://pitchside.example"
        api_key = "s3cret"
        timeout_secs = 3

        [session]
        link_timeout_secs = 2

        [sync]
        max_delay_secs = 60
      "#,
    );
    assert_eq!(cfg.store_path(), PathBuf::from("/var/lib/pitchside/attempts.db"));
    let remote = cfg.remote_config().unwrap();
    assert_eq!(remote.base_url, "https://pitchside.example");
    assert_eq!(remote.api_key.as_deref(), Some("s3cret"));
    assert_eq!(remote.timeout, Duration::from_secs(3));
    assert_eq!(cfg.session_options().link_timeout, Duration::from_secs(2));
    assert_eq!(cfg.sync_policy().base_delay, Duration::from_secs(5));
    assert_eq!(cfg.sync_policy().max_delay, Duration::from_secs(60));
  }

  #[test]
  fn blank_base_url_means_no_remote() {
    let cfg = parse("[remote]\nbase_url = \"  \"\n");
    assert!(cfg.remote_config().is_none());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/attempts.db")), PathBuf::from(home).join("attempts.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/a.db")), PathBuf::from("/tmp/a.db"));
  }
}
