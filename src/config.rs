use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::CacheSettings;

/// Environment variable overriding `api.base_url`.
pub const BASE_URL_ENV: &str = "PRESSROOM_API_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
  /// Backend root, e.g. `https://blog.example.com/api`
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout(),
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
  /// How long an entry without subscribers is kept
  #[serde(default = "default_keep_unused")]
  pub keep_unused_for_secs: u64,
  /// Refetch on every new subscription even when cached data exists
  #[serde(default)]
  pub refetch_on_mount: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      keep_unused_for_secs: default_keep_unused(),
      refetch_on_mount: false,
    }
  }
}

fn default_keep_unused() -> u64 {
  60
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pressroom.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pressroom/config.yaml
  ///
  /// Built-in defaults apply when no file is found.
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
    let local = PathBuf::from("pressroom.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pressroom").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Replace the base URL when an override is given.
  ///
  /// clap resolves `--base-url` and `PRESSROOM_API_BASE_URL` into one value.
  pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
    if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
      self.api.base_url = url;
    }
    self
  }

  /// Parsed and checked backend root.
  pub fn base_url(&self) -> Result<Url> {
    let url = Url::parse(self.api.base_url.trim())
      .map_err(|e| eyre!("Invalid API base URL {:?}: {}", self.api.base_url, e))?;

    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!(
        "API base URL must use http or https, got {}: {}",
        other,
        url
      )),
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn cache_settings(&self) -> CacheSettings {
    CacheSettings {
      keep_unused_for: Duration::from_secs(self.cache.keep_unused_for_secs),
      refetch_on_mount: self.cache.refetch_on_mount,
    }
  }
}
