use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::kenall::DEFAULT_BASE_URL;
use crate::paging::{DEFAULT_CAPACITY, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Custom title for header (defaults to "kenall")
  pub title: Option<String>,
  pub api: ApiConfig,
  pub corporate: CorporateConfig,
  pub autocomplete: AutocompleteConfig,
  pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Per-request timeout in milliseconds
  pub timeout_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout_ms: 10_000,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorporateConfig {
  /// Results fetched per request by the corporate search table
  pub page_size: u64,
  /// Pages kept in memory per search
  pub cache_capacity: usize,
}

impl Default for CorporateConfig {
  fn default() -> Self {
    Self {
      page_size: DEFAULT_PAGE_SIZE,
      cache_capacity: DEFAULT_CAPACITY,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutocompleteConfig {
  /// Candidates requested per address search
  pub limit: u64,
  /// Address searches remembered per session
  pub memo_capacity: usize,
}

impl Default for AutocompleteConfig {
  fn default() -> Self {
    Self {
      limit: 20,
      memo_capacity: 256,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
  /// Delay before a resolved postal code fills the address fields
  pub autofill_delay_ms: u64,
  /// Postal codes remembered per session
  pub memo_capacity: usize,
}

impl Default for LookupConfig {
  fn default() -> Self {
    Self {
      autofill_delay_ms: 2_000,
      memo_capacity: 256,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./kenall.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/kenall/config.yaml
  ///
  /// Without a file every setting takes its default. `KENALL_API_BASE_URL`
  /// overrides the configured base URL either way.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(base_url) = std::env::var("KENALL_API_BASE_URL") {
      if !base_url.trim().is_empty() {
        config.api.base_url = base_url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("kenall.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("kenall").join("config.yaml");
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

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Header title
  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("kenall")
  }

  /// Get the KEN_ALL API key from environment variables.
  ///
  /// Checks KENALL_API_KEY.
  pub fn get_api_key() -> Result<String> {
    std::env::var("KENALL_API_KEY")
      .ok()
      .filter(|key| !key.trim().is_empty())
      .ok_or_else(|| eyre!("KEN_ALL API key not found. Set the KENALL_API_KEY environment variable."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "https://api.kenall.jp/v1");
    assert_eq!(config.api.timeout_ms, 10_000);
    assert_eq!(config.corporate.page_size, 30);
    assert_eq!(config.corporate.cache_capacity, 100);
    assert_eq!(config.autocomplete.limit, 20);
    assert_eq!(config.lookup.autofill_delay_ms, 2_000);
    assert_eq!(config.title(), "kenall");
  }

  #[test]
  fn test_parse_partial_file_keeps_defaults() {
    let config = Config::parse(
      r#"
title: demo
api:
  base_url: https://api-beta.kenall.jp/v1
corporate:
  cache_capacity: 5
"#,
    )
    .unwrap();

    assert_eq!(config.title(), "demo");
    assert_eq!(config.api.base_url, "https://api-beta.kenall.jp/v1");
    assert_eq!(config.api.timeout_ms, 10_000);
    assert_eq!(config.corporate.cache_capacity, 5);
    assert_eq!(config.corporate.page_size, 30);
  }

  #[test]
  fn test_parse_empty_file() {
    let config = Config::parse("\n").unwrap();
    assert_eq!(config.autocomplete.limit, 20);
  }

  #[test]
  fn test_parse_rejects_wrong_types() {
    assert!(Config::parse("corporate:\n  page_size: many\n").is_err());
  }
}
