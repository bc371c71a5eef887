//! File-based cache configuration.
//!
//! ```yaml
//! namespace: analytics
//! shards: 16
//! sweep_interval: 5m
//! background_sweep: true
//! local_storage:
//!   path: /var/lib/dashboard/cache.json
//!   quota_bytes: 5242880
//! session_quota_bytes: 1048576
//! ```

use crate::error::{BuildError, Result};
use crate::task::janitor::DEFAULT_SWEEP_INTERVAL;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Settings for a [`TieredCache`](crate::TieredCache), typically read from
/// YAML. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
  #[serde(default)]
  pub namespace: Option<String>,
  #[serde(default)]
  pub shards: Option<usize>,
  /// A humantime duration such as `"30s"` or `"5m"`.
  #[serde(default = "default_sweep_interval", deserialize_with = "humantime_duration")]
  pub sweep_interval: Duration,
  #[serde(default = "default_background_sweep")]
  pub background_sweep: bool,
  /// File-backed durable-local storage. Memory-backed when absent.
  #[serde(default)]
  pub local_storage: Option<LocalStorageConfig>,
  #[serde(default)]
  pub session_quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalStorageConfig {
  pub path: PathBuf,
  #[serde(default)]
  pub quota_bytes: Option<usize>,
}

fn default_sweep_interval() -> Duration {
  DEFAULT_SWEEP_INTERVAL
}

fn default_background_sweep() -> bool {
  true
}

fn humantime_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      namespace: None,
      shards: None,
      sweep_interval: default_sweep_interval(),
      background_sweep: default_background_sweep(),
      local_storage: None,
      session_quota_bytes: None,
    }
  }
}

impl CacheConfig {
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    serde_yaml::from_str(yaml).map_err(|e| BuildError::Config(e.to_string()))
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let file = File::open(path)
      .map_err(|e| BuildError::Config(format!("cannot open '{}': {e}", path.display())))?;
    serde_yaml::from_reader(BufReader::new(file)).map_err(|e| BuildError::Config(e.to_string()))
  }
}
