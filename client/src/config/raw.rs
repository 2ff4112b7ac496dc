use serde::Deserialize;

// --- Top Level Config ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ClientConfigRaw {
  #[serde(default)]
  pub logging: LoggingConfigRaw,
  #[serde(default)]
  pub storage: StorageConfigRaw,
  #[serde(default)]
  pub caches: CachesConfigRaw,
  /// TTL given to entries restored from a snapshot, e.g. "5s".
  #[serde(default)]
  pub rehydrate_ttl: Option<String>,
}

// --- Logging ---
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfigRaw {
  #[serde(default = "default_level")]
  pub level: String,
  #[serde(default)]
  pub format: LogFormatRaw,
  /// Full `EnvFilter` directive string. Overrides `level` when set.
  #[serde(default)]
  pub filter: Option<String>,
}

fn default_level() -> String {
  "info".to_string()
}

impl Default for LoggingConfigRaw {
  fn default() -> Self {
    Self {
      level: default_level(),
      format: LogFormatRaw::default(),
      filter: None,
    }
  }
}

#[derive(Debug, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatRaw {
  #[default]
  Pattern,
  Json,
}

// --- Snapshot Storage ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum StorageConfigRaw {
  #[default]
  Memory,
  File(FileStorageConfigRaw),
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileStorageConfigRaw {
  pub directory: String,
}

// --- Named Caches ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CachesConfigRaw {
  #[serde(default)]
  pub timeline: CacheLimitsRaw,
  #[serde(default)]
  pub summary: CacheLimitsRaw,
  #[serde(default)]
  pub country: CacheLimitsRaw,
}

/// Overrides for one named cache. Missing fields keep the built-in limits.
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CacheLimitsRaw {
  pub max_entries: Option<usize>,
  pub max_cost: Option<u64>,
  /// Default entry TTL, e.g. "20s" or "1h".
  pub ttl: Option<String>,
  pub warmup_parallelism: Option<usize>,
}
