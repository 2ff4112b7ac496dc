use crate::config::raw::{
  CacheLimitsRaw, ClientConfigRaw, LogFormatRaw, LoggingConfigRaw, StorageConfigRaw,
};
use crate::error::{Error, Result};

use std::path::PathBuf;
use std::time::Duration;

use tracing::level_filters::LevelFilter;

pub const DEFAULT_REHYDRATE_TTL: Duration = Duration::from_secs(5);

/// Validated client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  pub logging: LoggingConfig,
  pub storage: StorageConfig,
  pub caches: CachesConfig,
  /// TTL for entries restored from a persisted snapshot.
  pub rehydrate_ttl: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      logging: LoggingConfig::default(),
      storage: StorageConfig::Memory,
      caches: CachesConfig::default(),
      rehydrate_ttl: DEFAULT_REHYDRATE_TTL,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  #[default]
  Pattern,
  Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
  pub level: LevelFilter,
  pub format: LogFormat,
  pub filter: Option<String>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: LevelFilter::INFO,
      format: LogFormat::Pattern,
      filter: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageConfig {
  #[default]
  Memory,
  File { directory: PathBuf },
}

/// Limits for one named cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
  pub max_entries: usize,
  pub max_cost: Option<u64>,
  pub ttl: Duration,
  pub warmup_parallelism: usize,
}

impl CacheLimits {
  pub const TIMELINE: CacheLimits = CacheLimits {
    max_entries: 16,
    max_cost: Some(256),
    ttl: Duration::from_secs(20),
    warmup_parallelism: 2,
  };

  pub const SUMMARY: CacheLimits = CacheLimits {
    max_entries: 4,
    max_cost: None,
    ttl: Duration::from_secs(15),
    warmup_parallelism: 1,
  };

  pub const COUNTRY: CacheLimits = CacheLimits {
    max_entries: 512,
    max_cost: None,
    ttl: Duration::from_secs(3_600),
    warmup_parallelism: 4,
  };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachesConfig {
  pub timeline: CacheLimits,
  pub summary: CacheLimits,
  pub country: CacheLimits,
}

impl Default for CachesConfig {
  fn default() -> Self {
    Self {
      timeline: CacheLimits::TIMELINE,
      summary: CacheLimits::SUMMARY,
      country: CacheLimits::COUNTRY,
    }
  }
}

pub fn process_raw_config(raw_config: ClientConfigRaw) -> Result<ClientConfig> {
  let logging = process_logging(raw_config.logging)?;

  let storage = match raw_config.storage {
    StorageConfigRaw::Memory => StorageConfig::Memory,
    StorageConfigRaw::File(raw_file) => {
      if raw_file.directory.trim().is_empty() {
        return Err(Error::InvalidConfigValue {
          field: "storage.directory".to_string(),
          message: "File storage directory cannot be empty.".to_string(),
        });
      }
      StorageConfig::File {
        directory: PathBuf::from(raw_file.directory),
      }
    }
  };

  let caches = CachesConfig {
    timeline: merge_limits("timeline", CacheLimits::TIMELINE, raw_config.caches.timeline)?,
    summary: merge_limits("summary", CacheLimits::SUMMARY, raw_config.caches.summary)?,
    country: merge_limits("country", CacheLimits::COUNTRY, raw_config.caches.country)?,
  };

  let rehydrate_ttl = match raw_config.rehydrate_ttl {
    Some(raw) => parse_duration(&raw, "rehydrate_ttl")?,
    None => DEFAULT_REHYDRATE_TTL,
  };

  Ok(ClientConfig {
    logging,
    storage,
    caches,
    rehydrate_ttl,
  })
}

fn process_logging(raw: LoggingConfigRaw) -> Result<LoggingConfig> {
  let level = raw
    .level
    .trim()
    .parse::<LevelFilter>()
    .map_err(|_| Error::InvalidConfigValue {
      field: "logging.level".to_string(),
      message: format!(
        "Invalid log level string '{}'. Expected TRACE, DEBUG, INFO, WARN, ERROR, or OFF.",
        raw.level
      ),
    })?;

  let format = match raw.format {
    LogFormatRaw::Pattern => LogFormat::Pattern,
    LogFormatRaw::Json => LogFormat::Json,
  };

  let filter = raw.filter.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());

  Ok(LoggingConfig { level, format, filter })
}

fn merge_limits(name: &str, defaults: CacheLimits, raw: CacheLimitsRaw) -> Result<CacheLimits> {
  let invalid = |field: &str, message: &str| Error::InvalidConfigValue {
    field: format!("caches.{}.{}", name, field),
    message: message.to_string(),
  };

  let max_entries = raw.max_entries.unwrap_or(defaults.max_entries);
  if max_entries == 0 {
    return Err(invalid("max_entries", "A cache must allow at least one entry."));
  }

  let max_cost = match raw.max_cost {
    Some(0) => return Err(invalid("max_cost", "max_cost must be greater than zero.")),
    Some(cost) => Some(cost),
    None => defaults.max_cost,
  };

  let ttl = match raw.ttl {
    Some(raw_ttl) => parse_duration(&raw_ttl, &format!("caches.{}.ttl", name))?,
    None => defaults.ttl,
  };

  let warmup_parallelism = raw.warmup_parallelism.unwrap_or(defaults.warmup_parallelism);
  if warmup_parallelism == 0 {
    return Err(invalid("warmup_parallelism", "Warm-up needs at least one worker."));
  }

  Ok(CacheLimits {
    max_entries,
    max_cost,
    ttl,
    warmup_parallelism,
  })
}

fn parse_duration(value: &str, field: &str) -> Result<Duration> {
  humantime::parse_duration(value.trim()).map_err(|e| Error::InvalidConfigValue {
    field: field.to_string(),
    message: format!("Invalid duration '{}': {}", value, e),
  })
}
