pub mod processed;
pub mod raw;

pub use processed::{
  CacheLimits, CachesConfig, ClientConfig, LogFormat, LoggingConfig, StorageConfig,
  DEFAULT_REHYDRATE_TTL,
};

use crate::error::{Error, Result};

use std::env;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_BASE_NAME: &str = "torwell";
const DEFAULT_CONFIG_EXTENSION: &str = "yaml";

/// Finds the configuration file in the working directory, preferring an
/// environment-specific `torwell.<env>.yaml` over `torwell.yaml`.
///
/// Without an explicit suffix the environment is read from `TORWELL_ENV`,
/// then `APP_ENV`.
pub fn find_config_file(environment_suffix: Option<&str>) -> Result<PathBuf> {
  find_config_file_in(Path::new("."), environment_suffix)
}

pub(crate) fn find_config_file_in(dir: &Path, environment_suffix: Option<&str>) -> Result<PathBuf> {
  let base_name = DEFAULT_CONFIG_BASE_NAME;
  let extension = DEFAULT_CONFIG_EXTENSION;

  let env_from_var = environment_suffix
    .map(|s| s.to_string())
    .or_else(|| env::var("TORWELL_ENV").ok())
    .or_else(|| env::var("APP_ENV").ok());

  let mut files_to_check: Vec<String> = Vec::new();
  if let Some(env_str) = &env_from_var {
    if !env_str.is_empty() {
      files_to_check.push(format!("{}.{}.{}", base_name, env_str, extension));
    }
  }
  files_to_check.push(format!("{}.{}", base_name, extension));

  for file_name in &files_to_check {
    let path = dir.join(file_name);
    if path.is_file() {
      return Ok(path);
    }
  }

  Err(Error::ConfigNotFound(format!(
    "Searched for: {:?} in {:?}. Provide a config file or check TORWELL_ENV/APP_ENV.",
    files_to_check, dir
  )))
}

/// Reads, parses and validates a YAML configuration file.
pub fn load_config(config_path: &Path) -> Result<ClientConfig> {
  let file = File::open(config_path)?;
  let raw_config: raw::ClientConfigRaw = serde_yaml::from_reader(io::BufReader::new(file))
    .map_err(|e| Error::ConfigParse(e.to_string()))?;
  let config = processed::process_raw_config(raw_config)?;
  tracing::debug!(path = ?config_path, "loaded client configuration");
  Ok(config)
}

/// Parses and validates YAML configuration text.
pub fn parse_config(yaml: &str) -> Result<ClientConfig> {
  let raw_config: raw::ClientConfigRaw =
    serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse(e.to_string()))?;
  processed::process_raw_config(raw_config)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use std::fs;
  use std::time::Duration;
  use tracing::level_filters::LevelFilter;

  #[test]
  fn parse_full_config() {
    let config = parse_config(
      r#"
logging:
  level: debug
  format: json
  filter: "torwell_client=trace,info"
storage:
  kind: file
  directory: /var/lib/torwell
caches:
  timeline:
    max_entries: 32
    ttl: 30s
  country:
    warmup_parallelism: 8
rehydrate_ttl: 3s
"#,
    )
    .unwrap();

    assert_eq!(config.logging.level, LevelFilter::DEBUG);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.filter.as_deref(), Some("torwell_client=trace,info"));
    assert_eq!(
      config.storage,
      StorageConfig::File {
        directory: PathBuf::from("/var/lib/torwell")
      }
    );
    assert_eq!(config.caches.timeline.max_entries, 32);
    assert_eq!(config.caches.timeline.max_cost, Some(256));
    assert_eq!(config.caches.timeline.ttl, Duration::from_secs(30));
    assert_eq!(config.caches.country.warmup_parallelism, 8);
    assert_eq!(config.rehydrate_ttl, Duration::from_secs(3));
  }

  #[test]
  fn empty_document_uses_defaults() {
    let config = parse_config("{}").unwrap();
    assert_eq!(config, ClientConfig::default());
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let result = parse_config("caches:\n  timeline:\n    max_entrys: 3\n");
    assert!(matches!(result, Err(Error::ConfigParse(_))));

    let result = parse_config("storage:\n  kind: cloud\n");
    assert!(matches!(result, Err(Error::ConfigParse(_))));
  }

  #[test]
  fn find_prefers_environment_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("torwell.yaml"), "{}").unwrap();
    fs::write(dir.path().join("torwell.dev.yaml"), "{}").unwrap();

    let found = find_config_file_in(dir.path(), Some("dev")).unwrap();
    assert_eq!(found, dir.path().join("torwell.dev.yaml"));

    let found = find_config_file_in(dir.path(), Some("prod")).unwrap();
    assert_eq!(found, dir.path().join("torwell.yaml"));
  }

  #[test]
  fn find_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = find_config_file_in(dir.path(), Some("dev"));
    assert!(matches!(result, Err(Error::ConfigNotFound(_))));
  }

  #[test]
  fn load_config_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("torwell.yaml");
    fs::write(&path, "logging:\n  level: warn\n").unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.logging.level, LevelFilter::WARN);

    let missing = load_config(&dir.path().join("absent.yaml"));
    assert!(matches!(missing, Err(Error::ConfigRead(_))));
  }
}
