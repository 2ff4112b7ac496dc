use crate::api::BackendError;

use thiserror::Error;
use torwell_cache::BuildError;
use torwell_queue::QueueError;

/// The main error type for `torwell_client`.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Configuration file not found: {0}")]
  ConfigNotFound(String),

  #[error("Failed to read configuration file: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidConfigValue { field: String, message: String },

  #[error("Failed to build cache: {0}")]
  CacheBuild(#[from] BuildError),

  #[error("Snapshot storage failed for '{key}': {source}")]
  Storage {
    key: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to (de)serialize snapshot: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Backend call failed: {0}")]
  Backend(#[from] BackendError),

  #[error("Queued action failed: {0}")]
  Queue(#[from] QueueError<BackendError>),

  #[error("Failed to initialize logging: {0}")]
  LoggingInit(String),

  #[error("No async runtime available: {0}")]
  Runtime(String),
}

/// A specialized `Result` type for `torwell_client` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
