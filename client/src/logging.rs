//! Process-wide logging setup.
//!
//! Library code only emits through `tracing` macros; the embedding
//! application calls [`init`] once at startup.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the `log` bridge and a global `tracing` subscriber.
///
/// Fails if either has already been installed in this process.
pub fn init(config: &LoggingConfig) -> Result<()> {
  let filter = build_filter(config)?;

  tracing_log::LogTracer::init().map_err(|e| Error::LoggingInit(e.to_string()))?;

  let registry = tracing_subscriber::registry().with(filter);
  let installed = match config.format {
    LogFormat::Pattern => tracing::subscriber::set_global_default(registry.with(fmt::layer().with_target(true))),
    LogFormat::Json => tracing::subscriber::set_global_default(registry.with(fmt::layer().json())),
  };
  installed.map_err(|e| Error::LoggingInit(e.to_string()))?;

  tracing::debug!(level = %config.level, format = ?config.format, "logging initialized");
  Ok(())
}

/// Explicit filter directives take precedence; the plain level applies when
/// there are none.
pub(crate) fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
  EnvFilter::builder()
    .with_default_directive(config.level.into())
    .parse(config.filter.as_deref().unwrap_or_default())
    .map_err(|e| Error::InvalidConfigValue {
      field: "logging.filter".to_string(),
      message: e.to_string(),
    })
}
