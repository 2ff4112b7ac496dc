use std::fmt;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The cache was configured to hold zero entries. Every cache must allow
  /// at least one entry.
  ZeroCapacity { name: String },
  /// A cost ceiling of zero was configured; no entry could ever be stored
  /// since every entry costs at least one unit.
  ZeroCost { name: String },
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroCapacity { name } => {
        write!(f, "cache '{}' must allow at least one entry", name)
      }
      BuildError::ZeroCost { name } => {
        write!(f, "cache '{}' must allow a total cost of at least one", name)
      }
    }
  }
}

impl std::error::Error for BuildError {}

/// The boxed error type produced by warm-up loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
