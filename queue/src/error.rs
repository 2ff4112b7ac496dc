use std::error::Error as StdError;
use std::fmt;

/// Why a queued action did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError<E> {
  /// The task ran and returned this error.
  Task(E),
  /// The entry was dropped by `reset()` before it started, or its task
  /// panicked.
  Cancelled,
}

impl<E> QueueError<E> {
  pub fn into_task_error(self) -> Option<E> {
    match self {
      QueueError::Task(error) => Some(error),
      QueueError::Cancelled => None,
    }
  }
}

impl<E: fmt::Display> fmt::Display for QueueError<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueueError::Task(error) => write!(f, "{}", error),
      QueueError::Cancelled => write!(f, "queued action was cancelled before it ran"),
    }
  }
}

impl<E: StdError + 'static> StdError for QueueError<E> {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    match self {
      QueueError::Task(error) => Some(error),
      QueueError::Cancelled => None,
    }
  }
}
