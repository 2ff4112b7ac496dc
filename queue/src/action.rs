use serde::{Deserialize, Serialize};
use std::fmt;

/// The connection commands the queue serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKey {
  Connect,
  Disconnect,
  BuildCircuit,
  NewIdentity,
}

impl ActionKey {
  pub const ALL: [ActionKey; 4] = [
    ActionKey::Connect,
    ActionKey::Disconnect,
    ActionKey::BuildCircuit,
    ActionKey::NewIdentity,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ActionKey::Connect => "connect",
      ActionKey::Disconnect => "disconnect",
      ActionKey::BuildCircuit => "build_circuit",
      ActionKey::NewIdentity => "new_identity",
    }
  }
}

impl fmt::Display for ActionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// The same key was already running or waiting.
  Duplicate,
}

/// Outcome of a submission that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueExecution<T> {
  Skipped { reason: SkipReason },
  Completed(T),
}

impl<T> QueueExecution<T> {
  pub fn is_skipped(&self) -> bool {
    matches!(self, QueueExecution::Skipped { .. })
  }

  pub fn is_completed(&self) -> bool {
    matches!(self, QueueExecution::Completed(_))
  }

  /// The task's result, if it ran.
  pub fn completed(self) -> Option<T> {
    match self {
      QueueExecution::Completed(value) => Some(value),
      QueueExecution::Skipped { .. } => None,
    }
  }
}

/// Where a key currently stands in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
  Idle,
  Queued,
  Active,
}
