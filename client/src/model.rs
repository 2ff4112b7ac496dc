use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the backend's connection history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEvent {
  pub timestamp: DateTime<Utc>,
  pub status: String,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub detail: Option<String>,
  #[serde(default)]
  pub retry_count: Option<u32>,
  #[serde(default)]
  pub latency_ms: Option<u64>,
  #[serde(default)]
  pub memory_bytes: Option<u64>,
  #[serde(default)]
  pub circuit_count: Option<usize>,
}

/// Aggregated connection health as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealthSummary {
  pub total_events: usize,
  pub connected_events: usize,
  pub error_events: usize,
  pub disconnect_events: usize,
  #[serde(default)]
  pub last_event: Option<ConnectionEvent>,
  #[serde(default)]
  pub last_connected_at: Option<String>,
  #[serde(default)]
  pub last_error_at: Option<String>,
  #[serde(default)]
  pub current_uptime_seconds: Option<u64>,
  #[serde(default)]
  pub longest_uptime_seconds: Option<u64>,
  pub availability_percent: f32,
  pub retry_attempts_last_hour: u32,
}
