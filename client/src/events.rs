//! Typed views of the loosely shaped events the backend emits.
//!
//! Payloads arrive as arbitrary JSON. Every field is read defensively: keys
//! may be camelCase or snake_case, numbers may arrive as strings, and
//! anything missing or malformed falls back to a neutral value instead of
//! failing the whole event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TorStatus {
  #[default]
  Disconnected,
  Connecting,
  Retrying,
  Connected,
  Disconnecting,
  Error,
  /// A status string this client does not recognise. The raw text stays in
  /// [`StatusUpdate::last_transition`].
  Unknown,
}

impl TorStatus {
  /// Maps a raw status string. Transient identity and circuit changes count
  /// as connected. Matching is exact, so `connected` is [`TorStatus::Unknown`].
  pub fn from_raw(raw: &str) -> Self {
    match raw.trim() {
      "CONNECTING" => TorStatus::Connecting,
      "RETRYING" => TorStatus::Retrying,
      "CONNECTED" | "NEW_IDENTITY" | "NEW_CIRCUIT" => TorStatus::Connected,
      "DISCONNECTING" => TorStatus::Disconnecting,
      "DISCONNECTED" => TorStatus::Disconnected,
      "ERROR" => TorStatus::Error,
      _ => TorStatus::Unknown,
    }
  }

  /// `true` once the connection is gone, which makes any cached connection
  /// data stale.
  pub fn is_terminal(&self) -> bool {
    matches!(self, TorStatus::Disconnected | TorStatus::Error)
  }

  /// `true` for states that settle retry and bootstrap progress back to zero.
  pub fn is_settled(&self) -> bool {
    matches!(self, TorStatus::Connected | TorStatus::Disconnected | TorStatus::Error)
  }
}

/// A `tor-status-update` event.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
  pub status: TorStatus,
  /// The status string exactly as sent, e.g. `NEW_IDENTITY`.
  pub last_transition: Option<String>,
  pub bootstrap_progress: f64,
  pub bootstrap_message: Option<String>,
  pub error_message: Option<String>,
  pub error_step: Option<String>,
  pub error_source: Option<String>,
  pub retry_count: u64,
  pub retry_delay: u64,
}

impl StatusUpdate {
  pub fn from_payload(payload: &Value) -> Self {
    let last_transition = text(payload, &["status"]);
    let status = last_transition
      .as_deref()
      .map(TorStatus::from_raw)
      .unwrap_or_default();

    Self {
      status,
      last_transition,
      bootstrap_progress: number(payload, &["bootstrapProgress", "bootstrap_progress"]).unwrap_or(0.0),
      bootstrap_message: text(payload, &["bootstrapMessage", "bootstrap_message"]),
      error_message: text(payload, &["errorMessage", "error_message"]),
      error_step: text(payload, &["errorStep", "error_step"]),
      error_source: text(payload, &["errorSource", "error_source"]),
      retry_count: count(payload, &["retryCount", "retry_count"]),
      retry_delay: count(payload, &["retryDelay", "retry_delay"]),
    }
  }

  pub fn is_terminal(&self) -> bool {
    self.status.is_terminal()
  }
}

/// A `metrics-update` event, normalized into one chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
  pub time: DateTime<Utc>,
  pub memory_mb: u64,
  pub circuit_count: u64,
  /// Only reported when the backend sent an actual number.
  pub latency_ms: Option<u64>,
  pub oldest_age: u64,
  pub avg_create_ms: u64,
  pub failed_attempts: u64,
  pub cpu_percent: f64,
  pub network_bytes: u64,
  pub network_total: u64,
  pub complete: bool,
}

impl MetricSample {
  pub fn from_payload(payload: &Value, time: DateTime<Utc>) -> Self {
    let memory_bytes = number(payload, &["memory_bytes", "memoryBytes"]).unwrap_or(0.0);
    let latency_ms = field(payload, &["latency_ms", "latencyMs"])
      .and_then(Value::as_f64)
      .filter(|ms| ms.is_finite() && *ms >= 0.0)
      .map(|ms| ms as u64);

    Self {
      time,
      memory_mb: (memory_bytes / 1_000_000.0).round().max(0.0) as u64,
      circuit_count: count(payload, &["circuit_count", "circuitCount"]),
      latency_ms,
      oldest_age: count(payload, &["oldest_age", "oldestAge"]),
      avg_create_ms: count(payload, &["avg_create_ms", "avgCreateMs"]),
      failed_attempts: count(payload, &["failed_attempts", "failedAttempts"]),
      cpu_percent: number(payload, &["cpu_percent", "cpuPercent"]).unwrap_or(0.0),
      network_bytes: count(payload, &["network_bytes", "networkBytes"]),
      network_total: count(payload, &["total_network_bytes", "totalNetworkBytes"]),
      complete: field(payload, &["complete"]).and_then(Value::as_bool).unwrap_or(true),
    }
  }
}

/// First non-null value among `names`.
fn field<'a>(payload: &'a Value, names: &[&str]) -> Option<&'a Value> {
  names
    .iter()
    .find_map(|name| payload.get(*name).filter(|value| !value.is_null()))
}

fn text(payload: &Value, names: &[&str]) -> Option<String> {
  match field(payload, names)? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn number(payload: &Value, names: &[&str]) -> Option<f64> {
  let value = match field(payload, names)? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }?;
  value.is_finite().then_some(value)
}

fn count(payload: &Value, names: &[&str]) -> u64 {
  number(payload, names)
    .filter(|n| *n >= 0.0)
    .map(|n| n as u64)
    .unwrap_or(0)
}
