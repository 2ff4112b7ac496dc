use std::time::Duration;

/// A point-in-time copy of one live cache entry, produced by
/// [`AdaptiveCache::snapshot`] for external persistence.
///
/// Timestamps are milliseconds on the clock of the cache that produced the
/// snapshot.
///
/// [`AdaptiveCache::snapshot`]: crate::AdaptiveCache::snapshot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SnapshotEntry<K, V> {
  pub key: K,
  pub value: V,
  pub expires_at: Option<u64>,
  pub frequency: u64,
  pub last_accessed: u64,
  pub cost: u64,
  pub tags: Option<Vec<String>>,
}

impl<K, V> SnapshotEntry<K, V> {
  /// Remaining lifetime relative to `now`. `Some(Duration::ZERO)` means the
  /// entry has expired since the snapshot was taken.
  pub fn ttl_remaining(&self, now: u64) -> Option<Duration> {
    self
      .expires_at
      .map(|expires_at| Duration::from_millis(expires_at.saturating_sub(now)))
  }

  #[inline]
  pub fn is_expired(&self, now: u64) -> bool {
    matches!(self.expires_at, Some(expires_at) if expires_at <= now)
  }
}
