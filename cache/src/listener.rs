use std::fmt;

/// Describes the reason an entry was removed by the cache itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
  /// The entry was removed to bring the cache back under its entry or cost
  /// ceiling.
  Capacity,
  /// The entry's time-to-live elapsed. Covers lazy removal on access,
  /// `purge_expired`, and expired entries picked as eviction victims.
  Expired,
  /// The entry was removed by a tag invalidation.
  Invalidated,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::Capacity => write!(f, "evicted due to capacity"),
      EvictionReason::Expired => write!(f, "evicted due to expiration"),
      EvictionReason::Invalidated => write!(f, "invalidated by tag"),
    }
  }
}

/// A listener that can be registered with the cache to receive notifications
/// when entries are evicted.
///
/// The cache calls `on_evict` after it has released its internal lock, so a
/// listener may safely call back into the cache. Explicit `remove` and
/// `clear` calls are not reported.
pub trait EvictionListener<K, V>: Send + Sync {
  fn on_evict(&self, key: K, value: V, reason: EvictionReason);
}

impl<K, V, F> EvictionListener<K, V> for F
where
  F: Fn(K, V, EvictionReason) + Send + Sync,
{
  fn on_evict(&self, key: K, value: V, reason: EvictionReason) {
    self(key, value, reason)
  }
}
