use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// A thread-safe, internal statistics collector for the cache.
/// All fields are atomic so reads never contend with the entry lock.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,
  pub(crate) warmups: CachePadded<AtomicU64>,
  pub(crate) evictions: CachePadded<AtomicU64>,
  pub(crate) loads: CachePadded<AtomicU64>,
}

#[inline]
pub(crate) fn bump(counter: &CachePadded<AtomicU64>) {
  counter.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Zeroes every counter.
  pub(crate) fn reset(&self) {
    for counter in [
      &self.hits,
      &self.misses,
      &self.warmups,
      &self.evictions,
      &self.loads,
    ] {
      counter.store(0, Ordering::Relaxed);
    }
  }

  /// Creates a point-in-time snapshot of the current counters.
  pub(crate) fn snapshot(&self, len: usize, current_cost: u64) -> CacheStats {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    CacheStats {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      warmups: self.warmups.load(Ordering::Relaxed),
      evictions: self.evictions.load(Ordering::Relaxed),
      loads: self.loads.load(Ordering::Relaxed),
      len,
      current_cost,
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's statistics.
///
/// The counters only grow until [`AdaptiveCache::reset_stats`] is called.
///
/// [`AdaptiveCache::reset_stats`]: crate::AdaptiveCache::reset_stats
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CacheStats {
  /// Lookups that returned a live value.
  pub hits: u64,
  /// Lookups that found nothing or an expired entry.
  pub misses: u64,
  /// hits / (hits + misses), or zero before the first lookup.
  pub hit_ratio: f64,
  /// Entries stored by a warm-up plan.
  pub warmups: u64,
  /// Entries removed to restore the entry or cost ceiling.
  pub evictions: u64,
  /// Loader invocations made by `get_or_load`.
  pub loads: u64,
  /// Entries currently stored, expired ones included until they are purged.
  pub len: usize,
  /// Summed cost of the stored entries.
  pub current_cost: u64,
}

impl fmt::Debug for CacheStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheStats")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("warmups", &self.warmups)
      .field("evictions", &self.evictions)
      .field("loads", &self.loads)
      .field("len", &self.len)
      .field("current_cost", &self.current_cost)
      .finish()
  }
}
