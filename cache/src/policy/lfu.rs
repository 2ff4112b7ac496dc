use crate::entry::CacheEntry;
use crate::store::EntryStore;

use generational_arena::Index;
use std::hash::Hash;

/// Recency contributes at most a fraction of one access to the score for
/// entries touched within the same ~16 minute window.
const RECENCY_DIVISOR: f64 = 1_000_000.0;

#[inline]
fn score<V>(entry: &CacheEntry<V>) -> f64 {
  entry.frequency as f64 + entry.last_accessed as f64 / RECENCY_DIVISOR
}

/// Selects the entry with the lowest `frequency + last_accessed / 1e6` score.
/// Expired entries are evicted first; ties go to the earliest in iteration
/// order.
pub(crate) fn select_victim<K, V>(store: &EntryStore<K, V>, now: u64) -> Option<Index>
where
  K: Eq + Hash + Clone,
{
  let mut victim: Option<(Index, f64)> = None;
  for (index, _, entry) in store.iter() {
    if entry.is_expired(now) {
      return Some(index);
    }
    let candidate = score(entry);
    match victim {
      Some((_, best)) if candidate >= best => {}
      _ => victim = Some((index, candidate)),
    }
  }
  victim.map(|(index, _)| index)
}
