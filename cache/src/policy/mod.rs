pub mod fifo;
pub mod lfu;
pub mod lru;

use crate::store::EntryStore;

use generational_arena::Index;
use std::fmt;
use std::hash::Hash;

/// The rule used to pick a victim when the cache is over its entry or cost
/// ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EvictionPolicy {
  /// Evicts the least recently used entry. Reads move an entry to the
  /// most-recently-used position.
  #[default]
  Lru,
  /// Evicts the least frequently used entry, with recency as a tiebreaker.
  Lfu,
  /// Evicts the oldest inserted entry. Reads and overwrites do not reorder.
  Fifo,
}

impl EvictionPolicy {
  /// Picks the next entry to evict, or `None` if the store is empty.
  pub(crate) fn select_victim<K, V>(self, store: &EntryStore<K, V>, now: u64) -> Option<Index>
  where
    K: Eq + Hash + Clone,
  {
    match self {
      EvictionPolicy::Lru => lru::select_victim(store, now),
      EvictionPolicy::Lfu => lfu::select_victim(store, now),
      EvictionPolicy::Fifo => fifo::select_victim(store),
    }
  }

  /// Whether a successful read relinks the entry to the head of the store.
  #[inline]
  pub(crate) fn reorders_on_read(self) -> bool {
    matches!(self, EvictionPolicy::Lru)
  }

  /// Whether overwriting an existing key relinks it to the head of the store.
  #[inline]
  pub(crate) fn reorders_on_write(self) -> bool {
    matches!(self, EvictionPolicy::Lru)
  }
}

impl fmt::Display for EvictionPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionPolicy::Lru => write!(f, "lru"),
      EvictionPolicy::Lfu => write!(f, "lfu"),
      EvictionPolicy::Fifo => write!(f, "fifo"),
    }
  }
}
