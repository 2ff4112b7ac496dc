use crate::store::EntryStore;

use generational_arena::Index;
use std::hash::Hash;

/// Selects the least recently used entry.
///
/// The store keeps entries in recency order, so the tail is the candidate
/// unless the scan meets an already-expired entry first, which is evicted
/// instead.
pub(crate) fn select_victim<K, V>(store: &EntryStore<K, V>, now: u64) -> Option<Index>
where
  K: Eq + Hash + Clone,
{
  let mut victim: Option<(Index, u64)> = None;
  for (index, _, entry) in store.iter() {
    if entry.is_expired(now) {
      return Some(index);
    }
    match victim {
      Some((_, best)) if entry.last_accessed >= best => {}
      _ => victim = Some((index, entry.last_accessed)),
    }
  }
  victim.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entry::CacheEntry;
  use std::time::Duration;

  fn store_with(entries: &[(&'static str, u64, Option<u64>)]) -> EntryStore<&'static str, ()> {
    let mut store = EntryStore::new();
    for (key, accessed, ttl) in entries {
      store.push_front(
        *key,
        CacheEntry::new((), *accessed, ttl.map(Duration::from_millis), 1, None),
      );
    }
    store
  }

  fn victim_key(store: &EntryStore<&'static str, ()>, now: u64) -> Option<&'static str> {
    let index = select_victim(store, now)?;
    store
      .iter()
      .find(|(idx, _, _)| *idx == index)
      .map(|(_, key, _)| *key)
  }

  #[test]
  fn picks_smallest_last_accessed() {
    let store = store_with(&[("a", 30, None), ("b", 10, None), ("c", 20, None)]);
    assert_eq!(victim_key(&store, 40), Some("b"));
  }

  #[test]
  fn ties_go_to_the_oldest_position() {
    let store = store_with(&[("a", 10, None), ("b", 10, None)]);
    assert_eq!(victim_key(&store, 10), Some("a"));
  }

  #[test]
  fn expired_entries_are_preferred() {
    let store = store_with(&[("a", 1, None), ("b", 50, Some(10))]);
    assert_eq!(victim_key(&store, 100), Some("b"));
  }

  #[test]
  fn empty_store_has_no_victim() {
    let store = EntryStore::<&'static str, ()>::new();
    assert_eq!(select_victim(&store, 0), None);
  }
}
