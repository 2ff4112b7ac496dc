use crate::store::EntryStore;

use generational_arena::Index;
use std::hash::Hash;

/// Selects the oldest inserted entry. Under FIFO neither reads nor
/// overwrites relink entries, so the tail of the store is the first one in.
pub(crate) fn select_victim<K, V>(store: &EntryStore<K, V>) -> Option<Index>
where
  K: Eq + Hash + Clone,
{
  store.oldest()
}
