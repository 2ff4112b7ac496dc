use crate::entry::CacheEntry;

use std::hash::Hash;

use ahash::HashMap;
use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K, V> {
  key: K,
  entry: CacheEntry<V>,
  next: Option<Index>,
  prev: Option<Index>,
}

/// An ordered entry store: a doubly-linked list living in an arena, plus a
/// key lookup map.
///
/// The head is the newest (or most recently used) entry and the tail is the
/// oldest. Relinking a node is O(1), which keeps LRU reordering on `get` cheap.
#[derive(Debug)]
pub(crate) struct EntryStore<K: Eq + Hash + Clone, V> {
  nodes: Arena<Node<K, V>>,
  lookup: HashMap<K, Index>,
  head: Option<Index>,
  tail: Option<Index>,
  total_cost: u64,
}

impl<K: Eq + Hash + Clone, V> EntryStore<K, V> {
  pub(crate) fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::default(),
      head: None,
      tail: None,
      total_cost: 0,
    }
  }

  // Detaches a node from its neighbours. Arena and map removal is left to
  // the caller.
  fn unlink(&mut self, index: Index) {
    let (prev, next) = {
      let node = &self.nodes[index];
      (node.prev, node.next)
    };

    match prev {
      Some(prev_idx) => self.nodes[prev_idx].next = next,
      None => self.head = next,
    }
    match next {
      Some(next_idx) => self.nodes[next_idx].prev = prev,
      None => self.tail = prev,
    }
  }

  fn link_front(&mut self, index: Index) {
    let old_head = self.head;
    self.nodes[index].next = old_head;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head {
      self.nodes[old_head].prev = Some(index);
    }
    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.lookup.len()
  }

  #[inline]
  pub(crate) fn total_cost(&self) -> u64 {
    self.total_cost
  }

  #[inline]
  pub(crate) fn index_of(&self, key: &K) -> Option<Index> {
    self.lookup.get(key).copied()
  }

  #[inline]
  pub(crate) fn entry(&self, index: Index) -> &CacheEntry<V> {
    &self.nodes[index].entry
  }

  #[inline]
  pub(crate) fn entry_mut(&mut self, index: Index) -> &mut CacheEntry<V> {
    &mut self.nodes[index].entry
  }

  /// Stores a key that is not yet present at the head of the list.
  pub(crate) fn push_front(&mut self, key: K, entry: CacheEntry<V>) -> Index {
    self.total_cost = self.total_cost.saturating_add(entry.cost);
    let index = self.nodes.insert(Node {
      key: key.clone(),
      entry,
      next: None,
      prev: None,
    });
    self.lookup.insert(key, index);
    self.link_front(index);
    index
  }

  /// Swaps the entry stored at `index`, keeping its position, and returns the
  /// previous entry. The running cost drops the old cost before adding the new.
  pub(crate) fn replace(&mut self, index: Index, entry: CacheEntry<V>) -> CacheEntry<V> {
    let old = std::mem::replace(&mut self.nodes[index].entry, entry);
    self.total_cost = self
      .total_cost
      .saturating_sub(old.cost)
      .saturating_add(self.nodes[index].entry.cost);
    old
  }

  pub(crate) fn move_to_front(&mut self, index: Index) {
    if self.head != Some(index) {
      self.unlink(index);
      self.link_front(index);
    }
  }

  pub(crate) fn remove(&mut self, index: Index) -> Option<(K, CacheEntry<V>)> {
    if !self.nodes.contains(index) {
      return None;
    }
    self.unlink(index);
    let node = self.nodes.remove(index)?;
    self.lookup.remove(&node.key);
    self.total_cost = self.total_cost.saturating_sub(node.entry.cost);
    Some((node.key, node.entry))
  }

  pub(crate) fn clear(&mut self) {
    self.nodes.clear();
    self.lookup.clear();
    self.head = None;
    self.tail = None;
    self.total_cost = 0;
  }

  #[inline]
  pub(crate) fn oldest(&self) -> Option<Index> {
    self.tail
  }

  /// Walks the entries from the oldest (tail) to the newest (head).
  pub(crate) fn iter(&self) -> Iter<'_, K, V> {
    Iter {
      store: self,
      cursor: self.tail,
    }
  }

  /// Indices of every entry matching `predicate`, oldest first.
  pub(crate) fn indices_where(&self, mut predicate: impl FnMut(&CacheEntry<V>) -> bool) -> Vec<Index> {
    self
      .iter()
      .filter(|(_, _, entry)| predicate(entry))
      .map(|(index, _, _)| index)
      .collect()
  }

  // A helper for tests, to get the order of keys from oldest to newest.
  #[cfg(test)]
  pub(crate) fn keys_oldest_first(&self) -> Vec<K> {
    self.iter().map(|(_, key, _)| key.clone()).collect()
  }
}

pub(crate) struct Iter<'a, K: Eq + Hash + Clone, V> {
  store: &'a EntryStore<K, V>,
  cursor: Option<Index>,
}

impl<'a, K: Eq + Hash + Clone, V> Iterator for Iter<'a, K, V> {
  type Item = (Index, &'a K, &'a CacheEntry<V>);

  fn next(&mut self) -> Option<Self::Item> {
    let index = self.cursor?;
    let store = self.store;
    let node = &store.nodes[index];
    self.cursor = node.prev;
    Some((index, &node.key, &node.entry))
  }
}
