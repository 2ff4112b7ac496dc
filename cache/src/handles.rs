use crate::entry::{normalize_tags, CacheEntry};
use crate::listener::{EvictionListener, EvictionReason};
use crate::metrics::{bump, CacheStats, Metrics};
use crate::policy::EvictionPolicy;
use crate::snapshot::SnapshotEntry;
use crate::store::EntryStore;
use crate::time::Clock;
use crate::warmup::{WarmupEntry, WarmupPlan};

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use parking_lot::Mutex;

/// Per-call overrides for [`AdaptiveCache::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
  /// Overrides the cache's default TTL. A zero TTL never expires.
  pub ttl: Option<Duration>,
  /// Defaults to one; zero is raised to one.
  pub cost: Option<u64>,
  /// Labels used by [`AdaptiveCache::invalidate_by_tag`].
  pub tags: Option<Vec<String>>,
}

impl SetOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  pub fn cost(mut self, cost: u64) -> Self {
    self.cost = Some(cost);
    self
  }

  pub fn tags<I, S>(mut self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tags = Some(tags.into_iter().map(Into::into).collect());
    self
  }
}

type Evicted<K, V> = Vec<(K, V, EvictionReason)>;

/// A bounded key-value cache with TTL expiry, cost accounting, pluggable
/// eviction and tag invalidation.
///
/// All entry state lives behind one mutex that is never held across an
/// `.await`, so the cache can be shared between tasks behind an `Arc`.
/// Statistics are lock-free counters.
///
/// `get_or_load` does not coalesce concurrent loads: two callers missing on
/// the same key will both run their loader, and the later write wins.
pub struct AdaptiveCache<K: Eq + Hash + Clone, V> {
  pub(crate) name: String,
  pub(crate) max_entries: usize,
  pub(crate) max_cost: Option<u64>,
  pub(crate) default_ttl: Option<Duration>,
  pub(crate) policy: EvictionPolicy,
  pub(crate) store: Mutex<EntryStore<K, V>>,
  pub(crate) metrics: Metrics,
  pub(crate) clock: Arc<dyn Clock>,
  pub(crate) listener: Option<Arc<dyn EvictionListener<K, V>>>,
  pub(crate) warmup: Option<WarmupPlan<K, V>>,
}

impl<K: Eq + Hash + Clone, V> fmt::Debug for AdaptiveCache<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AdaptiveCache")
      .field("name", &self.name)
      .field("max_entries", &self.max_entries)
      .field("max_cost", &self.max_cost)
      .field("default_ttl", &self.default_ttl)
      .field("policy", &self.policy)
      .field("stats", &self.stats())
      .finish_non_exhaustive()
  }
}

impl<K: Eq + Hash + Clone, V> AdaptiveCache<K, V> {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn eviction_policy(&self) -> EvictionPolicy {
    self.policy
  }

  /// Number of stored entries. Expired entries count until they are touched
  /// or purged.
  pub fn len(&self) -> usize {
    self.store.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Summed cost of all stored entries.
  pub fn total_cost(&self) -> u64 {
    self.store.lock().total_cost()
  }

  pub fn stats(&self) -> CacheStats {
    let (len, cost) = {
      let store = self.store.lock();
      (store.len(), store.total_cost())
    };
    self.metrics.snapshot(len, cost)
  }

  pub fn reset_stats(&self) {
    self.metrics.reset();
  }

  /// Current reading of the cache's clock, in milliseconds.
  pub fn now_millis(&self) -> u64 {
    self.clock.now_millis()
  }

  /// Returns `true` if a live entry exists. An expired entry is removed, but
  /// no statistics are recorded.
  pub fn has(&self, key: &K) -> bool {
    let now = self.clock.now_millis();
    let mut evicted = Vec::new();
    let live = {
      let mut store = self.store.lock();
      match store.index_of(key) {
        None => false,
        Some(index) if store.entry(index).is_expired(now) => {
          if let Some((key, entry)) = store.remove(index) {
            evicted.push((key, entry.value, EvictionReason::Expired));
          }
          false
        }
        Some(_) => true,
      }
    };
    self.notify(evicted);
    live
  }

  /// Removes an entry regardless of its expiry. Returns `true` if one existed.
  pub fn remove(&self, key: &K) -> bool {
    let mut store = self.store.lock();
    match store.index_of(key) {
      Some(index) => store.remove(index).is_some(),
      None => false,
    }
  }

  /// Drops every entry. Statistics are kept.
  pub fn clear(&self) {
    self.store.lock().clear();
    tracing::debug!(cache = %self.name, "cleared cache");
  }

  /// Removes every entry carrying `tag` (after trimming) and returns how many
  /// were removed. A blank tag is a no-op.
  pub fn invalidate_by_tag(&self, tag: &str) -> usize {
    let tag = tag.trim();
    if tag.is_empty() {
      return 0;
    }

    let mut evicted = Vec::new();
    {
      let mut store = self.store.lock();
      for index in store.indices_where(|entry| entry.has_tag(tag)) {
        if let Some((key, entry)) = store.remove(index) {
          evicted.push((key, entry.value, EvictionReason::Invalidated));
        }
      }
    }

    let removed = evicted.len();
    tracing::debug!(cache = %self.name, tag, removed, "invalidated entries by tag");
    self.notify(evicted);
    removed
  }

  /// Sweeps out every expired entry and returns how many were removed.
  /// Statistics are not affected.
  pub fn purge_expired(&self) -> usize {
    let now = self.clock.now_millis();
    let mut evicted = Vec::new();
    {
      let mut store = self.store.lock();
      for index in store.indices_where(|entry| entry.is_expired(now)) {
        if let Some((key, entry)) = store.remove(index) {
          evicted.push((key, entry.value, EvictionReason::Expired));
        }
      }
    }

    let removed = evicted.len();
    if removed > 0 {
      tracing::debug!(cache = %self.name, removed, "purged expired entries");
    }
    self.notify(evicted);
    removed
  }

  /// Evicts victims until both the entry and the cost ceiling hold, or the
  /// store is empty.
  fn evict_if_needed(&self, store: &mut EntryStore<K, V>, now: u64, evicted: &mut Evicted<K, V>) {
    while store.len() > self.max_entries
      || self.max_cost.is_some_and(|max_cost| store.total_cost() > max_cost)
    {
      let Some(index) = self.policy.select_victim(store, now) else {
        break;
      };
      let Some((key, entry)) = store.remove(index) else {
        break;
      };

      let reason = if entry.is_expired(now) {
        EvictionReason::Expired
      } else {
        EvictionReason::Capacity
      };
      bump(&self.metrics.evictions);
      tracing::debug!(
        cache = %self.name,
        policy = %self.policy,
        %reason,
        cost = entry.cost,
        "evicted cache entry"
      );
      evicted.push((key, entry.value, reason));
    }
  }

  /// Hands removed entries to the listener. Must be called without the
  /// store lock held.
  fn notify(&self, evicted: Evicted<K, V>) {
    if let Some(listener) = &self.listener {
      for (key, value, reason) in evicted {
        listener.on_evict(key, value, reason);
      }
    }
  }
}

impl<K: Eq + Hash + Clone, V: Clone> AdaptiveCache<K, V> {
  /// Returns the live value for `key`.
  ///
  /// A hit bumps the entry's frequency and recency (and under LRU relinks it
  /// as most recently used). An absent or expired key counts as a miss; an
  /// expired entry is removed on the spot.
  pub fn get(&self, key: &K) -> Option<V> {
    let now = self.clock.now_millis();
    let mut evicted = Vec::new();
    let found = {
      let mut store = self.store.lock();
      match store.index_of(key) {
        None => None,
        Some(index) if store.entry(index).is_expired(now) => {
          if let Some((key, entry)) = store.remove(index) {
            evicted.push((key, entry.value, EvictionReason::Expired));
          }
          None
        }
        Some(index) => {
          let entry = store.entry_mut(index);
          entry.touch(now);
          let value = entry.value.clone();
          if self.policy.reorders_on_read() {
            store.move_to_front(index);
          }
          Some(value)
        }
      }
    };

    if found.is_some() {
      bump(&self.metrics.hits);
    } else {
      bump(&self.metrics.misses);
    }
    self.notify(evicted);
    found
  }

  /// Stores `value` under `key`, replacing any previous entry, then evicts
  /// until the cache is back within its ceilings. Returns the stored value.
  pub fn set(&self, key: K, value: V, options: SetOptions) -> V {
    let now = self.clock.now_millis();
    let ttl = options.ttl.or(self.default_ttl);
    let tags = options.tags.and_then(normalize_tags);
    let entry = CacheEntry::new(value.clone(), now, ttl, options.cost.unwrap_or(1), tags);

    let mut evicted = Vec::new();
    {
      let mut store = self.store.lock();
      match store.index_of(&key) {
        Some(index) => {
          store.replace(index, entry);
          if self.policy.reorders_on_write() {
            store.move_to_front(index);
          }
        }
        None => {
          store.push_front(key, entry);
        }
      }
      self.evict_if_needed(&mut store, now, &mut evicted);
    }
    self.notify(evicted);
    value
  }

  /// Cache-aside lookup: returns the cached value, or awaits `loader`, stores
  /// its result and returns it.
  ///
  /// Loader errors are returned unchanged and nothing is stored. Concurrent
  /// calls for the same missing key each run their own loader.
  pub async fn get_or_load<F, Fut, E>(&self, key: K, loader: F, options: SetOptions) -> Result<V, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
  {
    if let Some(value) = self.get(&key) {
      return Ok(value);
    }
    bump(&self.metrics.loads);
    let value = loader().await?;
    Ok(self.set(key, value, options))
  }

  /// Synchronous variant of [`get_or_load`](Self::get_or_load).
  pub fn get_or_load_with<F, E>(&self, key: K, loader: F, options: SetOptions) -> Result<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    if let Some(value) = self.get(&key) {
      return Ok(value);
    }
    bump(&self.metrics.loads);
    let value = loader()?;
    Ok(self.set(key, value, options))
  }

  /// Copies every live entry, oldest first, without touching state or stats.
  pub fn snapshot(&self) -> Vec<SnapshotEntry<K, V>> {
    let now = self.clock.now_millis();
    let store = self.store.lock();
    store
      .iter()
      .filter(|(_, _, entry)| !entry.is_expired(now))
      .map(|(_, key, entry)| SnapshotEntry {
        key: key.clone(),
        value: entry.value.clone(),
        expires_at: entry.expires_at,
        frequency: entry.frequency,
        last_accessed: entry.last_accessed,
        cost: entry.cost,
        tags: entry.tags.clone(),
      })
      .collect()
  }

  /// Re-inserts snapshot entries through `set`, keeping their remaining TTL,
  /// cost and tags. Entries that never expired stay that way rather than
  /// picking up this cache's default TTL. Entries already expired on this
  /// cache's clock are skipped. Returns the number restored.
  pub fn restore<I>(&self, entries: I) -> usize
  where
    I: IntoIterator<Item = SnapshotEntry<K, V>>,
  {
    let now = self.clock.now_millis();
    let mut restored = 0;
    for entry in entries {
      if entry.is_expired(now) {
        continue;
      }
      let options = SetOptions {
        // A zero TTL is stored as "never expires".
        ttl: Some(entry.ttl_remaining(now).unwrap_or(Duration::ZERO)),
        cost: Some(entry.cost),
        tags: entry.tags,
      };
      self.set(entry.key, entry.value, options);
      restored += 1;
    }
    restored
  }

  /// Executes the configured warm-up plan.
  ///
  /// Up to `parallelism` loaders are awaited at once, all on the calling
  /// task. Each success is stored with the entry's TTL and tags; each failure
  /// is passed to the plan's error handler and does not stop the others.
  /// Without a plan, or with an empty one, this returns immediately.
  pub async fn warmup(&self) {
    let Some(plan) = &self.warmup else {
      return;
    };
    if plan.is_empty() {
      return;
    }

    let workers = plan.worker_count();
    tracing::debug!(cache = %self.name, entries = plan.len(), workers, "starting cache warmup");

    let queue = Mutex::new(plan.entries.iter().collect::<VecDeque<_>>());
    future::join_all((0..workers).map(|_| self.warmup_worker(plan, &queue))).await;
  }

  async fn warmup_worker(&self, plan: &WarmupPlan<K, V>, queue: &Mutex<VecDeque<&WarmupEntry<K, V>>>) {
    loop {
      let next = queue.lock().pop_front();
      let Some(entry) = next else {
        break;
      };

      match entry.loader.load().await {
        Ok(value) => {
          let options = SetOptions {
            ttl: entry.ttl,
            cost: None,
            tags: entry.tags.clone(),
          };
          self.set(entry.key.clone(), value, options);
          bump(&self.metrics.warmups);
        }
        Err(error) => {
          tracing::debug!(cache = %self.name, %error, "warmup loader failed");
          if let Some(on_error) = &plan.on_error {
            on_error(&error, entry);
          }
        }
      }
    }
  }
}
