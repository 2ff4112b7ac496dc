use crate::error::BuildError;
use crate::handles::AdaptiveCache;
use crate::metrics::Metrics;
use crate::policy::EvictionPolicy;
use crate::store::EntryStore;
use crate::time::{Clock, MonotonicClock};
use crate::warmup::WarmupPlan;
use crate::EvictionListener;

use core::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// A builder holding the static configuration of an [`AdaptiveCache`].
///
/// `max_entries` has no default: a builder that never sets it fails with
/// [`BuildError::ZeroCapacity`].
pub struct CacheBuilder<K, V> {
  pub(crate) name: String,
  pub(crate) max_entries: usize,
  pub(crate) max_cost: Option<u64>,
  pub(crate) default_ttl: Option<Duration>,
  pub(crate) eviction_policy: EvictionPolicy,
  warmup: Option<WarmupPlan<K, V>>,
  clock: Option<Arc<dyn Clock>>,
  listener: Option<Arc<dyn EvictionListener<K, V>>>,
}

// Manual Debug implementation for CacheBuilder.
impl<K, V> fmt::Debug for CacheBuilder<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("name", &self.name)
      .field("max_entries", &self.max_entries)
      .field("max_cost", &self.max_cost)
      .field("default_ttl", &self.default_ttl)
      .field("eviction_policy", &self.eviction_policy)
      .field("warmup_entries", &self.warmup.as_ref().map(WarmupPlan::len))
      .field("has_listener", &self.listener.is_some())
      .finish_non_exhaustive()
  }
}

impl<K, V> CacheBuilder<K, V> {
  /// Creates a builder for a cache labelled `name` in logs and errors.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      max_entries: 0,
      max_cost: None,
      default_ttl: None,
      eviction_policy: EvictionPolicy::default(),
      warmup: None,
      clock: None,
      listener: None,
    }
  }

  /// Sets the hard cap on the number of stored entries. Must be positive.
  pub fn max_entries(mut self, max_entries: usize) -> Self {
    self.max_entries = max_entries;
    self
  }

  /// Sets a secondary cap on the summed cost of all entries.
  pub fn max_cost(mut self, max_cost: u64) -> Self {
    self.max_cost = Some(max_cost);
    self
  }

  /// Sets the TTL applied to entries stored without an explicit one.
  pub fn default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = Some(ttl);
    self
  }

  /// Sets the eviction policy. Defaults to [`EvictionPolicy::Lru`].
  pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
    self.eviction_policy = policy;
    self
  }

  /// Sets the plan executed by [`AdaptiveCache::warmup`].
  pub fn warmup(mut self, plan: WarmupPlan<K, V>) -> Self {
    self.warmup = Some(plan);
    self
  }

  /// Replaces the monotonic clock, e.g. with a `ManualClock` in tests.
  pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = Some(clock);
    self
  }

  /// Sets the eviction listener for the cache.
  pub fn eviction_listener<Listener>(mut self, listener: Listener) -> Self
  where
    Listener: EvictionListener<K, V> + 'static,
  {
    self.listener = Some(Arc::new(listener));
    self
  }

  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.max_entries == 0 {
      return Err(BuildError::ZeroCapacity {
        name: self.name.clone(),
      });
    }
    if self.max_cost == Some(0) {
      return Err(BuildError::ZeroCost {
        name: self.name.clone(),
      });
    }
    Ok(())
  }
}

impl<K, V> CacheBuilder<K, V>
where
  K: Eq + Hash + Clone,
{
  /// Validates the configuration and builds the cache.
  pub fn build(self) -> Result<AdaptiveCache<K, V>, BuildError> {
    self.validate()?;

    tracing::debug!(
      cache = %self.name,
      max_entries = self.max_entries,
      max_cost = ?self.max_cost,
      default_ttl = ?self.default_ttl,
      policy = %self.eviction_policy,
      "building adaptive cache"
    );

    Ok(AdaptiveCache {
      name: self.name,
      max_entries: self.max_entries,
      max_cost: self.max_cost,
      default_ttl: self.default_ttl,
      policy: self.eviction_policy,
      store: Mutex::new(EntryStore::new()),
      metrics: Metrics::new(),
      clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock)),
      listener: self.listener,
      warmup: self.warmup,
    })
  }
}
