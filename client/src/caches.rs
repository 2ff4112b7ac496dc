//! The client's named caches and their snapshot persistence.
//!
//! Each cache mirrors its live entries into a [`SnapshotStore`] after every
//! write. At startup the stored snapshot becomes the cache's warm-up plan, so
//! a restarted client serves the last known values for a few seconds while
//! fresh data is fetched.

use crate::config::{CacheLimits, CachesConfig};
use crate::error::Result;
use crate::model::{ConnectionEvent, ConnectionHealthSummary};
use crate::storage::SnapshotStore;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use torwell_cache::{
  AdaptiveCache, CacheBuilder, CacheStats, EvictionPolicy, SetOptions, WarmupEntry, WarmupPlan,
};

pub const TIMELINE_STORAGE_KEY: &str = "torwell.cache.connection.timeline";
pub const SUMMARY_STORAGE_KEY: &str = "torwell.cache.connection.summary";
pub const COUNTRY_STORAGE_KEY: &str = "torwell.cache.geo.country";

pub const CONNECTION_TAG: &str = "connection";
pub const GEOIP_TAG: &str = "geoip";
/// Tag carried by entries restored from a snapshot.
pub const HYDRATED_TAG: &str = "hydrated";

/// Fixed identity of a named cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSpec {
  pub name: &'static str,
  pub storage_key: &'static str,
  pub policy: EvictionPolicy,
  pub tag: &'static str,
}

impl CacheSpec {
  pub const TIMELINE: CacheSpec = CacheSpec {
    name: "connection-timeline",
    storage_key: TIMELINE_STORAGE_KEY,
    policy: EvictionPolicy::Lru,
    tag: CONNECTION_TAG,
  };

  pub const SUMMARY: CacheSpec = CacheSpec {
    name: "connection-summary",
    storage_key: SUMMARY_STORAGE_KEY,
    policy: EvictionPolicy::Lru,
    tag: CONNECTION_TAG,
  };

  pub const COUNTRY: CacheSpec = CacheSpec {
    name: "geo-country-lookup",
    storage_key: COUNTRY_STORAGE_KEY,
    policy: EvictionPolicy::Lfu,
    tag: GEOIP_TAG,
  };
}

/// The persisted form of one entry. Only key and value survive a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<V> {
  pub key: String,
  pub value: V,
}

/// An [`AdaptiveCache`] keyed by string and mirrored into a snapshot store.
pub struct NamedCache<V> {
  spec: CacheSpec,
  cache: AdaptiveCache<String, V>,
  store: Arc<dyn SnapshotStore>,
}

impl<V> fmt::Debug for NamedCache<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NamedCache")
      .field("spec", &self.spec)
      .field("cache", &self.cache)
      .finish()
  }
}

impl<V> NamedCache<V>
where
  V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
  /// Builds the cache and plans its warm-up from whatever `store` holds
  /// under the cache's storage key.
  pub fn open(
    spec: CacheSpec,
    limits: &CacheLimits,
    rehydrate_ttl: Duration,
    store: Arc<dyn SnapshotStore>,
  ) -> Result<Self> {
    let plan = hydration_plan::<V>(&spec, store.as_ref(), rehydrate_ttl).parallelism(limits.warmup_parallelism);

    let mut builder = CacheBuilder::new(spec.name)
      .max_entries(limits.max_entries)
      .default_ttl(limits.ttl)
      .eviction_policy(spec.policy)
      .warmup(plan);
    if let Some(max_cost) = limits.max_cost {
      builder = builder.max_cost(max_cost);
    }

    Ok(Self {
      spec,
      cache: builder.build()?,
      store,
    })
  }

  pub fn spec(&self) -> &CacheSpec {
    &self.spec
  }

  /// The underlying cache, for reads and statistics.
  pub fn cache(&self) -> &AdaptiveCache<String, V> {
    &self.cache
  }

  pub fn get(&self, key: &str) -> Option<V> {
    self.cache.get(&key.to_string())
  }

  pub fn stats(&self) -> CacheStats {
    self.cache.stats()
  }

  /// Stores `value` with this cache's tag, then persists the snapshot.
  pub fn store(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> V {
    let stored = self.cache.set(key.into(), value, self.options(ttl));
    self.persist();
    stored
  }

  /// Returns the cached value, or awaits `loader` and stores its result the
  /// way [`store`](Self::store) does. Loader errors are returned unchanged.
  pub async fn get_or_load<F, Fut, E>(&self, key: impl Into<String>, loader: F) -> Result<V, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
  {
    let mut loaded = false;
    let value = self
      .cache
      .get_or_load(
        key.into(),
        || {
          loaded = true;
          loader()
        },
        self.options(None),
      )
      .await?;
    if loaded {
      self.persist();
    }
    Ok(value)
  }

  /// Pre-populates the cache from the snapshot found at construction.
  pub async fn warmup(&self) {
    self.cache.warmup().await;
  }

  /// Drops every entry and erases the stored snapshot.
  pub fn erase(&self) {
    self.cache.clear();
    write_snapshot::<V>(self.spec.storage_key, self.store.as_ref(), &[]);
  }

  /// Writes the live entries to the store. Failures are logged, not raised.
  pub fn persist(&self) {
    let entries: Vec<StoredEntry<V>> = self
      .cache
      .snapshot()
      .into_iter()
      .map(|entry| StoredEntry {
        key: entry.key,
        value: entry.value,
      })
      .collect();
    write_snapshot(self.spec.storage_key, self.store.as_ref(), &entries);
  }

  fn options(&self, ttl: Option<Duration>) -> SetOptions {
    let options = SetOptions::new().tags([self.spec.tag]);
    match ttl {
      Some(ttl) => options.ttl(ttl),
      None => options,
    }
  }
}

/// Reads a stored snapshot. Missing, unreadable or malformed snapshots yield
/// no entries.
pub(crate) fn read_snapshot<V: DeserializeOwned>(storage_key: &str, store: &dyn SnapshotStore) -> Vec<StoredEntry<V>> {
  let raw = match store.get_item(storage_key) {
    Ok(Some(raw)) => raw,
    Ok(None) => return Vec::new(),
    Err(error) => {
      tracing::warn!(storage_key, %error, "failed to read cache snapshot");
      return Vec::new();
    }
  };

  match serde_json::from_str(&raw) {
    Ok(entries) => entries,
    Err(error) => {
      tracing::warn!(storage_key, %error, "failed to parse cache snapshot");
      Vec::new()
    }
  }
}

/// Writes a snapshot, removing the key instead when there is nothing to keep.
pub(crate) fn write_snapshot<V: Serialize>(storage_key: &str, store: &dyn SnapshotStore, entries: &[StoredEntry<V>]) {
  let result = if entries.is_empty() {
    store.remove_item(storage_key)
  } else {
    serde_json::to_string(entries)
      .map_err(Into::into)
      .and_then(|json| store.set_item(storage_key, &json))
  };

  if let Err(error) = result {
    tracing::warn!(storage_key, %error, "failed to persist cache snapshot");
  }
}

fn hydration_plan<V>(spec: &CacheSpec, store: &dyn SnapshotStore, ttl: Duration) -> WarmupPlan<String, V>
where
  V: Clone + DeserializeOwned + Send + Sync + 'static,
{
  let entries: Vec<WarmupEntry<String, V>> = read_snapshot::<V>(spec.storage_key, store)
    .into_iter()
    .map(|entry| WarmupEntry::ready(entry.key, entry.value).ttl(ttl).tags([HYDRATED_TAG]))
    .collect();

  if !entries.is_empty() {
    tracing::debug!(cache = spec.name, entries = entries.len(), "planned warm-up from snapshot");
  }

  let name = spec.name;
  WarmupPlan::new(entries).on_error(move |error, entry| {
    tracing::warn!(cache = name, key = %entry.key, %error, "failed to warm up cache entry");
  })
}

/// The three caches the client keeps.
#[derive(Debug)]
pub struct ClientCaches {
  pub timeline: NamedCache<Vec<ConnectionEvent>>,
  pub summary: NamedCache<ConnectionHealthSummary>,
  pub country: NamedCache<String>,
}

impl ClientCaches {
  pub fn open(config: &CachesConfig, rehydrate_ttl: Duration, store: Arc<dyn SnapshotStore>) -> Result<Self> {
    Ok(Self {
      timeline: NamedCache::open(CacheSpec::TIMELINE, &config.timeline, rehydrate_ttl, store.clone())?,
      summary: NamedCache::open(CacheSpec::SUMMARY, &config.summary, rehydrate_ttl, store.clone())?,
      country: NamedCache::open(CacheSpec::COUNTRY, &config.country, rehydrate_ttl, store)?,
    })
  }

  pub fn cache_connection_timeline(
    &self,
    key: impl Into<String>,
    value: Vec<ConnectionEvent>,
    ttl: Option<Duration>,
  ) -> Vec<ConnectionEvent> {
    self.timeline.store(key, value, ttl)
  }

  pub fn cache_connection_summary(
    &self,
    key: impl Into<String>,
    value: ConnectionHealthSummary,
    ttl: Option<Duration>,
  ) -> ConnectionHealthSummary {
    self.summary.store(key, value, ttl)
  }

  pub fn cache_country_lookup(&self, key: impl Into<String>, value: String, ttl: Option<Duration>) -> String {
    self.country.store(key, value, ttl)
  }

  /// Warms all three caches concurrently.
  pub async fn warmup(&self) {
    futures_util::future::join3(self.timeline.warmup(), self.summary.warmup(), self.country.warmup()).await;
  }

  /// Clears the timeline and summary caches and their snapshots. The country
  /// cache is unaffected.
  pub fn invalidate_connection_caches(&self) {
    self.timeline.erase();
    self.summary.erase();
    tracing::debug!("invalidated connection caches");
  }

  /// Clears the country cache and its snapshot.
  pub fn reset_geo_cache(&self) {
    self.country.erase();
  }
}
