//! Warm-up plans: ordered lists of loaders executed with bounded parallelism
//! to pre-populate a cache, typically from a persisted snapshot at startup.

use crate::error::BoxError;
use crate::loader::Loader;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked when a warm-up loader fails. The other workers keep going.
pub type WarmupErrorHandler<K, V> = Arc<dyn Fn(&BoxError, &WarmupEntry<K, V>) + Send + Sync>;

/// A single key to pre-load.
pub struct WarmupEntry<K, V> {
  pub key: K,
  /// TTL for the loaded value. `None` falls back to the cache default.
  pub ttl: Option<Duration>,
  pub tags: Option<Vec<String>>,
  pub(crate) loader: Loader<V>,
}

impl<K, V> WarmupEntry<K, V> {
  /// Creates an entry backed by an asynchronous loader.
  pub fn new<F, Fut, E>(key: K, loader: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<BoxError>,
    V: 'static,
  {
    let loader = move || {
      let fut = loader();
      Box::pin(async move { fut.await.map_err(Into::into) })
        as futures_util::future::BoxFuture<'static, Result<V, BoxError>>
    };
    Self {
      key,
      ttl: None,
      tags: None,
      loader: Loader::Async(Arc::new(loader)),
    }
  }

  /// Creates an entry backed by a synchronous loader.
  pub fn from_fn<F, E>(key: K, loader: F) -> Self
  where
    F: Fn() -> Result<V, E> + Send + Sync + 'static,
    E: Into<BoxError>,
    V: 'static,
  {
    Self {
      key,
      ttl: None,
      tags: None,
      loader: Loader::Sync(Arc::new(move || loader().map_err(Into::into))),
    }
  }

  /// Creates an entry whose loader hands back a value that is already known,
  /// such as one read from a stored snapshot.
  pub fn ready(key: K, value: V) -> Self
  where
    V: Clone + Send + Sync + 'static,
  {
    Self {
      key,
      ttl: None,
      tags: None,
      loader: Loader::Sync(Arc::new(move || Ok(value.clone()))),
    }
  }

  pub fn ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
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

impl<K: fmt::Debug, V> fmt::Debug for WarmupEntry<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WarmupEntry")
      .field("key", &self.key)
      .field("ttl", &self.ttl)
      .field("tags", &self.tags)
      .finish_non_exhaustive()
  }
}

/// The ordered set of entries a cache loads when `warmup()` is called.
pub struct WarmupPlan<K, V> {
  pub(crate) entries: Vec<WarmupEntry<K, V>>,
  pub(crate) parallelism: Option<usize>,
  pub(crate) on_error: Option<WarmupErrorHandler<K, V>>,
}

impl<K, V> WarmupPlan<K, V> {
  pub fn new(entries: Vec<WarmupEntry<K, V>>) -> Self {
    Self {
      entries,
      parallelism: None,
      on_error: None,
    }
  }

  /// Caps the number of loaders awaited at once. Defaults to the number of
  /// entries; zero is treated as one.
  pub fn parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = Some(parallelism);
    self
  }

  pub fn on_error(mut self, handler: impl Fn(&BoxError, &WarmupEntry<K, V>) + Send + Sync + 'static) -> Self {
    self.on_error = Some(Arc::new(handler));
    self
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Number of cooperative workers a run of this plan uses.
  pub(crate) fn worker_count(&self) -> usize {
    let len = self.entries.len();
    self.parallelism.unwrap_or(len).min(len).max(1)
  }
}

impl<K, V> Default for WarmupPlan<K, V> {
  fn default() -> Self {
    Self::new(Vec::new())
  }
}

impl<K: fmt::Debug, V> fmt::Debug for WarmupPlan<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WarmupPlan")
      .field("entries", &self.entries)
      .field("parallelism", &self.parallelism)
      .field("has_error_handler", &self.on_error.is_some())
      .finish()
  }
}
