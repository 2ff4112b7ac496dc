use crate::caches::ClientCaches;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::storage::{self, SnapshotStore};

use std::sync::Arc;

use torwell_queue::{ConnectionQueue, TaskSpawner, TokioSpawner};

/// Everything the client shares across its views: configuration, the
/// snapshot store, the named caches and the connection queue.
#[derive(Debug)]
pub struct AppContext {
  config: ClientConfig,
  store: Arc<dyn SnapshotStore>,
  caches: ClientCaches,
  queue: ConnectionQueue,
}

impl AppContext {
  /// Builds the context around an already opened store. The caches plan
  /// their warm-up from the store but are not warmed yet.
  pub fn new(config: ClientConfig, store: Arc<dyn SnapshotStore>, spawner: Arc<dyn TaskSpawner>) -> Result<Arc<Self>> {
    let caches = ClientCaches::open(&config.caches, config.rehydrate_ttl, store.clone())?;
    let queue = ConnectionQueue::new(spawner);
    tracing::info!(storage = ?config.storage, "client context ready");
    Ok(Arc::new(Self {
      config,
      store,
      caches,
      queue,
    }))
  }

  /// Opens the configured store and runs queued actions on the current Tokio
  /// runtime.
  pub fn from_config(config: ClientConfig) -> Result<Arc<Self>> {
    let handle = tokio::runtime::Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
    let store = storage::open_store(&config.storage)?;
    Self::new(config, store, Arc::new(TokioSpawner::with_handle(handle)))
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  pub fn store(&self) -> &Arc<dyn SnapshotStore> {
    &self.store
  }

  pub fn caches(&self) -> &ClientCaches {
    &self.caches
  }

  pub fn queue(&self) -> &ConnectionQueue {
    &self.queue
  }

  /// Restores every cache from its stored snapshot.
  pub async fn warmup(&self) {
    self.caches.warmup().await;
  }
}
