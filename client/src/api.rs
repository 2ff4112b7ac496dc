//! The cached, serialized facade over the native backend.

use crate::caches::ClientCaches;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::events::StatusUpdate;
use crate::model::{ConnectionEvent, ConnectionHealthSummary};

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::OnceCell;
use torwell_queue::{ActionKey, ConnectionQueue, QueueExecution};

/// An error reported by the backend, carried as its message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}

pub type BackendFuture<'a, T> = BoxFuture<'a, Result<T, BackendError>>;

/// The privileged commands of the native backend.
///
/// Every call except `request_token` must carry the session token.
pub trait Backend: Send + Sync + 'static {
  fn request_token(&self) -> BackendFuture<'_, String>;

  fn connection_timeline<'a>(&'a self, token: &'a str, limit: Option<usize>)
    -> BackendFuture<'a, Vec<ConnectionEvent>>;

  fn connection_health_summary<'a>(&'a self, token: &'a str) -> BackendFuture<'a, ConnectionHealthSummary>;

  fn lookup_country<'a>(&'a self, token: &'a str, ip: &'a str) -> BackendFuture<'a, String>;

  fn connect<'a>(&'a self, token: &'a str) -> BackendFuture<'a, ()>;

  fn disconnect<'a>(&'a self, token: &'a str) -> BackendFuture<'a, ()>;

  fn build_circuit<'a>(&'a self, token: &'a str) -> BackendFuture<'a, ()>;

  fn new_identity<'a>(&'a self, token: &'a str) -> BackendFuture<'a, ()>;
}

/// Routes reads through the named caches and privileged actions through the
/// connection queue.
pub struct TorApi {
  context: Arc<AppContext>,
  backend: Arc<dyn Backend>,
  token: OnceCell<String>,
}

impl fmt::Debug for TorApi {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TorApi")
      .field("context", &self.context)
      .field("has_token", &self.token.initialized())
      .finish_non_exhaustive()
  }
}

impl TorApi {
  pub fn new(context: Arc<AppContext>, backend: Arc<dyn Backend>) -> Self {
    Self {
      context,
      backend,
      token: OnceCell::new(),
    }
  }

  fn caches(&self) -> &ClientCaches {
    self.context.caches()
  }

  fn queue(&self) -> &ConnectionQueue {
    self.context.queue()
  }

  /// The session token. Requested once; a failed request is retried on the
  /// next call.
  pub async fn token(&self) -> Result<String> {
    let token = self
      .token
      .get_or_try_init(|| async {
        let token = self.backend.request_token().await?;
        tracing::debug!("obtained session token");
        Ok::<_, BackendError>(token)
      })
      .await?;
    Ok(token.clone())
  }

  /// Recent connection events, newest last. `limit` selects a separate cache
  /// entry per distinct value.
  pub async fn connection_timeline(&self, limit: Option<usize>) -> Result<Vec<ConnectionEvent>> {
    let key = match limit {
      Some(limit) => format!("timeline:{}", limit),
      None => "timeline:default".to_string(),
    };
    self
      .caches()
      .timeline
      .get_or_load(key, || async {
        let token = self.token().await?;
        Ok::<_, Error>(self.backend.connection_timeline(&token, limit).await?)
      })
      .await
  }

  pub async fn connection_health_summary(&self) -> Result<ConnectionHealthSummary> {
    self
      .caches()
      .summary
      .get_or_load("summary:default", || async {
        let token = self.token().await?;
        Ok::<_, Error>(self.backend.connection_health_summary(&token).await?)
      })
      .await
  }

  /// The country code for `ip`, keyed by the trimmed address.
  pub async fn lookup_country(&self, ip: &str) -> Result<String> {
    let ip = ip.trim();
    if ip.is_empty() {
      return Err(Error::InvalidInput("ip address is empty".to_string()));
    }
    self
      .caches()
      .country
      .get_or_load(ip, || async {
        let token = self.token().await?;
        Ok::<_, Error>(self.backend.lookup_country(&token, ip).await?)
      })
      .await
  }

  pub async fn connect(&self) -> Result<QueueExecution<()>> {
    self.run_action(ActionKey::Connect).await
  }

  pub async fn disconnect(&self) -> Result<QueueExecution<()>> {
    self.run_action(ActionKey::Disconnect).await
  }

  pub async fn build_circuit(&self) -> Result<QueueExecution<()>> {
    self.run_action(ActionKey::BuildCircuit).await
  }

  pub async fn new_identity(&self) -> Result<QueueExecution<()>> {
    self.run_action(ActionKey::NewIdentity).await
  }

  async fn run_action(&self, key: ActionKey) -> Result<QueueExecution<()>> {
    let token = self.token().await?;
    let backend = self.backend.clone();
    let execution = self
      .queue()
      .run(key, move || async move {
        match key {
          ActionKey::Connect => backend.connect(&token).await,
          ActionKey::Disconnect => backend.disconnect(&token).await,
          ActionKey::BuildCircuit => backend.build_circuit(&token).await,
          ActionKey::NewIdentity => backend.new_identity(&token).await,
        }
      })
      .await?;
    Ok(execution)
  }

  /// Applies a `tor-status-update` payload. A terminal status drops the
  /// cached connection data.
  pub fn handle_status_payload(&self, payload: &serde_json::Value) -> StatusUpdate {
    let update = StatusUpdate::from_payload(payload);
    tracing::debug!(status = ?update.status, transition = ?update.last_transition, "status update");
    if update.is_terminal() {
      self.caches().invalidate_connection_caches();
    }
    update
  }
}
