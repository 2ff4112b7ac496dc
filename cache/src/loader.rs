use crate::error::BoxError;

use futures_util::future::BoxFuture;
use std::sync::Arc;

/// An enum that holds either a synchronous or an asynchronous loader function.
///
/// Loaders are `Fn` rather than `FnOnce` so a warm-up plan can be executed
/// more than once. Errors are boxed so plans can mix loaders with different
/// error types.
pub(crate) enum Loader<V> {
  Sync(Arc<dyn Fn() -> Result<V, BoxError> + Send + Sync>),
  Async(Arc<dyn Fn() -> BoxFuture<'static, Result<V, BoxError>> + Send + Sync>),
}

impl<V> Loader<V> {
  pub(crate) async fn load(&self) -> Result<V, BoxError> {
    match self {
      Loader::Sync(f) => f(),
      Loader::Async(f) => f().await,
    }
  }
}
