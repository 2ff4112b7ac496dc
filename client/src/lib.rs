//! The data layer of the Torwell client.
//!
//! [`TorApi`] fronts the native backend: reads go through three persisted
//! [`NamedCache`]s, privileged actions go through a serial
//! [`ConnectionQueue`](torwell_queue::ConnectionQueue), and raw backend
//! events are normalized by the [`events`] module.
//!
//! ```no_run
//! # async fn demo(backend: std::sync::Arc<dyn torwell_client::Backend>) -> torwell_client::Result<()> {
//! let config = torwell_client::config::load_config(&torwell_client::config::find_config_file(None)?)?;
//! torwell_client::logging::init(&config.logging)?;
//!
//! let context = torwell_client::AppContext::from_config(config)?;
//! context.warmup().await;
//!
//! let api = torwell_client::TorApi::new(context, backend);
//! api.connect().await?;
//! let summary = api.connection_health_summary().await?;
//! # let _ = summary;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod caches;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod storage;

pub use api::{Backend, BackendError, BackendFuture, TorApi};
pub use caches::{CacheSpec, ClientCaches, NamedCache, StoredEntry};
pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{Error, Result};
pub use events::{MetricSample, StatusUpdate, TorStatus};
pub use model::{ConnectionEvent, ConnectionHealthSummary};
pub use storage::{FileStore, MemoryStore, SnapshotStore};
