//! A serial queue for Tor connection commands.
//!
//! Connect, disconnect, circuit rebuilds and identity changes must never
//! overlap. [`ConnectionQueue`] runs them one at a time in submission order,
//! suppresses a key that is already running or waiting, and publishes its
//! progress as an observable [`QueueState`].

pub mod action;
pub mod error;
pub mod queue;
pub mod runtime;
pub mod state;

pub use action::{ActionKey, ActionStatus, QueueExecution, SkipReason};
pub use error::QueueError;
pub use queue::ConnectionQueue;
#[cfg(feature = "rt")]
pub use runtime::TokioSpawner;
pub use runtime::TaskSpawner;
pub use state::{Observable, QueueFailure, QueueState, QueueSuccess, Subscription};
