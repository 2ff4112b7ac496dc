use crate::action::{ActionKey, ActionStatus, QueueExecution, SkipReason};
use crate::error::QueueError;
use crate::runtime::TaskSpawner;
use crate::state::{Broadcast, Observable, QueueFailure, QueueState, QueueSuccess, Subscription};

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

type Outcome<T, E> = Result<QueueExecution<T>, QueueError<E>>;

/// What a finished job reports back to the runner. `deliver` hands the
/// result to the caller and is invoked only after the state is updated.
struct Settled {
  failure: Option<String>,
  deliver: Box<dyn FnOnce() + Send>,
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, Settled> + Send>;

struct QueueEntry {
  key: ActionKey,
  job: Job,
}

struct Core {
  backlog: VecDeque<QueueEntry>,
  active: Option<ActionKey>,
  /// Bumped by `reset()`; jobs from an older epoch no longer own the state.
  epoch: u64,
}

struct Inner {
  core: Mutex<Core>,
  state: Observable<QueueState>,
  spawner: Arc<dyn TaskSpawner>,
}

/// Runs connection actions one at a time, in submission order.
///
/// Submitting a key that is already running or waiting is a no-op that
/// resolves to [`QueueExecution::Skipped`]. Progress is published through an
/// [`Observable`] so a UI can render the pending action, the backlog and the
/// latest success or failure.
///
/// Clones share the same queue.
#[derive(Clone)]
pub struct ConnectionQueue {
  inner: Arc<Inner>,
}

impl fmt::Debug for ConnectionQueue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConnectionQueue")
      .field("state", &self.inner.state.get())
      .finish_non_exhaustive()
  }
}

impl ConnectionQueue {
  pub fn new(spawner: Arc<dyn TaskSpawner>) -> Self {
    Self {
      inner: Arc::new(Inner {
        core: Mutex::new(Core {
          backlog: VecDeque::new(),
          active: None,
          epoch: 0,
        }),
        state: Observable::new(QueueState::default()),
        spawner,
      }),
    }
  }

  /// Creates a queue that runs its actions on the current Tokio runtime.
  #[cfg(feature = "rt")]
  pub fn with_tokio() -> Self {
    Self::new(Arc::new(crate::runtime::TokioSpawner::new()))
  }

  /// Submits `task` under `key`.
  ///
  /// The duplicate check and the enqueue happen immediately, before the
  /// returned future is first polled, so submission order is call order.
  /// The future resolves once the task has run:
  /// - `Ok(Completed(value))` when it succeeded,
  /// - `Ok(Skipped { .. })` when `key` was already running or queued,
  /// - `Err(Task(error))` when it failed,
  /// - `Err(Cancelled)` when `reset()` dropped it before it started, or
  ///   when the task panicked.
  pub fn run<T, E, F, Fut>(
    &self,
    key: ActionKey,
    task: F,
  ) -> impl Future<Output = Outcome<T, E>> + Send + 'static
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
  {
    let receiver = self.enqueue(key, task);
    async move {
      match receiver {
        None => Ok(QueueExecution::Skipped {
          reason: SkipReason::Duplicate,
        }),
        Some(receiver) => receiver.await.unwrap_or(Err(QueueError::Cancelled)),
      }
    }
  }

  fn enqueue<T, E, F, Fut>(&self, key: ActionKey, task: F) -> Option<oneshot::Receiver<Outcome<T, E>>>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
  {
    let (broadcast, receiver) = {
      let mut core = self.inner.core.lock();
      if core.active == Some(key) || core.backlog.iter().any(|entry| entry.key == key) {
        tracing::debug!(action = %key, "skipping duplicate action");
        return None;
      }

      let (sender, receiver) = oneshot::channel();
      core.backlog.push_back(QueueEntry {
        key,
        job: into_job(task, sender),
      });
      tracing::debug!(action = %key, depth = core.backlog.len(), "queued action");
      (self.inner.stage_state(&core, |_| {}), receiver)
    };
    broadcast.dispatch();
    Inner::pump(&self.inner);
    Some(receiver)
  }

  /// The current state.
  pub fn state(&self) -> QueueState {
    self.inner.state.get()
  }

  /// Calls `callback` with the current state now and after every change
  /// until the returned subscription is dropped.
  pub fn subscribe(&self, callback: impl Fn(&QueueState) + Send + Sync + 'static) -> Subscription {
    self.inner.state.subscribe(callback)
  }

  pub fn status_for(&self, key: ActionKey) -> ActionStatus {
    let state = self.inner.state.get();
    if state.pending == Some(key) {
      ActionStatus::Active
    } else if state.queued_keys.contains(&key) {
      ActionStatus::Queued
    } else {
      ActionStatus::Idle
    }
  }

  /// Clears the recorded error, or only an error recorded for `key`.
  pub fn clear_error(&self, key: Option<ActionKey>) {
    let broadcast = {
      let core = self.inner.core.lock();
      let matches = self
        .inner
        .state
        .get()
        .last_error
        .is_some_and(|error| key.map_or(true, |key| error.key == key));
      if !matches {
        return;
      }
      self.inner.stage_state(&core, |state| state.last_error = None)
    };
    broadcast.dispatch();
  }

  /// Drops every waiting entry without running it and restores the initial
  /// state. Dropped callers resolve to [`QueueError::Cancelled`]. An action
  /// that is already running is not interrupted, but its outcome no longer
  /// touches the state.
  pub fn reset(&self) {
    let (dropped, broadcast) = {
      let mut core = self.inner.core.lock();
      let dropped: Vec<QueueEntry> = core.backlog.drain(..).collect();
      core.active = None;
      core.epoch = core.epoch.wrapping_add(1);
      (dropped, self.inner.state.stage(QueueState::default()))
    };
    broadcast.dispatch();

    if !dropped.is_empty() {
      tracing::debug!(dropped = dropped.len(), "reset connection queue");
    }
    drop(dropped);
  }
}

impl Inner {
  /// Stages a state derived from `core`, with `mutate` applied on top.
  fn stage_state(&self, core: &Core, mutate: impl FnOnce(&mut QueueState)) -> Broadcast<QueueState> {
    let mut next = self.state.get();
    next.pending = core.active;
    next.queue_depth = core.backlog.len();
    next.queued_keys = core.backlog.iter().map(|entry| entry.key).collect();
    mutate(&mut next);
    self.state.stage(next)
  }

  /// Starts the head of the backlog unless an action is already running.
  fn pump(this: &Arc<Self>) {
    let (entry, epoch, broadcast) = {
      let mut core = this.core.lock();
      if core.active.is_some() {
        return;
      }
      let Some(entry) = core.backlog.pop_front() else {
        return;
      };
      core.active = Some(entry.key);
      let broadcast = this.stage_state(&core, |_| {});
      (entry, core.epoch, broadcast)
    };
    broadcast.dispatch();

    let QueueEntry { key, job } = entry;
    tracing::debug!(action = %key, "running action");

    let runner = this.clone();
    this.spawner.spawn(Box::pin(async move {
      let settled = job().await;
      runner.finish(key, epoch, settled);
    }));
  }

  fn finish(self: Arc<Self>, key: ActionKey, epoch: u64, settled: Settled) {
    let Settled { failure, deliver } = settled;

    let broadcast = {
      let mut core = self.core.lock();
      if core.epoch != epoch {
        None
      } else {
        core.active = None;
        Some(self.stage_state(&core, |state| match &failure {
          None => {
            state.last_success = Some(QueueSuccess { key, at: Utc::now() });
            if state.last_error.as_ref().is_some_and(|error| error.key == key) {
              state.last_error = None;
            }
          }
          Some(message) => {
            state.last_error = Some(QueueFailure {
              key,
              message: message.clone(),
            });
          }
        }))
      }
    };

    match &failure {
      None => tracing::debug!(action = %key, "action completed"),
      Some(message) => tracing::debug!(action = %key, error = %message, "action failed"),
    }

    let current = broadcast.is_some();
    if let Some(broadcast) = broadcast {
      broadcast.dispatch();
    }
    deliver();

    // A reset started a new epoch, which pumps for itself.
    if current {
      Self::pump(&self);
    }
  }
}

fn into_job<T, E, F, Fut>(task: F, sender: oneshot::Sender<Outcome<T, E>>) -> Job
where
  F: FnOnce() -> Fut + Send + 'static,
  Fut: Future<Output = Result<T, E>> + Send + 'static,
  T: Send + 'static,
  E: fmt::Display + Send + 'static,
{
  Box::new(move || {
    Box::pin(async move {
      let outcome = AssertUnwindSafe(async move { task().await })
        .catch_unwind()
        .await;

      // A send only fails when the caller stopped waiting.
      match outcome {
        Ok(Ok(value)) => Settled {
          failure: None,
          deliver: Box::new(move || {
            let _ = sender.send(Ok(QueueExecution::Completed(value)));
          }),
        },
        Ok(Err(error)) => Settled {
          failure: Some(error.to_string()),
          deliver: Box::new(move || {
            let _ = sender.send(Err(QueueError::Task(error)));
          }),
        },
        Err(_) => Settled {
          failure: Some("action panicked".to_string()),
          deliver: Box::new(move || drop(sender)),
        },
      }
    })
  })
}
