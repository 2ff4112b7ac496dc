use crate::action::ActionKey;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFailure {
  pub key: ActionKey,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSuccess {
  pub key: ActionKey,
  pub at: DateTime<Utc>,
}

/// What the UI sees of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
  /// The key currently running.
  pub pending: Option<ActionKey>,
  pub queue_depth: usize,
  /// Waiting keys in run order, excluding `pending`.
  pub queued_keys: Vec<ActionKey>,
  pub last_error: Option<QueueFailure>,
  pub last_success: Option<QueueSuccess>,
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscriber<T> {
  id: u64,
  /// Sequence number of the value the subscriber was first called with.
  joined: u64,
  callback: Callback<T>,
}

struct Delivery<T> {
  seq: u64,
  value: T,
  /// Set for the first call of a new subscriber.
  only: Option<u64>,
}

struct Slot<T> {
  value: T,
  seq: u64,
  /// Staged values not yet delivered, oldest first.
  outbox: VecDeque<Delivery<T>>,
  draining: bool,
}

struct Shared<T> {
  slot: Mutex<Slot<T>>,
  subscribers: Mutex<Vec<Subscriber<T>>>,
  next_id: AtomicU64,
}

/// A value that pushes every change to its subscribers.
///
/// Changes are delivered in the order they were made. Only one thread
/// delivers at a time; a change made while another thread is delivering is
/// handed to that thread, so callbacks never observe an older value after a
/// newer one. Callbacks run without any internal lock held and may read or
/// change the value again.
pub struct Observable<T> {
  shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Observable")
      .field("value", &self.shared.slot.lock().value)
      .field("subscribers", &self.shared.subscribers.lock().len())
      .finish()
  }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
  pub fn new(value: T) -> Self {
    Self {
      shared: Arc::new(Shared {
        slot: Mutex::new(Slot {
          value,
          seq: 0,
          outbox: VecDeque::new(),
          draining: false,
        }),
        subscribers: Mutex::new(Vec::new()),
        next_id: AtomicU64::new(0),
      }),
    }
  }

  /// A copy of the current value.
  pub fn get(&self) -> T {
    self.shared.slot.lock().value.clone()
  }

  /// Registers `callback`, calls it once with the current value, and keeps
  /// calling it on every later change until the returned [`Subscription`]
  /// drops. If another thread is delivering at the time, that thread makes
  /// the first call.
  pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
    let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
    let callback: Callback<T> = Arc::new(callback);
    {
      let mut slot = self.shared.slot.lock();
      self.shared.subscribers.lock().push(Subscriber {
        id,
        joined: slot.seq,
        callback,
      });
      let delivery = Delivery {
        seq: slot.seq,
        value: slot.value.clone(),
        only: Some(id),
      };
      slot.outbox.push_back(delivery);
    }
    self.broadcast().dispatch();

    let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
    Subscription {
      cancel: Some(Box::new(move || {
        if let Some(shared) = weak.upgrade() {
          shared.subscribers.lock().retain(|subscriber| subscriber.id != id);
        }
      })),
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self.shared.subscribers.lock().len()
  }

  /// Replaces the value and notifies subscribers.
  pub fn set(&self, value: T) {
    self.stage(value).dispatch();
  }

  /// Mutates the value in place and notifies subscribers.
  pub fn update(&self, f: impl FnOnce(&mut T)) {
    {
      let mut slot = self.shared.slot.lock();
      f(&mut slot.value);
      let value = slot.value.clone();
      slot.push(value);
    }
    self.broadcast().dispatch();
  }

  /// Stores `value` now and returns the notification to send once the
  /// caller has released its own locks. Staging order is delivery order.
  pub(crate) fn stage(&self, value: T) -> Broadcast<T> {
    self.shared.slot.lock().push(value);
    self.broadcast()
  }

  fn broadcast(&self) -> Broadcast<T> {
    Broadcast {
      shared: self.shared.clone(),
    }
  }
}

impl<T: Clone> Slot<T> {
  fn push(&mut self, value: T) {
    self.seq += 1;
    self.value = value.clone();
    self.outbox.push_back(Delivery {
      seq: self.seq,
      value,
      only: None,
    });
  }
}

/// A pending notification produced by [`Observable::stage`].
///
/// A staged value that is never dispatched still goes out with the next
/// dispatch.
#[must_use = "subscribers are only notified when the broadcast is dispatched"]
pub(crate) struct Broadcast<T> {
  shared: Arc<Shared<T>>,
}

impl<T> Broadcast<T> {
  /// Delivers every staged value in order, unless another thread is already
  /// delivering, in which case that thread picks them up.
  pub(crate) fn dispatch(self) {
    {
      let mut slot = self.shared.slot.lock();
      if slot.draining {
        return;
      }
      slot.draining = true;
    }
    let _drain = DrainGuard(&self.shared);

    loop {
      let delivery = {
        let mut slot = self.shared.slot.lock();
        match slot.outbox.pop_front() {
          Some(next) => next,
          None => {
            slot.draining = false;
            return;
          }
        }
      };

      let callbacks: Vec<Callback<T>> = self
        .shared
        .subscribers
        .lock()
        .iter()
        .filter(|subscriber| match delivery.only {
          Some(id) => subscriber.id == id,
          None => subscriber.joined < delivery.seq,
        })
        .map(|subscriber| subscriber.callback.clone())
        .collect();
      for callback in &callbacks {
        callback(&delivery.value);
      }
    }
  }
}

/// Releases the delivery role if a callback panics mid-drain.
struct DrainGuard<'a, T>(&'a Shared<T>);

impl<T> Drop for DrainGuard<'_, T> {
  fn drop(&mut self) {
    if std::thread::panicking() {
      self.0.slot.lock().draining = false;
    }
  }
}

/// Keeps an [`Observable`] callback registered. Dropping it unsubscribes.
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
  pub fn unsubscribe(mut self) {
    self.cancel_now();
  }

  fn cancel_now(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.cancel_now();
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.cancel.is_some())
      .finish()
  }
}
