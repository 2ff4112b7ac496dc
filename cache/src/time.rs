use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// The single, static reference point for all monotonic time readings.
// It is initialized lazily on its first use.
static CACHE_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// A helper to get the current time as a `Duration` since the epoch.
#[inline]
pub(crate) fn now_duration() -> Duration {
  Instant::now().saturating_duration_since(*CACHE_EPOCH)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
#[inline]
pub(crate) fn millis(duration: Duration) -> u64 {
  u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A source of timestamps, in milliseconds, for expiry and recency tracking.
///
/// The cache never reads the system time directly so tests can substitute a
/// [`ManualClock`] and advance virtual time deterministically.
pub trait Clock: Send + Sync + fmt::Debug {
  /// Returns the current time in milliseconds on this clock's scale.
  fn now_millis(&self) -> u64;
}

/// The default clock: monotonic milliseconds since the process-wide epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
  #[inline]
  fn now_millis(&self) -> u64 {
    millis(now_duration())
  }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one clone to the
/// cache and keep another to drive it.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
  millis: Arc<AtomicU64>,
}

impl ManualClock {
  /// Creates a clock starting at `start_millis`.
  pub fn new(start_millis: u64) -> Self {
    Self {
      millis: Arc::new(AtomicU64::new(start_millis)),
    }
  }

  /// Moves the clock forward by `duration`.
  pub fn advance(&self, duration: Duration) {
    self
      .millis
      .fetch_add(millis(duration), Ordering::SeqCst);
  }

  /// Jumps the clock to an absolute reading.
  pub fn set(&self, millis: u64) {
    self.millis.store(millis, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  #[inline]
  fn now_millis(&self) -> u64 {
    self.millis.load(Ordering::SeqCst)
  }
}
