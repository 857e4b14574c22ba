//! Time sources.
//!
//! Registry logic never reads the wall clock directly; it is handed a
//! [`Clock`] at construction. [`SystemClock`] is the production source,
//! [`ManualClock`] the deterministic one used by tests and the sandbox.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::Timestamp;

/// A source of "now", in unix seconds.
pub trait Clock: Send + Sync {
  fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Timestamp { Utc::now().timestamp().max(0) as Timestamp }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
  now: AtomicU64,
}

impl ManualClock {
  pub fn new(start: Timestamp) -> Self {
    Self { now: AtomicU64::new(start) }
  }

  pub fn set(&self, now: Timestamp) { self.now.store(now, Ordering::SeqCst); }

  /// Move the clock forward and return the new time.
  pub fn advance(&self, seconds: u64) -> Timestamp {
    self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Timestamp { self.now.load(Ordering::SeqCst) }
}
