//! Clock abstraction.
//!
//! The engine never calls `Utc::now()` directly. Time is injected so the
//! inactivity sweep and read-time classification can be driven precisely
//! from tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// A source of "now".
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to — useful for testing.
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Mutex::new(start) }
  }

  /// Move the clock forward by `delta`.
  pub fn advance(&self, delta: Duration) {
    let mut now = self.now.lock().expect("clock lock poisoned");
    *now += delta;
  }

  pub fn set(&self, to: DateTime<Utc>) {
    let mut now = self.now.lock().expect("clock lock poisoned");
    *now = to;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().expect("clock lock poisoned")
  }
}
