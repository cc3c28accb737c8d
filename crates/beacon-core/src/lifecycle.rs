//! Read-time session classification.
//!
//! `Active` and `Idle` are never stored. They are recomputed from
//! `last_heartbeat_at` whenever someone asks, which makes idle→active a
//! lossless consequence of a late heartbeat rather than a transition
//! anyone has to author — and removes the whole class of "forgot to flip
//! it back" bugs between the sweep and a live update.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle classification of a session at a given instant.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
  Active,
  Idle,
  Ended,
}

impl SessionState {
  /// Classify a session: ended sessions stay `Ended`; otherwise a session
  /// is `Active` iff `now − last_heartbeat_at < active_window`, else
  /// `Idle`. A single late or duplicate heartbeat cannot flap the
  /// classification — it can only move `last_heartbeat_at` forward.
  pub fn classify(
    now: DateTime<Utc>,
    last_heartbeat_at: DateTime<Utc>,
    ended: bool,
    active_window: Duration,
  ) -> Self {
    if ended {
      Self::Ended
    } else if now - last_heartbeat_at < active_window {
      Self::Active
    } else {
      Self::Idle
    }
  }

  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t0() -> DateTime<Utc> {
    "2026-08-06T12:00:00Z".parse().expect("valid timestamp")
  }

  #[test]
  fn within_window_is_active() {
    let window = Duration::seconds(75);
    let state =
      SessionState::classify(t0() + Duration::seconds(74), t0(), false, window);
    assert_eq!(state, SessionState::Active);
  }

  #[test]
  fn boundary_is_idle() {
    // The window is a strict bound: exactly `active_window` elapsed means
    // idle, so the classification flips exactly once per crossing.
    let window = Duration::seconds(75);
    let state =
      SessionState::classify(t0() + Duration::seconds(75), t0(), false, window);
    assert_eq!(state, SessionState::Idle);
  }

  #[test]
  fn ended_wins_over_recency() {
    let window = Duration::seconds(75);
    let state = SessionState::classify(t0(), t0(), true, window);
    assert_eq!(state, SessionState::Ended);
  }

  #[test]
  fn late_heartbeat_reclassifies_losslessly() {
    let window = Duration::seconds(75);
    let now = t0() + Duration::seconds(200);
    // Idle before the late heartbeat…
    assert_eq!(
      SessionState::classify(now, t0(), false, window),
      SessionState::Idle
    );
    // …active again once last_heartbeat_at catches up. No stored flag to
    // forget; just the formula.
    assert_eq!(
      SessionState::classify(now, now, false, window),
      SessionState::Active
    );
  }
}
