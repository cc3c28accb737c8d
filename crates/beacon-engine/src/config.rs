//! Engine tunables.

use chrono::Duration;

/// Thresholds and sizing for [`crate::SessionEngine`].
///
/// The two timeouts classify sessions; they never bound the work itself —
/// every unit of work (signal merge, sweep pass) is short and bounded.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// A non-ended session is "active" iff its last heartbeat is younger
  /// than this.
  pub active_window: Duration,

  /// Sessions quiet for longer than this are force-ended by the sweep —
  /// the compensating mechanism for unload signals that never arrive.
  pub session_timeout: Duration,

  /// How long an ended session stays in memory so late signals are
  /// rejected as "ended" rather than "unknown".
  pub ended_retention: Duration,

  /// Cadence of the inactivity sweep task.
  pub sweep_interval: std::time::Duration,

  /// Upper clamp for any client-reported page duration, in seconds.
  /// Durations are clamped, never rejected, so clock skew cannot drop an
  /// otherwise-valid session.
  pub max_page_view_secs: u32,

  /// Shard count for the live-session table.
  pub shard_count: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      active_window:      Duration::seconds(75),
      session_timeout:    Duration::minutes(30),
      ended_retention:    Duration::minutes(5),
      sweep_interval:     std::time::Duration::from_secs(45),
      max_page_view_secs: 4 * 60 * 60,
      shard_count:        16,
    }
  }
}
