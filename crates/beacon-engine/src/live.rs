//! In-memory session state and the idempotent merge rules.
//!
//! Every incoming signal is treated as a partial, possibly-stale
//! observation: clock fields merge with `max`, counters merge with `max`,
//! durations clamp into a plausible range. There is no authoritative
//! client clock anywhere in these rules.
//!
//! Counter model: the client legitimately resets its per-page counters to
//! zero at every navigation, so the session totals cannot be max-merged
//! directly. Instead the current page's counters max-merge in place and
//! fold into a completed total when the page closes; the session-level
//! counts exposed to readers are `completed + current page`, which is
//! monotone under both rules.

use beacon_core::{
  session::{DeviceInfo, PageViewRecord, UtmTags, VisitorSession},
  signal::{EndSignal, HeartbeatSignal, PageChangeSignal, StartSignal},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ─── LiveSession ─────────────────────────────────────────────────────────────

/// One session's last known truth plus the merge bookkeeping that never
/// leaves the engine.
#[derive(Debug)]
pub(crate) struct LiveSession {
  pub session: VisitorSession,
  /// Id of the single open [`PageViewRecord`] for this session.
  pub open_view_id: Uuid,

  completed_clicks:    u32,
  completed_movements: u32,
  page_clicks:         u32,
  page_movements:      u32,
}

/// Result of closing one page view and opening the next.
pub(crate) struct PageTransition {
  pub closed_view_id:  Uuid,
  pub closed_duration: u32,
  pub opened:          PageViewRecord,
}

impl LiveSession {
  /// Build the initial state from a start signal; the initial page view
  /// counts as the first of the session.
  pub fn start(signal: &StartSignal, at: DateTime<Utc>) -> (Self, PageViewRecord) {
    let view = PageViewRecord::open(
      signal.session_id.clone(),
      &signal.page_path,
      &signal.page_title,
      at,
    );

    let session = VisitorSession {
      session_id:  signal.session_id.clone(),
      fingerprint: signal.fingerprint.clone(),
      started_at:        at,
      last_heartbeat_at: at,
      ended_at:          None,
      current_page:       signal.page_path.clone(),
      current_page_title: signal.page_title.clone(),
      page_entered_at:    at,
      total_page_views:      1,
      click_count:           0,
      movement_count:        0,
      max_scroll_percentage: 0,
      referrer: signal.referrer.clone(),
      utm: UtmTags {
        source:   signal.utm_source.clone(),
        medium:   signal.utm_medium.clone(),
        campaign: signal.utm_campaign.clone(),
      },
      device: DeviceInfo {
        device_type:      signal.device_type,
        browser:          signal.browser.clone(),
        operating_system: signal.os.clone(),
      },
    };

    let live = Self {
      session,
      open_view_id: view.page_view_id,
      completed_clicks:    0,
      completed_movements: 0,
      page_clicks:         0,
      page_movements:      0,
    };
    (live, view)
  }

  /// Move `last_heartbeat_at` forward; an older observation is ignored.
  pub fn touch(&mut self, at: DateTime<Utc>) {
    self.session.last_heartbeat_at = self.session.last_heartbeat_at.max(at);
  }

  /// Merge a heartbeat. Returns `true` when the heartbeat names a page
  /// other than the engine's current one (a lost page-change); the caller
  /// logs it, and page identity stays untouched — only page-change
  /// signals move pages.
  pub fn merge_heartbeat(&mut self, hb: &HeartbeatSignal, at: DateTime<Utc>) -> bool {
    self.touch(at);

    self.page_clicks = self.page_clicks.max(hb.click_count);
    self.page_movements = self.page_movements.max(hb.movement_count);
    self.session.max_scroll_percentage = self
      .session
      .max_scroll_percentage
      .max(hb.scroll_percentage.min(100));
    self.refresh_counters();

    let mismatch = hb.page_path != self.session.current_page;
    if !mismatch {
      self.session.current_page_title = hb.page_title.clone();
    }
    mismatch
  }

  /// Close the current page view and open one for the incoming page.
  pub fn change_page(
    &mut self,
    signal: &PageChangeSignal,
    at: DateTime<Utc>,
    max_page_secs: u32,
  ) -> PageTransition {
    let closed_view_id = self.open_view_id;
    let closed_duration =
      clamp_seconds(signal.time_on_previous_page_seconds, max_page_secs);

    self.fold_page_counters();
    self.touch(at);

    self.session.total_page_views += 1;
    self.session.current_page = signal.new_page.clone();
    self.session.current_page_title = signal.page_title.clone();
    self.session.page_entered_at = at;

    let opened = PageViewRecord::open(
      self.session.session_id.clone(),
      &signal.new_page,
      &signal.page_title,
      at,
    );
    self.open_view_id = opened.page_view_id;

    PageTransition { closed_view_id, closed_duration, opened }
  }

  /// Terminal transition from an explicit end signal.
  pub fn end(
    &mut self,
    signal: &EndSignal,
    at: DateTime<Utc>,
    max_page_secs: u32,
  ) -> (Uuid, u32) {
    let duration =
      clamp_seconds(signal.time_on_final_page_seconds, max_page_secs);
    self.fold_page_counters();
    self.touch(at);
    self.session.ended_at = Some(at);
    (self.open_view_id, duration)
  }

  /// Terminal transition from the inactivity sweep. The best-known end
  /// time is the last heartbeat, not "now" — the visitor was not here for
  /// the silent stretch in between.
  pub fn finalize_timeout(&mut self, max_page_secs: u32) -> (Uuid, u32) {
    let last = self.session.last_heartbeat_at;
    let duration = clamp_seconds(
      (last - self.session.page_entered_at).num_seconds(),
      max_page_secs,
    );
    self.fold_page_counters();
    self.session.ended_at = Some(last);
    (self.open_view_id, duration)
  }

  fn fold_page_counters(&mut self) {
    self.completed_clicks += self.page_clicks;
    self.completed_movements += self.page_movements;
    self.page_clicks = 0;
    self.page_movements = 0;
    self.refresh_counters();
  }

  fn refresh_counters(&mut self) {
    self.session.click_count = self.completed_clicks + self.page_clicks;
    self.session.movement_count =
      self.completed_movements + self.page_movements;
  }
}

/// Clamp a client-reported duration into `[0, max]` seconds.
pub(crate) fn clamp_seconds(seconds: i64, max: u32) -> u32 {
  seconds.clamp(0, i64::from(max)) as u32
}
