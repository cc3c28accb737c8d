//! Aggregated read models — never stored, always derived.
//!
//! Dashboard consumers accept a staleness bound; a snapshot is rebuilt on
//! a fixed cadence and handed out wholesale, so a read is a clone of the
//! latest snapshot rather than a query against live state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{DeviceType, Fingerprint, SessionId, VisitorSession};

/// One currently-active session, as shown on the live dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveVisitor {
  pub session_id:  SessionId,
  pub fingerprint: Fingerprint,
  pub current_page:       String,
  pub current_page_title: String,
  pub device_type: DeviceType,
  pub browser:     String,
  pub referrer:    Option<String>,
  pub started_at:        DateTime<Utc>,
  pub last_heartbeat_at: DateTime<Utc>,
}

impl ActiveVisitor {
  pub fn from_session(s: &VisitorSession) -> Self {
    Self {
      session_id:  s.session_id.clone(),
      fingerprint: s.fingerprint.clone(),
      current_page:       s.current_page.clone(),
      current_page_title: s.current_page_title.clone(),
      device_type: s.device.device_type,
      browser:     s.device.browser.clone(),
      referrer:    s.referrer.clone(),
      started_at:        s.started_at,
      last_heartbeat_at: s.last_heartbeat_at,
    }
  }
}

/// Page-view tally within a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCount {
  pub page_path: String,
  pub views:     u64,
}

/// One row of a device/browser/traffic-source breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
  pub key:      String,
  pub sessions: u64,
}

/// Point-in-time view over the whole session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSnapshot {
  pub generated_at: DateTime<Utc>,

  pub active_count:    u64,
  pub active_visitors: Vec<ActiveVisitor>,

  pub popular_pages: Vec<PageCount>,
  pub devices:  Vec<BreakdownEntry>,
  pub browsers: Vec<BreakdownEntry>,
  pub sources:  Vec<BreakdownEntry>,

  /// Distinct fingerprints with any activity in the calendar day —
  /// deliberately a different denominator from active sessions, since one
  /// fingerprint may back several concurrent tabs.
  pub unique_visitors_today: u64,
}

impl AggregateSnapshot {
  /// The zero snapshot published before the first refresh completes.
  pub fn empty(generated_at: DateTime<Utc>) -> Self {
    Self {
      generated_at,
      active_count: 0,
      active_visitors: Vec::new(),
      popular_pages: Vec::new(),
      devices: Vec::new(),
      browsers: Vec::new(),
      sources: Vec::new(),
      unique_visitors_today: 0,
    }
  }
}
