//! Session and page-view types — the fundamental units of the store.
//!
//! A [`VisitorSession`] is the last known truth about one browsing
//! context. [`PageViewRecord`]s are append-only; a record's duration is
//! set exactly once when the view closes and never touched again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Opaque session token, generated client-side, unique per browsing
/// context per load. The server treats it as a blob; it never parses it.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
  pub fn new(raw: impl Into<String>) -> Self { Self(raw.into()) }

  /// Generate a fresh id — random and time-seeded (UUID v7), so the
  /// collision probability is negligible for this use.
  pub fn generate() -> Self { Self(Uuid::now_v7().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Structural validity only; an id can be valid and still unknown.
  pub fn validate(&self) -> Result<()> {
    if self.0.is_empty()
      || self.0.len() > 128
      || self.0.chars().any(|c| c.is_control())
    {
      return Err(Error::InvalidSessionId(self.0.clone()));
    }
    Ok(())
  }
}

impl std::fmt::Display for SessionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Device/browser-derived heuristic identifier. Many sessions may share
/// one fingerprint (same device, multiple tabs or repeat visits), and a
/// browser update can change it. Never an identity or security boundary.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
  pub fn new(raw: impl Into<String>) -> Self { Self(raw.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Device attributes ───────────────────────────────────────────────────────

/// Coarse device class derived from the user-agent string at start.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
  Desktop,
  Mobile,
  Tablet,
}

/// Immutable device attributes, derived once at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
  pub device_type:      DeviceType,
  pub browser:          String,
  pub operating_system: String,
}

/// Campaign attribution captured from the landing URL, set once at start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmTags {
  pub source:   Option<String>,
  pub medium:   Option<String>,
  pub campaign: Option<String>,
}

// ─── VisitorSession ──────────────────────────────────────────────────────────

/// Server-side record of one tracked browsing context.
///
/// `ended_at` is the only stored lifecycle field; the active/idle split is
/// computed at read time from `last_heartbeat_at`
/// (see [`crate::lifecycle::SessionState::classify`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorSession {
  pub session_id:  SessionId,
  pub fingerprint: Fingerprint,

  pub started_at:        DateTime<Utc>,
  /// Non-decreasing; merged with `max` against incoming observations.
  pub last_heartbeat_at: DateTime<Utc>,
  pub ended_at:          Option<DateTime<Utc>>,

  pub current_page:       String,
  pub current_page_title: String,
  pub page_entered_at:    DateTime<Utc>,

  // Monotonically non-decreasing within the session.
  pub total_page_views:      u32,
  pub click_count:           u32,
  pub movement_count:        u32,
  pub max_scroll_percentage: u8,

  // Immutable after start.
  pub referrer: Option<String>,
  pub utm:      UtmTags,
  pub device:   DeviceInfo,
}

impl VisitorSession {
  pub fn is_ended(&self) -> bool { self.ended_at.is_some() }
}

// ─── PageViewRecord ──────────────────────────────────────────────────────────

/// One page visited within a session. Append-only: `duration_seconds` is
/// `None` while the view is open and is written exactly once at close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageViewRecord {
  pub page_view_id: Uuid,
  pub session_id:   SessionId,
  pub page_path:    String,
  pub page_title:   String,
  pub entered_at:   DateTime<Utc>,
  pub duration_seconds: Option<u32>,
}

impl PageViewRecord {
  /// Open a new view for `session_id`; the id is server-assigned.
  pub fn open(
    session_id: SessionId,
    page_path: impl Into<String>,
    page_title: impl Into<String>,
    entered_at: DateTime<Utc>,
  ) -> Self {
    Self {
      page_view_id: Uuid::new_v4(),
      session_id,
      page_path: page_path.into(),
      page_title: page_title.into(),
      entered_at,
      duration_seconds: None,
    }
  }

  pub fn is_open(&self) -> bool { self.duration_seconds.is_none() }
}
