//! Signal payloads exchanged between the client driver and the engine.
//!
//! Transport-agnostic: the JSON form is tagged with a `type` field whose
//! value is the variant discriminant. Every signal is an at-most-once,
//! possibly-stale observation; the engine merges them idempotently and
//! never assumes ordering or delivery.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  session::{DeviceType, Fingerprint, SessionId},
};

/// Longest accepted page path/title; anything longer is malformed, not
/// clamped — real URLs never get close and a multi-megabyte "path" is
/// garbage, not clock skew.
const MAX_TEXT_LEN: usize = 2048;

// ─── Payloads ────────────────────────────────────────────────────────────────

/// First signal of a session's life. Immutable attributes (referrer, UTM
/// tags, device) are captured here and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSignal {
  pub session_id:  SessionId,
  pub fingerprint: Fingerprint,
  pub page_path:   String,
  pub page_title:  String,
  pub referrer:     Option<String>,
  pub utm_source:   Option<String>,
  pub utm_medium:   Option<String>,
  pub utm_campaign: Option<String>,
  pub device_type: DeviceType,
  pub browser:     String,
  pub os:          String,
}

/// Periodic liveness + activity observation. Counters are cumulative for
/// the current page; `time_on_page_seconds` is advisory (locally derived
/// on the client) and only sanity-checked, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSignal {
  pub session_id: SessionId,
  pub page_path:  String,
  pub page_title: String,
  /// Signed so a skewed client clock clamps to zero instead of failing
  /// deserialization.
  pub time_on_page_seconds: i64,
  pub scroll_percentage:    u8,
  pub click_count:          u32,
  pub movement_count:       u32,
}

/// Navigation within the session: closes the outgoing page's view and
/// opens one for the incoming page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageChangeSignal {
  pub session_id:    SessionId,
  pub previous_page: String,
  pub new_page:      String,
  /// Title of the incoming page.
  pub page_title:    String,
  pub time_on_previous_page_seconds: i64,
}

/// Best-effort unload signal. Often never arrives — the inactivity sweep
/// is the compensating mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSignal {
  pub session_id: SessionId,
  pub final_page: String,
  pub time_on_final_page_seconds: i64,
}

// ─── Signal ──────────────────────────────────────────────────────────────────

/// A client observation. The variant name serves as the wire `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
  Start(StartSignal),
  Heartbeat(HeartbeatSignal),
  PageChange(PageChangeSignal),
  End(EndSignal),
}

impl Signal {
  /// The wire discriminant; must match the `rename_all = "snake_case"`
  /// serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Start(_) => "start",
      Self::Heartbeat(_) => "heartbeat",
      Self::PageChange(_) => "page_change",
      Self::End(_) => "end",
    }
  }

  pub fn session_id(&self) -> &SessionId {
    match self {
      Self::Start(s) => &s.session_id,
      Self::Heartbeat(s) => &s.session_id,
      Self::PageChange(s) => &s.session_id,
      Self::End(s) => &s.session_id,
    }
  }

  /// Structural validation. Everything beyond this (unknown session,
  /// ended session, excluded path) is the engine's call.
  pub fn validate(&self) -> Result<()> {
    self.session_id().validate()?;
    match self {
      Self::Start(s) => {
        check_path(&s.page_path)?;
        check_text(&s.page_title)?;
      }
      Self::Heartbeat(s) => {
        check_path(&s.page_path)?;
        check_text(&s.page_title)?;
      }
      Self::PageChange(s) => {
        check_path(&s.previous_page)?;
        check_path(&s.new_page)?;
        check_text(&s.page_title)?;
      }
      Self::End(s) => check_path(&s.final_page)?,
    }
    Ok(())
  }
}

fn check_path(path: &str) -> Result<()> {
  if path.is_empty() || path.len() > MAX_TEXT_LEN {
    return Err(Error::InvalidPagePath(truncate_for_display(path)));
  }
  Ok(())
}

fn check_text(text: &str) -> Result<()> {
  if text.len() > MAX_TEXT_LEN {
    return Err(Error::InvalidPagePath(truncate_for_display(text)));
  }
  Ok(())
}

fn truncate_for_display(s: &str) -> String {
  s.chars().take(64).collect()
}
