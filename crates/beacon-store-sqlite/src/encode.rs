//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `+00:00` offset) so lexicographic comparison in SQL matches
//! chronological order. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use beacon_core::session::{
  DeviceInfo, DeviceType, Fingerprint, PageViewRecord, SessionId, UtmTags,
  VisitorSession,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DeviceType ──────────────────────────────────────────────────────────────

pub fn encode_device_type(dt: DeviceType) -> String { dt.to_string() }

pub fn decode_device_type(s: &str) -> Result<DeviceType> {
  DeviceType::from_str(s).map_err(|_| Error::UnknownDeviceType(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw column values of a `sessions` row.
pub struct RawSession {
  pub session_id:  String,
  pub fingerprint: String,
  pub started_at:        String,
  pub last_heartbeat_at: String,
  pub ended_at:          Option<String>,
  pub current_page:       String,
  pub current_page_title: String,
  pub page_entered_at:    String,
  pub total_page_views:      i64,
  pub click_count:           i64,
  pub movement_count:        i64,
  pub max_scroll_percentage: i64,
  pub referrer:     Option<String>,
  pub utm_source:   Option<String>,
  pub utm_medium:   Option<String>,
  pub utm_campaign: Option<String>,
  pub device_type:      String,
  pub browser:          String,
  pub operating_system: String,
}

impl RawSession {
  pub fn from_session(s: &VisitorSession) -> Self {
    Self {
      session_id:  s.session_id.as_str().to_owned(),
      fingerprint: s.fingerprint.as_str().to_owned(),
      started_at:        encode_dt(s.started_at),
      last_heartbeat_at: encode_dt(s.last_heartbeat_at),
      ended_at:          s.ended_at.map(encode_dt),
      current_page:       s.current_page.clone(),
      current_page_title: s.current_page_title.clone(),
      page_entered_at:    encode_dt(s.page_entered_at),
      total_page_views:      i64::from(s.total_page_views),
      click_count:           i64::from(s.click_count),
      movement_count:        i64::from(s.movement_count),
      max_scroll_percentage: i64::from(s.max_scroll_percentage),
      referrer:     s.referrer.clone(),
      utm_source:   s.utm.source.clone(),
      utm_medium:   s.utm.medium.clone(),
      utm_campaign: s.utm.campaign.clone(),
      device_type:      encode_device_type(s.device.device_type),
      browser:          s.device.browser.clone(),
      operating_system: s.device.operating_system.clone(),
    }
  }

  pub fn into_session(self) -> Result<VisitorSession> {
    Ok(VisitorSession {
      session_id:  SessionId::new(self.session_id),
      fingerprint: Fingerprint::new(self.fingerprint),
      started_at:        decode_dt(&self.started_at)?,
      last_heartbeat_at: decode_dt(&self.last_heartbeat_at)?,
      ended_at:          self.ended_at.as_deref().map(decode_dt).transpose()?,
      current_page:       self.current_page,
      current_page_title: self.current_page_title,
      page_entered_at:    decode_dt(&self.page_entered_at)?,
      total_page_views:      self.total_page_views as u32,
      click_count:           self.click_count as u32,
      movement_count:        self.movement_count as u32,
      max_scroll_percentage: self.max_scroll_percentage as u8,
      referrer: self.referrer,
      utm: UtmTags {
        source:   self.utm_source,
        medium:   self.utm_medium,
        campaign: self.utm_campaign,
      },
      device: DeviceInfo {
        device_type:      decode_device_type(&self.device_type)?,
        browser:          self.browser,
        operating_system: self.operating_system,
      },
    })
  }
}

/// Raw column values of a `page_views` row.
pub struct RawPageView {
  pub page_view_id: String,
  pub session_id:   String,
  pub page_path:    String,
  pub page_title:   String,
  pub entered_at:   String,
  pub duration_seconds: Option<i64>,
}

impl RawPageView {
  pub fn into_page_view(self) -> Result<PageViewRecord> {
    Ok(PageViewRecord {
      page_view_id: decode_uuid(&self.page_view_id)?,
      session_id:   SessionId::new(self.session_id),
      page_path:    self.page_path,
      page_title:   self.page_title,
      entered_at:   decode_dt(&self.entered_at)?,
      duration_seconds: self.duration_seconds.map(|d| d as u32),
    })
  }
}
