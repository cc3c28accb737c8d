//! The `SessionStore` trait.
//!
//! Implemented by storage backends (e.g. `beacon-store-sqlite`). The
//! engine and aggregator depend on this abstraction, not on any concrete
//! backend. Write operations are per-session: the engine serializes calls
//! for one `session_id`, so a backend only needs per-row atomicity, never
//! cross-session transactions.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  session::{PageViewRecord, SessionId, VisitorSession},
  snapshot::{BreakdownEntry, PageCount},
};

/// Abstraction over a Beacon session store backend.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Insert or replace the full session row. The engine write-through
  /// makes this the per-key atomic read-modify-write point.
  fn upsert_session<'a>(
    &'a self,
    session: &'a VisitorSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Retrieve a session by id. Returns `None` if not found.
  fn get_session<'a>(
    &'a self,
    id: &'a SessionId,
  ) -> impl Future<Output = Result<Option<VisitorSession>, Self::Error>> + Send + 'a;

  // ── Page views — append-only ──────────────────────────────────────────

  /// Insert a freshly-opened page view (`duration_seconds` unset).
  fn open_page_view<'a>(
    &'a self,
    view: &'a PageViewRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Close an open page view. Returns `false` when the view was already
  /// closed (the duration is never overwritten) or does not exist.
  fn close_page_view(
    &self,
    page_view_id: Uuid,
    duration_seconds: u32,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All page views for a session, in entry order.
  fn page_views_for<'a>(
    &'a self,
    id: &'a SessionId,
  ) -> impl Future<Output = Result<Vec<PageViewRecord>, Self::Error>> + Send + 'a;

  // ── Aggregate reads ───────────────────────────────────────────────────

  /// Tally of `page_path` over views that are still open or were entered
  /// at/after `since`, most-viewed first.
  fn popular_pages(
    &self,
    since: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<PageCount>, Self::Error>> + Send + '_;

  /// Session tally per device type over sessions with a heartbeat
  /// at/after `since`.
  fn device_breakdown(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<BreakdownEntry>, Self::Error>> + Send + '_;

  /// Session tally per browser over the same window.
  fn browser_breakdown(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<BreakdownEntry>, Self::Error>> + Send + '_;

  /// Session tally per traffic source: `utm_source` when present,
  /// otherwise the referrer, otherwise `"direct"`.
  fn source_breakdown(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<BreakdownEntry>, Self::Error>> + Send + '_;

  /// Distinct fingerprints with any session activity overlapping
  /// `[day_start, day_end)`.
  fn unique_fingerprints(
    &self,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
