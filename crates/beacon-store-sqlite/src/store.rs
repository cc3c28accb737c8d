//! [`SqliteStore`] — the SQLite implementation of [`SessionStore`].

use std::path::Path;

use beacon_core::{
  session::{PageViewRecord, SessionId, VisitorSession},
  snapshot::{BreakdownEntry, PageCount},
  store::SessionStore,
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawPageView, RawSession, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Beacon session store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn upsert_session(&self, session: &VisitorSession) -> Result<()> {
    let raw = RawSession::from_session(session);

    self
      .conn
      .call(move |conn| {
        // Immutable attributes (fingerprint, start time, referrer, UTM,
        // device) are deliberately absent from the DO UPDATE list.
        conn.execute(
          "INSERT INTO sessions (
             session_id, fingerprint, started_at, last_heartbeat_at, ended_at,
             current_page, current_page_title, page_entered_at,
             total_page_views, click_count, movement_count, max_scroll_percentage,
             referrer, utm_source, utm_medium, utm_campaign,
             device_type, browser, operating_system
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17, ?18, ?19)
           ON CONFLICT(session_id) DO UPDATE SET
             last_heartbeat_at     = excluded.last_heartbeat_at,
             ended_at              = excluded.ended_at,
             current_page          = excluded.current_page,
             current_page_title    = excluded.current_page_title,
             page_entered_at       = excluded.page_entered_at,
             total_page_views      = excluded.total_page_views,
             click_count           = excluded.click_count,
             movement_count        = excluded.movement_count,
             max_scroll_percentage = excluded.max_scroll_percentage",
          rusqlite::params![
            raw.session_id,
            raw.fingerprint,
            raw.started_at,
            raw.last_heartbeat_at,
            raw.ended_at,
            raw.current_page,
            raw.current_page_title,
            raw.page_entered_at,
            raw.total_page_views,
            raw.click_count,
            raw.movement_count,
            raw.max_scroll_percentage,
            raw.referrer,
            raw.utm_source,
            raw.utm_medium,
            raw.utm_campaign,
            raw.device_type,
            raw.browser,
            raw.operating_system,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_session(&self, id: &SessionId) -> Result<Option<VisitorSession>> {
    let id_str = id.as_str().to_owned();

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT session_id, fingerprint, started_at, last_heartbeat_at,
                      ended_at, current_page, current_page_title,
                      page_entered_at, total_page_views, click_count,
                      movement_count, max_scroll_percentage, referrer,
                      utm_source, utm_medium, utm_campaign, device_type,
                      browser, operating_system
               FROM sessions WHERE session_id = ?1",
              rusqlite::params![id_str],
              map_session_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  // ── Page views — append-only ──────────────────────────────────────────────

  async fn open_page_view(&self, view: &PageViewRecord) -> Result<()> {
    let id_str         = encode_uuid(view.page_view_id);
    let session_id_str = view.session_id.as_str().to_owned();
    let page_path      = view.page_path.clone();
    let page_title     = view.page_title.clone();
    let entered_at_str = encode_dt(view.entered_at);
    let duration       = view.duration_seconds.map(i64::from);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO page_views (
             page_view_id, session_id, page_path, page_title, entered_at,
             duration_seconds
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            session_id_str,
            page_path,
            page_title,
            entered_at_str,
            duration,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn close_page_view(
    &self,
    page_view_id: Uuid,
    duration_seconds: u32,
  ) -> Result<bool> {
    let id_str   = encode_uuid(page_view_id);
    let duration = i64::from(duration_seconds);

    let updated = self
      .conn
      .call(move |conn| {
        // The NULL guard makes the close write-once: a second close (or a
        // sweep racing an end signal that slipped through) is a no-op.
        let n = conn.execute(
          "UPDATE page_views SET duration_seconds = ?2
           WHERE page_view_id = ?1 AND duration_seconds IS NULL",
          rusqlite::params![id_str, duration],
        )?;
        Ok(n)
      })
      .await?;

    Ok(updated > 0)
  }

  async fn page_views_for(&self, id: &SessionId) -> Result<Vec<PageViewRecord>> {
    let id_str = id.as_str().to_owned();

    let raws: Vec<RawPageView> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT page_view_id, session_id, page_path, page_title,
                  entered_at, duration_seconds
           FROM page_views WHERE session_id = ?1
           ORDER BY entered_at, page_view_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawPageView {
              page_view_id: row.get(0)?,
              session_id:   row.get(1)?,
              page_path:    row.get(2)?,
              page_title:   row.get(3)?,
              entered_at:   row.get(4)?,
              duration_seconds: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPageView::into_page_view).collect()
  }

  // ── Aggregate reads ───────────────────────────────────────────────────────

  async fn popular_pages(
    &self,
    since: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<PageCount>> {
    let since_str = encode_dt(since);
    let limit_val = limit as i64;

    let rows = self
      .conn
      .call(move |conn| {
        // Open views count regardless of age: a visitor parked on a page
        // since before the window is still "on" it right now.
        let mut stmt = conn.prepare(
          "SELECT page_path, COUNT(*) AS views
           FROM page_views
           WHERE duration_seconds IS NULL OR entered_at >= ?1
           GROUP BY page_path
           ORDER BY views DESC, page_path
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![since_str, limit_val], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(page_path, views)| PageCount { page_path, views: views as u64 })
        .collect(),
    )
  }

  async fn device_breakdown(&self, since: DateTime<Utc>) -> Result<Vec<BreakdownEntry>> {
    self.breakdown("device_type", since).await
  }

  async fn browser_breakdown(&self, since: DateTime<Utc>) -> Result<Vec<BreakdownEntry>> {
    self.breakdown("browser", since).await
  }

  async fn source_breakdown(&self, since: DateTime<Utc>) -> Result<Vec<BreakdownEntry>> {
    self
      .breakdown(
        "COALESCE(NULLIF(utm_source, ''), NULLIF(referrer, ''), 'direct')",
        since,
      )
      .await
  }

  async fn unique_fingerprints(
    &self,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
  ) -> Result<u64> {
    let start_str = encode_dt(day_start);
    let end_str   = encode_dt(day_end);

    let count: i64 = self
      .conn
      .call(move |conn| {
        // "Any activity in the day" is an interval-overlap test between
        // [started_at, last_heartbeat_at] and the day bounds.
        Ok(conn.query_row(
          "SELECT COUNT(DISTINCT fingerprint) FROM sessions
           WHERE started_at < ?2 AND last_heartbeat_at >= ?1",
          rusqlite::params![start_str, end_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }
}

impl SqliteStore {
  /// Shared GROUP BY tally over sessions seen in the window. `dimension`
  /// is a trusted SQL expression chosen by this crate, never user input.
  async fn breakdown(
    &self,
    dimension: &'static str,
    since: DateTime<Utc>,
  ) -> Result<Vec<BreakdownEntry>> {
    let since_str = encode_dt(since);

    let rows = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {dimension} AS dim, COUNT(*) AS sessions
           FROM sessions
           WHERE last_heartbeat_at >= ?1
           GROUP BY dim
           ORDER BY sessions DESC, dim"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![since_str], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(key, sessions)| BreakdownEntry { key, sessions: sessions as u64 })
        .collect(),
    )
  }
}

fn map_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSession> {
  Ok(RawSession {
    session_id:  row.get(0)?,
    fingerprint: row.get(1)?,
    started_at:        row.get(2)?,
    last_heartbeat_at: row.get(3)?,
    ended_at:          row.get(4)?,
    current_page:       row.get(5)?,
    current_page_title: row.get(6)?,
    page_entered_at:    row.get(7)?,
    total_page_views:      row.get(8)?,
    click_count:           row.get(9)?,
    movement_count:        row.get(10)?,
    max_scroll_percentage: row.get(11)?,
    referrer:     row.get(12)?,
    utm_source:   row.get(13)?,
    utm_medium:   row.get(14)?,
    utm_campaign: row.get(15)?,
    device_type:      row.get(16)?,
    browser:          row.get(17)?,
    operating_system: row.get(18)?,
  })
}
