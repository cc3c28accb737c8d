//! SQL schema for the Beacon SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sessions (
    session_id            TEXT PRIMARY KEY,
    fingerprint           TEXT NOT NULL,
    started_at            TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    last_heartbeat_at     TEXT NOT NULL,
    ended_at              TEXT,            -- NULL until the session ends
    current_page          TEXT NOT NULL,
    current_page_title    TEXT NOT NULL,
    page_entered_at       TEXT NOT NULL,
    total_page_views      INTEGER NOT NULL DEFAULT 1,
    click_count           INTEGER NOT NULL DEFAULT 0,
    movement_count        INTEGER NOT NULL DEFAULT 0,
    max_scroll_percentage INTEGER NOT NULL DEFAULT 0,
    referrer              TEXT,
    utm_source            TEXT,
    utm_medium            TEXT,
    utm_campaign          TEXT,
    device_type           TEXT NOT NULL,   -- 'desktop' | 'mobile' | 'tablet'
    browser               TEXT NOT NULL,
    operating_system      TEXT NOT NULL
);

-- Page views are append-only. A row's duration is written exactly once,
-- guarded by `duration_seconds IS NULL`; no other UPDATE is ever issued.
CREATE TABLE IF NOT EXISTS page_views (
    page_view_id     TEXT PRIMARY KEY,
    session_id       TEXT NOT NULL REFERENCES sessions(session_id),
    page_path        TEXT NOT NULL,
    page_title       TEXT NOT NULL,
    entered_at       TEXT NOT NULL,
    duration_seconds INTEGER,              -- NULL while the view is open
    CHECK (duration_seconds IS NULL OR duration_seconds >= 0)
);

CREATE INDEX IF NOT EXISTS sessions_heartbeat_idx   ON sessions(last_heartbeat_at);
CREATE INDEX IF NOT EXISTS sessions_fingerprint_idx ON sessions(fingerprint);
CREATE INDEX IF NOT EXISTS page_views_session_idx   ON page_views(session_id);
CREATE INDEX IF NOT EXISTS page_views_entered_idx   ON page_views(entered_at);

PRAGMA user_version = 1;
";
