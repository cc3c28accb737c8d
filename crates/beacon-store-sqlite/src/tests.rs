//! Integration tests for `SqliteStore` against an in-memory database.

use beacon_core::{
  session::{
    DeviceInfo, DeviceType, Fingerprint, PageViewRecord, SessionId, UtmTags,
    VisitorSession,
  },
  store::SessionStore,
};
use chrono::{DateTime, Duration, Utc};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn t0() -> DateTime<Utc> {
  "2026-08-06T10:00:00Z".parse().expect("valid timestamp")
}

fn session(id: &str, fingerprint: &str, at: DateTime<Utc>) -> VisitorSession {
  VisitorSession {
    session_id:  SessionId::new(id),
    fingerprint: Fingerprint::new(fingerprint),
    started_at:        at,
    last_heartbeat_at: at,
    ended_at:          None,
    current_page:       "/".into(),
    current_page_title: "Home".into(),
    page_entered_at:    at,
    total_page_views:      1,
    click_count:           0,
    movement_count:        0,
    max_scroll_percentage: 0,
    referrer: None,
    utm:      UtmTags::default(),
    device:   DeviceInfo {
      device_type:      DeviceType::Desktop,
      browser:          "Firefox".into(),
      operating_system: "Linux".into(),
    },
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_and_get_round_trip() {
  let s = store().await;
  let mut session = session("tab-1", "fp-a", t0());
  session.referrer = Some("https://search.example".into());
  session.utm.source = Some("newsletter".into());
  session.max_scroll_percentage = 40;

  s.upsert_session(&session).await.unwrap();

  let fetched = s
    .get_session(&session.session_id)
    .await
    .unwrap()
    .expect("session present");
  assert_eq!(fetched.fingerprint, session.fingerprint);
  assert_eq!(fetched.referrer.as_deref(), Some("https://search.example"));
  assert_eq!(fetched.utm.source.as_deref(), Some("newsletter"));
  assert_eq!(fetched.max_scroll_percentage, 40);
  assert_eq!(fetched.device.device_type, DeviceType::Desktop);
  assert!(fetched.ended_at.is_none());
}

#[tokio::test]
async fn get_session_missing_returns_none() {
  let s = store().await;
  let missing = s.get_session(&SessionId::new("nope")).await.unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn upsert_updates_mutable_fields_only() {
  let s = store().await;
  let first = session("tab-1", "fp-a", t0());
  s.upsert_session(&first).await.unwrap();

  // Second write pretends the immutable attributes changed; the store
  // must keep the originals.
  let mut second = session("tab-1", "fp-CHANGED", t0());
  second.last_heartbeat_at = t0() + Duration::seconds(30);
  second.current_page = "/urunler".into();
  second.total_page_views = 2;
  second.device.browser = "Chrome".into();
  s.upsert_session(&second).await.unwrap();

  let fetched = s
    .get_session(&first.session_id)
    .await
    .unwrap()
    .expect("session present");
  assert_eq!(fetched.fingerprint.as_str(), "fp-a");
  assert_eq!(fetched.device.browser, "Firefox");
  assert_eq!(fetched.current_page, "/urunler");
  assert_eq!(fetched.total_page_views, 2);
  assert_eq!(fetched.last_heartbeat_at, t0() + Duration::seconds(30));
}

// ─── Page views ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn close_page_view_is_write_once() {
  let s = store().await;
  let sess = session("tab-1", "fp-a", t0());
  s.upsert_session(&sess).await.unwrap();

  let view =
    PageViewRecord::open(sess.session_id.clone(), "/", "Home", t0());
  s.open_page_view(&view).await.unwrap();

  assert!(s.close_page_view(view.page_view_id, 12).await.unwrap());
  // The second close is refused and the stored duration survives.
  assert!(!s.close_page_view(view.page_view_id, 999).await.unwrap());

  let views = s.page_views_for(&sess.session_id).await.unwrap();
  assert_eq!(views.len(), 1);
  assert_eq!(views[0].duration_seconds, Some(12));
}

#[tokio::test]
async fn close_unknown_view_returns_false() {
  let s = store().await;
  assert!(!s.close_page_view(uuid::Uuid::new_v4(), 5).await.unwrap());
}

#[tokio::test]
async fn page_views_are_returned_in_entry_order() {
  let s = store().await;
  let sess = session("tab-1", "fp-a", t0());
  s.upsert_session(&sess).await.unwrap();

  for (i, path) in ["/", "/urunler", "/iletisim"].iter().enumerate() {
    let view = PageViewRecord::open(
      sess.session_id.clone(),
      *path,
      "t",
      t0() + Duration::seconds(i as i64 * 10),
    );
    s.open_page_view(&view).await.unwrap();
  }

  let views = s.page_views_for(&sess.session_id).await.unwrap();
  let paths: Vec<&str> =
    views.iter().map(|v| v.page_path.as_str()).collect();
  assert_eq!(paths, ["/", "/urunler", "/iletisim"]);
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

async fn seed_views(
  s: &SqliteStore,
  sess: &VisitorSession,
  entries: &[(&str, i64, Option<u32>)],
) {
  for (path, offset, duration) in entries {
    let view = PageViewRecord::open(
      sess.session_id.clone(),
      *path,
      "t",
      t0() + Duration::seconds(*offset),
    );
    s.open_page_view(&view).await.unwrap();
    if let Some(d) = duration {
      assert!(s.close_page_view(view.page_view_id, *d).await.unwrap());
    }
  }
}

#[tokio::test]
async fn popular_pages_counts_open_and_recent_views() {
  let s = store().await;
  let sess = session("tab-1", "fp-a", t0());
  s.upsert_session(&sess).await.unwrap();

  seed_views(
    &s,
    &sess,
    &[
      // Old and closed: outside the window, not counted.
      ("/eski", -3600, Some(30)),
      // Old but still open: counted — the visitor is on it right now.
      ("/uzun", -3600, None),
      ("/urunler", 10, Some(12)),
      ("/urunler", 20, None),
      ("/", 30, Some(5)),
    ],
  )
  .await;

  let pages = s
    .popular_pages(t0() - Duration::minutes(10), 10)
    .await
    .unwrap();

  assert_eq!(pages[0].page_path, "/urunler");
  assert_eq!(pages[0].views, 2);
  let paths: Vec<&str> = pages.iter().map(|p| p.page_path.as_str()).collect();
  assert!(paths.contains(&"/uzun"));
  assert!(!paths.contains(&"/eski"));
}

#[tokio::test]
async fn breakdowns_tally_sessions_in_window() {
  let s = store().await;

  let mut desktop = session("tab-1", "fp-a", t0());
  desktop.utm.source = Some("newsletter".into());
  let mut mobile = session("tab-2", "fp-b", t0());
  mobile.device.device_type = DeviceType::Mobile;
  mobile.device.browser = "Safari".into();
  mobile.referrer = Some("https://search.example".into());
  let mut stale = session("tab-3", "fp-c", t0() - Duration::days(3));
  stale.device.device_type = DeviceType::Mobile;

  for sess in [&desktop, &mobile, &stale] {
    s.upsert_session(sess).await.unwrap();
  }

  let since = t0() - Duration::hours(24);

  let devices = s.device_breakdown(since).await.unwrap();
  assert_eq!(devices.len(), 2);
  assert!(devices.iter().any(|b| b.key == "desktop" && b.sessions == 1));
  assert!(devices.iter().any(|b| b.key == "mobile" && b.sessions == 1));

  let browsers = s.browser_breakdown(since).await.unwrap();
  assert!(browsers.iter().any(|b| b.key == "Safari" && b.sessions == 1));

  // utm_source wins over referrer; absent both falls back to "direct".
  let sources = s.source_breakdown(since).await.unwrap();
  assert!(sources.iter().any(|b| b.key == "newsletter"));
  assert!(sources.iter().any(|b| b.key == "https://search.example"));
  assert!(!sources.iter().any(|b| b.key == "direct"));
}

#[tokio::test]
async fn unique_fingerprints_deduplicate_tabs() {
  let s = store().await;

  // Two tabs from the same device share a fingerprint.
  s.upsert_session(&session("tab-1", "fp-a", t0())).await.unwrap();
  s.upsert_session(&session("tab-2", "fp-a", t0())).await.unwrap();
  s.upsert_session(&session("tab-3", "fp-b", t0())).await.unwrap();
  // Activity from two days ago is outside the calendar day.
  s.upsert_session(&session("tab-4", "fp-d", t0() - Duration::days(2)))
    .await
    .unwrap();

  let day_start = "2026-08-06T00:00:00Z".parse().unwrap();
  let day_end = "2026-08-07T00:00:00Z".parse().unwrap();
  let unique = s.unique_fingerprints(day_start, day_end).await.unwrap();
  assert_eq!(unique, 2);
}
