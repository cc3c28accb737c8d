//! HTTP surface for Beacon.
//!
//! Exposes an axum [`Router`] with an anonymous `POST /collect` ingestion
//! endpoint and Basic-auth'd `/stats/*` dashboard queries, backed by any
//! [`SessionStore`].

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use beacon_core::{snapshot::AggregateSnapshot, store::SessionStore};
use beacon_engine::{
  Aggregator, AggregatorConfig, EngineConfig, SessionEngine,
};
use chrono::Duration;
use serde::Deserialize;
use tokio::sync::watch;

use auth::AuthConfig;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BEACON_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,

  #[serde(default = "default_active_window_secs")]
  pub active_window_secs:    i64,
  #[serde(default = "default_session_timeout_secs")]
  pub session_timeout_secs:  i64,
  #[serde(default = "default_ended_retention_secs")]
  pub ended_retention_secs:  i64,
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs:   u64,
  #[serde(default = "default_snapshot_refresh_secs")]
  pub snapshot_refresh_secs: u64,
  #[serde(default = "default_max_page_view_secs")]
  pub max_page_view_secs:    u32,
}

fn default_active_window_secs() -> i64 { 75 }
fn default_session_timeout_secs() -> i64 { 30 * 60 }
fn default_ended_retention_secs() -> i64 { 5 * 60 }
fn default_sweep_interval_secs() -> u64 { 45 }
fn default_snapshot_refresh_secs() -> u64 { 5 }
fn default_max_page_view_secs() -> u32 { 4 * 60 * 60 }

impl ServerConfig {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      active_window:      Duration::seconds(self.active_window_secs),
      session_timeout:    Duration::seconds(self.session_timeout_secs),
      ended_retention:    Duration::seconds(self.ended_retention_secs),
      sweep_interval:     std::time::Duration::from_secs(self.sweep_interval_secs),
      max_page_view_secs: self.max_page_view_secs,
      ..EngineConfig::default()
    }
  }

  pub fn aggregator_config(&self) -> AggregatorConfig {
    AggregatorConfig {
      refresh_interval: std::time::Duration::from_secs(
        self.snapshot_refresh_secs,
      ),
      ..AggregatorConfig::default()
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub engine:     SessionEngine<S>,
  pub aggregator: Aggregator<S>,
  /// Last snapshot published by the refresher task.
  pub snapshot:   watch::Receiver<AggregateSnapshot>,
  pub auth:       Arc<AuthConfig>,
  pub config:     Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      engine:     self.engine.clone(),
      aggregator: self.aggregator.clone(),
      snapshot:   self.snapshot.clone(),
      auth:       Arc::clone(&self.auth),
      config:     Arc::clone(&self.config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Beacon server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SessionStore + 'static,
{
  Router::new()
    .route("/collect", post(handlers::collect::ingest::<S>))
    .route("/healthz", get(handlers::health::healthz))
    .route("/stats/snapshot", get(handlers::stats::snapshot::<S>))
    .route("/stats/active", get(handlers::stats::active::<S>))
    .route("/stats/pages", get(handlers::stats::pages::<S>))
    .route("/stats/devices", get(handlers::stats::devices::<S>))
    .route("/stats/sources", get(handlers::stats::sources::<S>))
    .route(
      "/stats/visitors/today",
      get(handlers::stats::visitors_today::<S>),
    )
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use beacon_core::clock::SystemClock;
  use beacon_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = SessionEngine::new(
      store,
      Arc::new(SystemClock),
      EngineConfig::default(),
    );
    let aggregator = Aggregator::new(
      engine.clone(),
      AggregatorConfig {
        refresh_interval: std::time::Duration::from_millis(20),
        ..AggregatorConfig::default()
      },
    );
    let (snapshot, _handle) = aggregator.spawn_refresher();

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    AppState {
      engine,
      aggregator,
      snapshot,
      auth: Arc::new(AuthConfig {
        username:      "ops".to_string(),
        password_hash: hash.clone(),
      }),
      config: Arc::new(ServerConfig {
        host:               "127.0.0.1".to_string(),
        port:               8640,
        store_path:         PathBuf::from(":memory:"),
        auth_username:      "ops".to_string(),
        auth_password_hash: hash,
        active_window_secs:    default_active_window_secs(),
        session_timeout_secs:  default_session_timeout_secs(),
        ended_retention_secs:  default_ended_retention_secs(),
        sweep_interval_secs:   default_sweep_interval_secs(),
        snapshot_refresh_secs: default_snapshot_refresh_secs(),
        max_page_view_secs:    default_max_page_view_secs(),
      }),
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn collect(
    state: AppState<SqliteStore>,
    signal: Value,
  ) -> axum::response::Response {
    let req = Request::builder()
      .method("POST")
      .uri("/collect")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(signal.to_string()))
      .unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn get_authed(
    state: AppState<SqliteStore>,
    uri: &str,
    auth: &str,
  ) -> axum::response::Response {
    let req = Request::builder()
      .method("GET")
      .uri(uri)
      .header(header::AUTHORIZATION, auth)
      .body(Body::empty())
      .unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn start_signal(id: &str) -> Value {
    json!({
      "type": "start",
      "session_id": id,
      "fingerprint": "0f1e2d3c4b5a69788796a5b4c3d2e1f0",
      "page_path": "/",
      "page_title": "Home",
      "referrer": null,
      "utm_source": null,
      "utm_medium": null,
      "utm_campaign": null,
      "device_type": "desktop",
      "browser": "Firefox",
      "os": "Linux"
    })
  }

  // ── Protocol flow ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn full_protocol_flow() {
    let state = make_state("secret").await;
    let auth = auth_header("ops", "secret");

    let resp = collect(state.clone(), start_signal("s1")).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = collect(
      state.clone(),
      json!({
        "type": "heartbeat",
        "session_id": "s1",
        "page_path": "/",
        "page_title": "Home",
        "time_on_page_seconds": 5,
        "scroll_percentage": 30,
        "click_count": 2,
        "movement_count": 11
      }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = get_authed(state.clone(), "/stats/active", &auth).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let active = body_json(resp).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["current_page"], "/");

    let resp = collect(
      state.clone(),
      json!({
        "type": "page_change",
        "session_id": "s1",
        "previous_page": "/",
        "new_page": "/urunler",
        "page_title": "Ürünler",
        "time_on_previous_page_seconds": 12
      }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = collect(
      state.clone(),
      json!({
        "type": "end",
        "session_id": "s1",
        "final_page": "/urunler",
        "time_on_final_page_seconds": 7
      }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = get_authed(state, "/stats/active", &auth).await;
    let active = body_json(resp).await;
    assert!(active.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn admin_page_load_is_filtered_and_leaves_no_trace() {
    let state = make_state("secret").await;
    let auth = auth_header("ops", "secret");

    let mut signal = start_signal("s1");
    signal["page_path"] = json!("/admin/products");
    let resp = collect(state.clone(), signal).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = get_authed(state, "/stats/active", &auth).await;
    let active = body_json(resp).await;
    assert!(active.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn unknown_session_heartbeat_is_404() {
    let state = make_state("secret").await;
    let resp = collect(
      state,
      json!({
        "type": "heartbeat",
        "session_id": "ghost",
        "page_path": "/",
        "page_title": "Home",
        "time_on_page_seconds": 5,
        "scroll_percentage": 0,
        "click_count": 0,
        "movement_count": 0
      }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn ended_session_signal_is_410() {
    let state = make_state("secret").await;
    collect(state.clone(), start_signal("s1")).await;
    collect(
      state.clone(),
      json!({
        "type": "end",
        "session_id": "s1",
        "final_page": "/",
        "time_on_final_page_seconds": 3
      }),
    )
    .await;

    let resp = collect(
      state,
      json!({
        "type": "heartbeat",
        "session_id": "s1",
        "page_path": "/",
        "page_title": "Home",
        "time_on_page_seconds": 8,
        "scroll_percentage": 0,
        "click_count": 0,
        "movement_count": 0
      }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::GONE);
  }

  #[tokio::test]
  async fn garbage_body_is_400() {
    let state = make_state("secret").await;
    let req = Request::builder()
      .method("POST")
      .uri("/collect")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Dashboard queries ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn stats_require_credentials() {
    let state = make_state("secret").await;

    let req = Request::builder()
      .method("GET")
      .uri("/stats/snapshot")
      .body(Body::empty())
      .unwrap();
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

    let resp = get_authed(
      state.clone(),
      "/stats/snapshot",
      &auth_header("ops", "wrong"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp =
      get_authed(state, "/stats/snapshot", &auth_header("ops", "secret")).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn healthz_is_open() {
    let state = make_state("secret").await;
    let req = Request::builder()
      .method("GET")
      .uri("/healthz")
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn snapshot_endpoint_serves_published_snapshot() {
    let state = make_state("secret").await;
    collect(state.clone(), start_signal("s1")).await;

    // Wait for the refresher to publish a build that saw the session. A
    // build already in flight when the signal landed may publish a stale
    // view first — that is the accepted staleness bound, so poll.
    let mut rx = state.snapshot.clone();
    while rx.borrow().active_count == 0 {
      rx.changed().await.expect("refresher alive");
    }

    let resp = get_authed(
      state,
      "/stats/snapshot",
      &auth_header("ops", "secret"),
    )
    .await;
    let snapshot = body_json(resp).await;
    assert_eq!(snapshot["active_count"], 1);
    assert_eq!(snapshot["unique_visitors_today"], 1);
  }

  #[tokio::test]
  async fn pages_and_breakdown_windows_validate_input() {
    let state = make_state("secret").await;
    let auth = auth_header("ops", "secret");

    let resp =
      get_authed(state.clone(), "/stats/pages?minutes=0", &auth).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    collect(state.clone(), start_signal("s1")).await;
    let resp = get_authed(state.clone(), "/stats/pages?minutes=30", &auth).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pages = body_json(resp).await;
    assert_eq!(pages[0]["page_path"], "/");

    let resp = get_authed(state.clone(), "/stats/devices", &auth).await;
    let devices = body_json(resp).await;
    assert_eq!(devices[0]["key"], "desktop");

    let resp = get_authed(state, "/stats/visitors/today", &auth).await;
    let visitors = body_json(resp).await;
    assert_eq!(visitors["unique_visitors"], 1);
  }
}
