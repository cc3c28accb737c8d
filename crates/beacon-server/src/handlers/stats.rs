//! Handlers for the `/stats` dashboard endpoints (Basic auth required).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/stats/snapshot` | Latest published [`AggregateSnapshot`] |
//! | `GET` | `/stats/active` | Fresh active-visitor list |
//! | `GET` | `/stats/pages` | `?minutes=` window, `?limit=` rows |
//! | `GET` | `/stats/devices` | `?hours=` window |
//! | `GET` | `/stats/sources` | `?hours=` window |
//! | `GET` | `/stats/visitors/today` | Distinct fingerprints today |
//!
//! `/stats/snapshot` is a channel borrow of the refresher's last build —
//! the 5-second staleness bound is the deal dashboards accepted. The
//! windowed queries go to the store directly.

use axum::{Json, extract::Query, extract::State};
use beacon_core::{
  snapshot::{ActiveVisitor, AggregateSnapshot, BreakdownEntry, PageCount},
  store::SessionStore,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /stats/snapshot`
pub async fn snapshot<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Json<AggregateSnapshot>
where
  S: SessionStore + 'static,
{
  Json(state.snapshot.borrow().clone())
}

/// `GET /stats/active` — computed from the live table at request time.
pub async fn active<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Json<Vec<ActiveVisitor>>
where
  S: SessionStore + 'static,
{
  let at = state.engine.clock().now();
  Json(state.aggregator.active_visitors_at(at).await)
}

#[derive(Debug, Deserialize)]
pub struct PagesParams {
  /// Trailing window in minutes; default 10.
  pub minutes: Option<i64>,
  /// Maximum rows; default 10.
  pub limit:   Option<usize>,
}

/// `GET /stats/pages?minutes=10&limit=10`
pub async fn pages<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Query(params): Query<PagesParams>,
) -> Result<Json<Vec<PageCount>>, ApiError>
where
  S: SessionStore + 'static,
{
  let minutes = params.minutes.unwrap_or(10);
  if minutes <= 0 {
    return Err(ApiError::BadRequest("minutes must be positive".into()));
  }
  let pages = state
    .aggregator
    .popular_pages(Duration::minutes(minutes), params.limit.unwrap_or(10))
    .await?;
  Ok(Json(pages))
}

#[derive(Debug, Deserialize)]
pub struct WindowParams {
  /// Reporting window in hours; default 24.
  pub hours: Option<i64>,
}

impl WindowParams {
  fn window(&self) -> Result<Duration, ApiError> {
    let hours = self.hours.unwrap_or(24);
    if hours <= 0 {
      return Err(ApiError::BadRequest("hours must be positive".into()));
    }
    Ok(Duration::hours(hours))
  }
}

/// `GET /stats/devices?hours=24`
pub async fn devices<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Vec<BreakdownEntry>>, ApiError>
where
  S: SessionStore + 'static,
{
  let breakdown = state.aggregator.device_breakdown(params.window()?).await?;
  Ok(Json(breakdown))
}

/// `GET /stats/sources?hours=24`
pub async fn sources<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Vec<BreakdownEntry>>, ApiError>
where
  S: SessionStore + 'static,
{
  let breakdown = state.aggregator.source_breakdown(params.window()?).await?;
  Ok(Json(breakdown))
}

/// `GET /stats/visitors/today`
pub async fn visitors_today<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<Value>, ApiError>
where
  S: SessionStore + 'static,
{
  let unique = state.aggregator.unique_visitors_today().await?;
  Ok(Json(json!({ "unique_visitors": unique })))
}
