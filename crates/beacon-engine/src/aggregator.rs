//! [`Aggregator`] — point-in-time read models over the engine and store.
//!
//! Reads never block writers: the active list comes from brief per-entry
//! clones of the live table, historical tallies are store queries, and
//! dashboard consumers read the latest published snapshot from a watch
//! channel instead of querying per request.

use beacon_core::{
  lifecycle::SessionState,
  snapshot::{ActiveVisitor, AggregateSnapshot, BreakdownEntry, PageCount},
  store::SessionStore,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::sync::watch;

use crate::{Error, Result, engine::SessionEngine};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Windows and cadence for snapshot building.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
  /// Trailing window for the popular-pages tally.
  pub popular_window: Duration,
  /// Reporting window for device/browser/source breakdowns.
  pub breakdown_window: Duration,
  /// Maximum rows in the popular-pages list.
  pub popular_limit: usize,
  /// Cadence of the snapshot refresher task — the staleness bound
  /// dashboard consumers accept.
  pub refresh_interval: std::time::Duration,
}

impl Default for AggregatorConfig {
  fn default() -> Self {
    Self {
      popular_window:   Duration::minutes(10),
      breakdown_window: Duration::hours(24),
      popular_limit:    10,
      refresh_interval: std::time::Duration::from_secs(5),
    }
  }
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

pub struct Aggregator<S> {
  engine: SessionEngine<S>,
  config: AggregatorConfig,
}

impl<S> Clone for Aggregator<S> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone(), config: self.config.clone() }
  }
}

impl<S: SessionStore + 'static> Aggregator<S> {
  pub fn new(engine: SessionEngine<S>, config: AggregatorConfig) -> Self {
    Self { engine, config }
  }

  /// Build a full snapshot as of the engine clock's current time.
  pub async fn snapshot(&self) -> Result<AggregateSnapshot> {
    let at = self.engine.clock().now();
    self.snapshot_at(at).await
  }

  /// Build a full snapshot as of `at`.
  pub async fn snapshot_at(&self, at: DateTime<Utc>) -> Result<AggregateSnapshot> {
    let active_visitors = self.active_visitors_at(at).await;
    let store = self.engine.store();

    let popular_pages = store
      .popular_pages(at - self.config.popular_window, self.config.popular_limit)
      .await
      .map_err(store_err)?;

    let breakdown_since = at - self.config.breakdown_window;
    let devices =
      store.device_breakdown(breakdown_since).await.map_err(store_err)?;
    let browsers =
      store.browser_breakdown(breakdown_since).await.map_err(store_err)?;
    let sources =
      store.source_breakdown(breakdown_since).await.map_err(store_err)?;

    let (day_start, day_end) = calendar_day(at);
    let unique_visitors_today = store
      .unique_fingerprints(day_start, day_end)
      .await
      .map_err(store_err)?;

    Ok(AggregateSnapshot {
      generated_at: at,
      active_count: active_visitors.len() as u64,
      active_visitors,
      popular_pages,
      devices,
      browsers,
      sources,
      unique_visitors_today,
    })
  }

  /// Sessions classified active at `at`, most recently seen first.
  pub async fn active_visitors_at(&self, at: DateTime<Utc>) -> Vec<ActiveVisitor> {
    let window = self.engine.config().active_window;
    let mut visitors: Vec<ActiveVisitor> = self
      .engine
      .live_sessions()
      .await
      .iter()
      .filter(|s| {
        SessionState::classify(at, s.last_heartbeat_at, false, window)
          .is_active()
      })
      .map(ActiveVisitor::from_session)
      .collect();
    visitors.sort_by(|a, b| b.last_heartbeat_at.cmp(&a.last_heartbeat_at));
    visitors
  }

  /// Popular pages over an arbitrary trailing window (dashboard query).
  pub async fn popular_pages(
    &self,
    window: Duration,
    limit: usize,
  ) -> Result<Vec<PageCount>> {
    let at = self.engine.clock().now();
    self
      .engine
      .store()
      .popular_pages(at - window, limit)
      .await
      .map_err(store_err)
  }

  pub async fn device_breakdown(&self, window: Duration) -> Result<Vec<BreakdownEntry>> {
    let at = self.engine.clock().now();
    self
      .engine
      .store()
      .device_breakdown(at - window)
      .await
      .map_err(store_err)
  }

  pub async fn source_breakdown(&self, window: Duration) -> Result<Vec<BreakdownEntry>> {
    let at = self.engine.clock().now();
    self
      .engine
      .store()
      .source_breakdown(at - window)
      .await
      .map_err(store_err)
  }

  /// Distinct fingerprints with activity in the current calendar day.
  pub async fn unique_visitors_today(&self) -> Result<u64> {
    let at = self.engine.clock().now();
    let (day_start, day_end) = calendar_day(at);
    self
      .engine
      .store()
      .unique_fingerprints(day_start, day_end)
      .await
      .map_err(store_err)
  }

  /// Spawn the refresher task: rebuild the snapshot every
  /// `refresh_interval` and publish it. A failed rebuild keeps the
  /// previous snapshot in place.
  pub fn spawn_refresher(
    &self,
  ) -> (watch::Receiver<AggregateSnapshot>, tokio::task::JoinHandle<()>) {
    let (tx, rx) =
      watch::channel(AggregateSnapshot::empty(self.engine.clock().now()));
    let aggregator = self.clone();
    let handle = tokio::spawn(async move {
      let mut interval =
        tokio::time::interval(aggregator.config.refresh_interval);
      interval
        .set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        interval.tick().await;
        match aggregator.snapshot().await {
          Ok(snapshot) => {
            tx.send_replace(snapshot);
          }
          Err(e) => tracing::warn!(error = %e, "snapshot refresh failed"),
        }
      }
    });
    (rx, handle)
  }
}

/// UTC calendar-day bounds containing `at`: `[midnight, midnight + 1d)`.
fn calendar_day(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
  let start = at.date_naive().and_time(NaiveTime::MIN).and_utc();
  (start, start + Duration::days(1))
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Store(Box::new(e))
}
