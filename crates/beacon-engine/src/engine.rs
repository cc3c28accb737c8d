//! [`SessionEngine`] — the per-session state machine.

use std::{
  collections::HashMap,
  collections::hash_map::Entry,
  hash::{DefaultHasher, Hash as _, Hasher as _},
  sync::{Arc, Mutex as StdMutex},
};

use beacon_core::{
  clock::Clock,
  filter::ExclusionFilter,
  session::{SessionId, VisitorSession},
  signal::{
    EndSignal, HeartbeatSignal, PageChangeSignal, Signal, StartSignal,
  },
  store::SessionStore,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::{
  Error, Result,
  config::EngineConfig,
  live::{LiveSession, clamp_seconds},
};

type Shard = StdMutex<HashMap<SessionId, Arc<AsyncMutex<LiveSession>>>>;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
  /// Sessions force-ended for exceeding the long timeout.
  pub finalized: usize,
  /// Ended sessions evicted from memory after the retention window.
  pub evicted:   usize,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Server-side session state machine.
///
/// Cloning is cheap — the inner state is reference-counted. Updates for a
/// single `session_id` are serialized behind that session's async mutex
/// (the sweep contends for the same mutex); the shard locks only guard
/// map lookup/insert and are never held across an await.
pub struct SessionEngine<S> {
  inner: Arc<Inner<S>>,
}

impl<S> Clone for SessionEngine<S> {
  fn clone(&self) -> Self {
    Self { inner: Arc::clone(&self.inner) }
  }
}

struct Inner<S> {
  store:  S,
  clock:  Arc<dyn Clock>,
  config: EngineConfig,
  filter: ExclusionFilter,
  shards: Vec<Shard>,
}

impl<S: SessionStore + 'static> SessionEngine<S> {
  pub fn new(store: S, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
    let shards = (0..config.shard_count.max(1))
      .map(|_| StdMutex::new(HashMap::new()))
      .collect();
    Self {
      inner: Arc::new(Inner {
        store,
        clock,
        config,
        filter: ExclusionFilter::default(),
        shards,
      }),
    }
  }

  pub fn store(&self) -> &S { &self.inner.store }

  pub fn clock(&self) -> &dyn Clock { self.inner.clock.as_ref() }

  pub fn config(&self) -> &EngineConfig { &self.inner.config }

  // ── Signal processing ─────────────────────────────────────────────────

  /// Process a signal observed at the engine clock's current time.
  pub async fn process(&self, signal: Signal) -> Result<()> {
    let at = self.inner.clock.now();
    self.process_at(signal, at).await
  }

  /// Process a signal with an explicit observation time. Rejected signals
  /// (malformed, unknown, ended, excluded) never change state.
  pub async fn process_at(
    &self,
    signal: Signal,
    at: DateTime<Utc>,
  ) -> Result<()> {
    signal.validate()?;
    match signal {
      Signal::Start(s) => self.apply_start(s, at).await,
      Signal::Heartbeat(s) => self.apply_heartbeat(s, at).await,
      Signal::PageChange(s) => self.apply_page_change(s, at).await,
      Signal::End(s) => self.apply_end(s, at).await,
    }
  }

  async fn apply_start(&self, signal: StartSignal, at: DateTime<Utc>) -> Result<()> {
    // The filter runs before any record is created; an excluded session
    // never exists anywhere.
    if self.inner.filter.is_excluded(&signal.page_path) {
      return Err(beacon_core::Error::ExcludedPath(signal.page_path).into());
    }

    let (arc, created_view) = {
      let shard = self.shard_for(&signal.session_id);
      let mut map = shard.lock().expect("shard lock poisoned");
      match map.entry(signal.session_id.clone()) {
        Entry::Occupied(e) => (Arc::clone(e.get()), None),
        Entry::Vacant(v) => {
          let (live, view) = LiveSession::start(&signal, at);
          let arc = Arc::new(AsyncMutex::new(live));
          v.insert(Arc::clone(&arc));
          (arc, Some(view))
        }
      }
    };

    let mut live = arc.lock().await;
    match created_view {
      Some(view) => {
        self.persist_session(&live.session).await?;
        self
          .inner
          .store
          .open_page_view(&view)
          .await
          .map_err(store_err)?;
      }
      None => {
        // Duplicate start: merged as if it were a heartbeat — no second
        // session, no double-counted initial page view.
        if live.session.is_ended() {
          return Err(
            beacon_core::Error::SessionEnded(signal.session_id).into(),
          );
        }
        live.touch(at);
        self.persist_session(&live.session).await?;
      }
    }
    Ok(())
  }

  async fn apply_heartbeat(
    &self,
    signal: HeartbeatSignal,
    at: DateTime<Utc>,
  ) -> Result<()> {
    let arc = self.entry(&signal.session_id).ok_or_else(|| {
      beacon_core::Error::UnknownSession(signal.session_id.clone())
    })?;
    let mut live = arc.lock().await;
    if live.session.is_ended() {
      return Err(beacon_core::Error::SessionEnded(signal.session_id).into());
    }

    // The client-reported elapsed time is advisory; note implausible
    // values but store nothing from them.
    let clamped = clamp_seconds(
      signal.time_on_page_seconds,
      self.inner.config.max_page_view_secs,
    );
    if i64::from(clamped) != signal.time_on_page_seconds {
      tracing::debug!(
        session = %signal.session_id,
        reported = signal.time_on_page_seconds,
        "implausible time_on_page in heartbeat, clamped"
      );
    }

    if live.merge_heartbeat(&signal, at) {
      tracing::debug!(
        session = %signal.session_id,
        heartbeat_page = %signal.page_path,
        current_page = %live.session.current_page,
        "heartbeat page does not match current page"
      );
    }
    self.persist_session(&live.session).await
  }

  async fn apply_page_change(
    &self,
    signal: PageChangeSignal,
    at: DateTime<Utc>,
  ) -> Result<()> {
    // A navigation into an administrative area is rejected outright: the
    // outgoing view stays open and the sweep will eventually close it.
    if self.inner.filter.is_excluded(&signal.new_page) {
      return Err(beacon_core::Error::ExcludedPath(signal.new_page).into());
    }

    let arc = self.entry(&signal.session_id).ok_or_else(|| {
      beacon_core::Error::UnknownSession(signal.session_id.clone())
    })?;
    let mut live = arc.lock().await;
    if live.session.is_ended() {
      return Err(beacon_core::Error::SessionEnded(signal.session_id).into());
    }

    let transition =
      live.change_page(&signal, at, self.inner.config.max_page_view_secs);

    let closed = self
      .inner
      .store
      .close_page_view(transition.closed_view_id, transition.closed_duration)
      .await
      .map_err(store_err)?;
    if !closed {
      tracing::warn!(
        session = %signal.session_id,
        view = %transition.closed_view_id,
        "page view was already closed"
      );
    }
    self
      .inner
      .store
      .open_page_view(&transition.opened)
      .await
      .map_err(store_err)?;
    self.persist_session(&live.session).await
  }

  async fn apply_end(&self, signal: EndSignal, at: DateTime<Utc>) -> Result<()> {
    let arc = self.entry(&signal.session_id).ok_or_else(|| {
      beacon_core::Error::UnknownSession(signal.session_id.clone())
    })?;
    let mut live = arc.lock().await;
    if live.session.is_ended() {
      return Err(beacon_core::Error::SessionEnded(signal.session_id).into());
    }

    let (view_id, duration) =
      live.end(&signal, at, self.inner.config.max_page_view_secs);
    self
      .inner
      .store
      .close_page_view(view_id, duration)
      .await
      .map_err(store_err)?;
    self.persist_session(&live.session).await
  }

  // ── Sweep ─────────────────────────────────────────────────────────────

  /// One sweep pass: force-end sessions past the long timeout and evict
  /// ended entries past the retention window. Store failures for a single
  /// session are logged and skipped; the pass itself never fails.
  pub async fn run_sweep(&self, at: DateTime<Utc>) -> SweepStats {
    let mut stats = SweepStats::default();

    for (id, arc) in self.all_entries() {
      let mut live = arc.lock().await;

      if let Some(ended_at) = live.session.ended_at {
        if at - ended_at >= self.inner.config.ended_retention {
          drop(live);
          self.remove_entry(&id);
          stats.evicted += 1;
        }
        continue;
      }

      if at - live.session.last_heartbeat_at > self.inner.config.session_timeout
      {
        let (view_id, duration) =
          live.finalize_timeout(self.inner.config.max_page_view_secs);

        if let Err(e) =
          self.inner.store.close_page_view(view_id, duration).await
        {
          tracing::warn!(session = %id, error = %e, "sweep: close failed");
          continue;
        }
        if let Err(e) = self.inner.store.upsert_session(&live.session).await {
          tracing::warn!(session = %id, error = %e, "sweep: upsert failed");
          continue;
        }
        tracing::debug!(session = %id, "sweep finalized inactive session");
        stats.finalized += 1;
      }
    }

    stats
  }

  /// Spawn the periodic sweep task. Runs until the handle is aborted.
  pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
    let engine = self.clone();
    tokio::spawn(async move {
      let mut interval =
        tokio::time::interval(engine.inner.config.sweep_interval);
      interval
        .set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        interval.tick().await;
        let now = engine.inner.clock.now();
        let stats = engine.run_sweep(now).await;
        if stats != SweepStats::default() {
          tracing::info!(
            finalized = stats.finalized,
            evicted = stats.evicted,
            "inactivity sweep"
          );
        }
      }
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Clone every non-ended live session. Each entry is locked only long
  /// enough to clone it; writers are never blocked for the scan.
  pub async fn live_sessions(&self) -> Vec<VisitorSession> {
    let mut out = Vec::new();
    for (_, arc) in self.all_entries() {
      let live = arc.lock().await;
      if !live.session.is_ended() {
        out.push(live.session.clone());
      }
    }
    out
  }

  /// Current in-memory state of one session, ended or not.
  pub async fn get_live(&self, id: &SessionId) -> Option<VisitorSession> {
    let arc = self.entry(id)?;
    let live = arc.lock().await;
    Some(live.session.clone())
  }

  // ── Shard plumbing ────────────────────────────────────────────────────

  fn shard_for(&self, id: &SessionId) -> &Shard {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let idx = hasher.finish() as usize % self.inner.shards.len();
    &self.inner.shards[idx]
  }

  fn entry(&self, id: &SessionId) -> Option<Arc<AsyncMutex<LiveSession>>> {
    let map = self.shard_for(id).lock().expect("shard lock poisoned");
    map.get(id).cloned()
  }

  fn remove_entry(&self, id: &SessionId) {
    let mut map = self.shard_for(id).lock().expect("shard lock poisoned");
    map.remove(id);
  }

  fn all_entries(&self) -> Vec<(SessionId, Arc<AsyncMutex<LiveSession>>)> {
    let mut out = Vec::new();
    for shard in &self.inner.shards {
      let map = shard.lock().expect("shard lock poisoned");
      out.extend(map.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
    }
    out
  }

  async fn persist_session(&self, session: &VisitorSession) -> Result<()> {
    self.inner.store.upsert_session(session).await.map_err(store_err)
  }
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Store(Box::new(e))
}
