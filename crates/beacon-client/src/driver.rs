//! [`SessionDriver`] — one session's signal lifecycle.

use std::time::{Duration, Instant};

use beacon_core::{
  filter::ExclusionFilter,
  session::{SessionId, UtmTags},
  signal::{
    EndSignal, HeartbeatSignal, PageChangeSignal, Signal, StartSignal,
  },
};
use beacon_fingerprint::ProbeSet;
use url::Url;

use crate::{Transport, useragent};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DriverConfig {
  /// Heartbeat cadence while the document is visible.
  pub heartbeat_interval: Duration,
  /// Minimum spacing between accepted scroll samples.
  pub scroll_throttle: Duration,
}

impl Default for DriverConfig {
  fn default() -> Self {
    Self {
      heartbeat_interval: Duration::from_secs(5),
      scroll_throttle:    Duration::from_millis(100),
    }
  }
}

/// What the embedding context knows about the current page.
#[derive(Debug, Clone)]
pub struct PageContext {
  /// Full URL, query and fragment included — the filter sees all of it.
  pub url:      String,
  pub title:    String,
  pub referrer: Option<String>,
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// Drives one session's signals over its lifetime.
///
/// Construction runs the admin-path filter before anything else: on a
/// match, [`SessionDriver::start`] returns `None` having done no work at
/// all — no fingerprint, no network call, no state.
pub struct SessionDriver<T> {
  transport: T,
  config:    DriverConfig,
  filter:    ExclusionFilter,

  session_id: SessionId,

  page_path:    String,
  page_title:   String,
  page_entered: Instant,

  clicks:     u32,
  movements:  u32,
  max_scroll: u8,
  last_scroll_sample: Option<Instant>,

  visible: bool,
  /// Set after navigating into an administrative area: all future
  /// signals, the end signal included, are silently suppressed.
  stopped: bool,
}

impl<T: Transport> SessionDriver<T> {
  /// Initialise tracking for a freshly-loaded page. Returns `None` when
  /// the page is administrative.
  pub async fn start(
    user_agent: &str,
    page: PageContext,
    probes: &ProbeSet,
    transport: T,
    config: DriverConfig,
  ) -> Option<Self> {
    let filter = ExclusionFilter::default();
    if filter.is_excluded(&page.url) {
      return None;
    }

    let session_id = SessionId::generate();
    let fingerprint = beacon_fingerprint::fingerprint(probes);
    let device = useragent::parse(user_agent);
    let utm = utm_tags(&page.url);
    let page_path = path_of(&page.url);

    let driver = Self {
      transport,
      config,
      filter,
      session_id: session_id.clone(),
      page_path: page_path.clone(),
      page_title: page.title.clone(),
      page_entered: Instant::now(),
      clicks: 0,
      movements: 0,
      max_scroll: 0,
      last_scroll_sample: None,
      visible: true,
      stopped: false,
    };

    driver
      .deliver(Signal::Start(StartSignal {
        session_id,
        fingerprint,
        page_path,
        page_title: page.title,
        referrer:     page.referrer,
        utm_source:   utm.source,
        utm_medium:   utm.medium,
        utm_campaign: utm.campaign,
        device_type: device.device_type,
        browser:     device.browser,
        os:          device.operating_system,
      }))
      .await;

    Some(driver)
  }

  pub fn session_id(&self) -> &SessionId { &self.session_id }

  pub fn config(&self) -> &DriverConfig { &self.config }

  pub fn is_stopped(&self) -> bool { self.stopped }

  // ── Local activity sampling ───────────────────────────────────────────

  pub fn record_click(&mut self) { self.clicks += 1; }

  pub fn record_movement(&mut self) { self.movements += 1; }

  /// Accept a scroll-depth sample, throttled; only the maximum sticks.
  pub fn record_scroll(&mut self, percent: u8) {
    let now = Instant::now();
    if let Some(last) = self.last_scroll_sample
      && now.duration_since(last) < self.config.scroll_throttle
    {
      return;
    }
    self.last_scroll_sample = Some(now);
    self.max_scroll = self.max_scroll.max(percent.min(100));
  }

  /// Mirror of the document's visibility; heartbeats pause while hidden.
  pub fn set_visible(&mut self, visible: bool) { self.visible = visible; }

  // ── Signals ───────────────────────────────────────────────────────────

  /// Emit one heartbeat, if the document is visible and tracking has not
  /// been stopped. Called by the embedder on its fixed interval.
  pub async fn heartbeat(&mut self) {
    if self.stopped || !self.visible {
      return;
    }
    let signal = Signal::Heartbeat(HeartbeatSignal {
      session_id: self.session_id.clone(),
      page_path:  self.page_path.clone(),
      page_title: self.page_title.clone(),
      time_on_page_seconds: self.page_entered.elapsed().as_secs() as i64,
      scroll_percentage:    self.max_scroll,
      click_count:          self.clicks,
      movement_count:       self.movements,
    });
    self.deliver(signal).await;
  }

  /// Handle a navigation: close the outgoing page, announce the incoming
  /// one, reset the per-page counters, re-apply the filter. Navigating
  /// into an administrative area silently stops all future signals — no
  /// end signal is sent for this context.
  pub async fn page_changed(&mut self, url: &str, title: &str) {
    if self.stopped {
      return;
    }

    let new_path = path_of(url);
    let signal = Signal::PageChange(PageChangeSignal {
      session_id:    self.session_id.clone(),
      previous_page: self.page_path.clone(),
      new_page:      new_path.clone(),
      page_title:    title.to_owned(),
      time_on_previous_page_seconds: self.page_entered.elapsed().as_secs()
        as i64,
    });
    self.deliver(signal).await;

    self.page_path = new_path;
    self.page_title = title.to_owned();
    self.page_entered = Instant::now();
    self.clicks = 0;
    self.movements = 0;
    self.max_scroll = 0;
    self.last_scroll_sample = None;

    if self.filter.is_excluded(url) {
      tracing::debug!(session = %self.session_id, "entered admin area, tracking stopped");
      self.stopped = true;
    }
  }

  /// Unload: enqueue the end signal for best-effort delivery and consume
  /// the driver. This is the one place the driver cannot know whether its
  /// signal arrived.
  pub fn end(self) {
    if self.stopped {
      return;
    }
    self.transport.enqueue(Signal::End(EndSignal {
      session_id: self.session_id,
      final_page: self.page_path,
      time_on_final_page_seconds: self.page_entered.elapsed().as_secs() as i64,
    }));
  }

  /// Send and swallow: tracking must never affect the host page.
  async fn deliver(&self, signal: Signal) {
    let kind = signal.discriminant();
    if let Err(e) = self.transport.send(signal).await {
      tracing::debug!(signal = kind, error = %e, "signal dropped");
    }
  }
}

// ─── URL helpers ─────────────────────────────────────────────────────────────

fn parse_url(url: &str) -> Option<Url> {
  Url::parse(url).ok().or_else(|| {
    // Relative paths resolve against a placeholder origin.
    Url::parse("http://localhost").ok()?.join(url).ok()
  })
}

/// The path component of a full or relative URL.
fn path_of(url: &str) -> String {
  match parse_url(url) {
    Some(parsed) => parsed.path().to_owned(),
    None => url.to_owned(),
  }
}

/// UTM campaign parameters from the URL query.
fn utm_tags(url: &str) -> UtmTags {
  let mut tags = UtmTags::default();
  let Some(parsed) = parse_url(url) else {
    return tags;
  };
  for (key, value) in parsed.query_pairs() {
    let value = value.into_owned();
    match key.as_ref() {
      "utm_source" => tags.source = Some(value),
      "utm_medium" => tags.medium = Some(value),
      "utm_campaign" => tags.campaign = Some(value),
      _ => {}
    }
  }
  tags
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::{Arc, Mutex};

  use anyhow::anyhow;
  use beacon_core::session::DeviceType;
  use beacon_fingerprint::{FeatureFlags, ScreenProbe};

  const UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) \
     Gecko/20100101 Firefox/128.0";

  /// Records every signal handed to it.
  #[derive(Clone, Default)]
  struct MockTransport {
    sent: Arc<Mutex<Vec<Signal>>>,
  }

  impl MockTransport {
    fn signals(&self) -> Vec<Signal> {
      self.sent.lock().expect("mock lock").clone()
    }
  }

  impl Transport for MockTransport {
    async fn send(&self, signal: Signal) -> anyhow::Result<()> {
      self.sent.lock().expect("mock lock").push(signal);
      Ok(())
    }

    fn enqueue(&self, signal: Signal) {
      self.sent.lock().expect("mock lock").push(signal);
    }
  }

  /// Fails every delivery.
  #[derive(Clone)]
  struct DeadTransport;

  impl Transport for DeadTransport {
    async fn send(&self, _signal: Signal) -> anyhow::Result<()> {
      Err(anyhow!("network down"))
    }

    fn enqueue(&self, _signal: Signal) {}
  }

  fn probes() -> ProbeSet {
    ProbeSet {
      screen: Some(ScreenProbe { width: 1920, height: 1080, color_depth: 24 }),
      locale:   Some("en-US".into()),
      timezone: Some("UTC".into()),
      platform: Some("Linux x86_64".into()),
      features: Some(FeatureFlags {
        local_storage:   true,
        session_storage: true,
        indexed_db:      true,
        touch_points:    0,
      }),
      canvas_digest: None,
      audio_digest:  None,
    }
  }

  fn page(url: &str) -> PageContext {
    PageContext {
      url:      url.to_owned(),
      title:    "Title".to_owned(),
      referrer: None,
    }
  }

  /// Zero throttle so scroll tests are not timing-dependent.
  fn config() -> DriverConfig {
    DriverConfig {
      scroll_throttle: Duration::ZERO,
      ..DriverConfig::default()
    }
  }

  async fn driver(
    url: &str,
  ) -> (SessionDriver<MockTransport>, MockTransport) {
    let transport = MockTransport::default();
    let driver = SessionDriver::start(
      UA,
      page(url),
      &probes(),
      transport.clone(),
      config(),
    )
    .await
    .expect("non-admin page");
    (driver, transport)
  }

  // ── Initialization ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_page_produces_no_driver_and_no_signals() {
    let transport = MockTransport::default();
    for url in ["/admin", "https://example.com/x?admin=1", "/app#admin"] {
      let driver = SessionDriver::start(
        UA,
        page(url),
        &probes(),
        transport.clone(),
        config(),
      )
      .await;
      assert!(driver.is_none(), "{url} must not start tracking");
    }
    assert!(transport.signals().is_empty());
  }

  #[tokio::test]
  async fn start_captures_page_device_and_utm() {
    let (driver, transport) = driver(
      "https://example.com/urunler?utm_source=newsletter&utm_campaign=yaz",
    )
    .await;

    let signals = transport.signals();
    assert_eq!(signals.len(), 1);
    let Signal::Start(start) = &signals[0] else {
      panic!("expected start signal");
    };
    assert_eq!(&start.session_id, driver.session_id());
    assert_eq!(start.page_path, "/urunler");
    assert_eq!(start.utm_source.as_deref(), Some("newsletter"));
    assert_eq!(start.utm_campaign.as_deref(), Some("yaz"));
    assert!(start.utm_medium.is_none());
    assert_eq!(start.device_type, DeviceType::Desktop);
    assert_eq!(start.browser, "Firefox");
    assert_eq!(start.fingerprint.as_str().len(), 32);
  }

  // ── Heartbeats ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn heartbeat_carries_counters_and_respects_visibility() {
    let (mut driver, transport) = driver("/").await;

    driver.record_click();
    driver.record_click();
    driver.record_movement();
    driver.record_scroll(140);
    driver.heartbeat().await;

    driver.set_visible(false);
    driver.heartbeat().await;

    let signals = transport.signals();
    assert_eq!(signals.len(), 2, "hidden heartbeat must be suppressed");
    let Signal::Heartbeat(hb) = &signals[1] else {
      panic!("expected heartbeat");
    };
    assert_eq!(hb.click_count, 2);
    assert_eq!(hb.movement_count, 1);
    assert_eq!(hb.scroll_percentage, 100, "scroll clamps to 100");
  }

  #[tokio::test]
  async fn scroll_sampling_is_throttled() {
    let transport = MockTransport::default();
    let mut driver = SessionDriver::start(
      UA,
      page("/"),
      &probes(),
      transport,
      DriverConfig::default(),
    )
    .await
    .expect("driver");

    driver.record_scroll(10);
    // Immediately after: inside the 100 ms throttle window, dropped.
    driver.record_scroll(90);
    assert_eq!(driver.max_scroll, 10);
  }

  // ── Page changes ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn page_change_resets_counters_and_announces_pages() {
    let (mut driver, transport) = driver("/").await;
    driver.record_click();
    driver.record_scroll(50);

    driver.page_changed("/urunler", "Ürünler").await;
    driver.heartbeat().await;

    let signals = transport.signals();
    let Signal::PageChange(change) = &signals[1] else {
      panic!("expected page change");
    };
    assert_eq!(change.previous_page, "/");
    assert_eq!(change.new_page, "/urunler");

    let Signal::Heartbeat(hb) = &signals[2] else {
      panic!("expected heartbeat");
    };
    assert_eq!(hb.page_path, "/urunler");
    assert_eq!(hb.click_count, 0);
    assert_eq!(hb.scroll_percentage, 0);
  }

  #[tokio::test]
  async fn navigating_into_admin_stops_everything_silently() {
    let (mut driver, transport) = driver("/").await;

    driver.page_changed("/admin/panel", "Yönetim").await;
    assert!(driver.is_stopped());

    // The navigation itself was announced (the engine rejects it); after
    // that, silence — not even an end signal.
    driver.heartbeat().await;
    driver.page_changed("/back-to-public", "Home").await;
    driver.end();

    let signals = transport.signals();
    assert_eq!(signals.len(), 2);
    assert!(matches!(signals[1], Signal::PageChange(_)));
  }

  // ── Termination ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn end_enqueues_final_page() {
    let (mut driver, transport) = driver("/").await;
    driver.page_changed("/iletisim", "İletişim").await;
    driver.end();

    let signals = transport.signals();
    let Signal::End(end) = signals.last().expect("end signal") else {
      panic!("expected end signal");
    };
    assert_eq!(end.final_page, "/iletisim");
  }

  // ── Failure tolerance ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn transport_failures_never_surface() {
    let mut driver = SessionDriver::start(
      UA,
      page("/"),
      &probes(),
      DeadTransport,
      config(),
    )
    .await
    .expect("driver starts even when delivery fails");

    driver.record_click();
    driver.heartbeat().await;
    driver.page_changed("/urunler", "Ürünler").await;
    driver.end();
    // Reaching this point is the assertion: nothing panicked, nothing
    // errored out of the driver API.
  }

  // ── URL helpers ───────────────────────────────────────────────────────────

  #[test]
  fn path_of_handles_full_and_relative_urls() {
    assert_eq!(path_of("https://example.com/a/b?q=1#frag"), "/a/b");
    assert_eq!(path_of("/a/b?q=1"), "/a/b");
    assert_eq!(path_of("/"), "/");
  }

  #[test]
  fn utm_tags_ignore_unrelated_params() {
    let tags = utm_tags("/x?utm_medium=email&q=admin");
    assert_eq!(tags.medium.as_deref(), Some("email"));
    assert!(tags.source.is_none());
    assert!(tags.campaign.is_none());
  }
}
