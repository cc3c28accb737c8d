//! Signal delivery.
//!
//! [`Transport::send`] is the ordinary fire-and-forget path; the driver
//! awaits it only to log failures. [`Transport::enqueue`] is the
//! unload-time path: it must complete its enqueue synchronously (the
//! context may be torn down immediately after) and offers no delivery
//! confirmation — the analogue of a beacon send from a closing tab.

use std::{future::Future, time::Duration};

use anyhow::{Context as _, Result, anyhow};
use beacon_core::signal::Signal;
use reqwest::Client;

pub trait Transport: Send + Sync {
  /// Deliver one signal. Failures are the caller's to log and forget.
  fn send(&self, signal: Signal) -> impl Future<Output = Result<()>> + Send;

  /// Synchronously hand off a signal for best-effort background
  /// delivery. No confirmation, no error.
  fn enqueue(&self, signal: Signal);
}

// ─── HTTP transport ──────────────────────────────────────────────────────────

/// Delivers signals to a Beacon server's `/collect` endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpTransport {
  client:      Client,
  collect_url: String,
}

impl HttpTransport {
  pub fn new(base_url: &str) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      collect_url: format!("{}/collect", base_url.trim_end_matches('/')),
    })
  }
}

impl Transport for HttpTransport {
  async fn send(&self, signal: Signal) -> Result<()> {
    let resp = self
      .client
      .post(&self.collect_url)
      .json(&signal)
      .send()
      .await
      .context("POST /collect failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /collect → {}", resp.status()));
    }
    Ok(())
  }

  fn enqueue(&self, signal: Signal) {
    let transport = self.clone();
    // The spawn itself is the synchronous enqueue; delivery happens (or
    // doesn't) after this call returns.
    tokio::spawn(async move {
      if let Err(e) = transport.send(signal).await {
        tracing::debug!(error = %e, "unload signal dropped");
      }
    });
  }
}
