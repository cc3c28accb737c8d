//! beacon-simulate — drive synthetic visitor sessions against a server.
//!
//! The in-repo stand-in for real browsers: each simulated session runs a
//! full driver lifecycle (start, heartbeats, navigations, unload) over
//! HTTP. Useful for demoing the dashboard and for eyeballing ingestion
//! under a bit of load.
//!
//! Runs on a current-thread runtime: like the browser driver it mimics,
//! everything is cooperative and single-threaded.

use anyhow::Result;
use beacon_client::{
  DriverConfig, HttpTransport, PageContext, SessionDriver, profile,
};
use clap::Parser;
use rand::Rng as _;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const PAGES: &[(&str, &str)] = &[
  ("/", "Anasayfa"),
  ("/urunler", "Ürünler"),
  ("/urunler/klima", "Klima Sistemleri"),
  ("/blog", "Blog"),
  ("/iletisim", "İletişim"),
];

#[derive(Parser)]
#[command(author, version, about = "Beacon traffic simulator")]
struct Cli {
  /// Base URL of the Beacon server.
  #[arg(short, long, default_value = "http://127.0.0.1:8640")]
  server: String,

  /// Number of concurrent sessions to simulate.
  #[arg(short = 'n', long, default_value_t = 4)]
  sessions: usize,

  /// Pages each session visits before unloading.
  #[arg(short, long, default_value_t = 3)]
  pages: usize,

  /// Heartbeats sent per page. The interval is compressed to 500 ms so
  /// runs finish quickly; the protocol is identical.
  #[arg(long, default_value_t = 2)]
  heartbeats_per_page: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let profiles = profile::builtin();

  let mut handles = Vec::new();
  for i in 0..cli.sessions {
    let profile = profiles[i % profiles.len()].clone();
    let transport = HttpTransport::new(&cli.server)?;
    let pages = cli.pages;
    let heartbeats = cli.heartbeats_per_page;

    handles.push(tokio::spawn(async move {
      run_session(i, profile, transport, pages, heartbeats).await;
    }));
  }

  for handle in handles {
    let _ = handle.await;
  }

  tracing::info!(sessions = cli.sessions, "simulation finished");
  Ok(())
}

async fn run_session(
  index: usize,
  profile: profile::DeviceProfile,
  transport: HttpTransport,
  pages: usize,
  heartbeats_per_page: u32,
) {
  let config = DriverConfig {
    heartbeat_interval: std::time::Duration::from_millis(500),
    ..DriverConfig::default()
  };

  let (path, title) = PAGES[index % PAGES.len()];
  let page = PageContext {
    url:      path.to_owned(),
    title:    title.to_owned(),
    referrer: Some("https://www.google.com/".to_owned()),
  };

  let Some(mut driver) =
    SessionDriver::start(profile.user_agent, page, &profile.probes, transport, config)
      .await
  else {
    return;
  };
  tracing::info!(
    session = %driver.session_id(),
    device = profile.name,
    "session started"
  );

  for hop in 0..pages {
    for _ in 0..heartbeats_per_page {
      tokio::time::sleep(driver.config().heartbeat_interval).await;
      let (clicks, scroll) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(0..3), rng.gen_range(10..=100))
      };
      for _ in 0..clicks {
        driver.record_click();
      }
      driver.record_movement();
      driver.record_scroll(scroll);
      driver.heartbeat().await;
    }

    if hop + 1 < pages {
      let (path, title) = PAGES[(index + hop + 1) % PAGES.len()];
      driver.page_changed(path, title).await;
    }
  }

  let session = driver.session_id().clone();
  driver.end();
  tracing::info!(session = %session, "session unloaded");
}
