//! Built-in device profiles for the traffic simulator.
//!
//! Each profile stands in for one physical device: a user-agent string
//! plus the probe values that device would report. Two simulated tabs on
//! the same profile therefore share a fingerprint, exactly like two real
//! tabs on one machine.

use beacon_fingerprint::{FeatureFlags, ProbeSet, ScreenProbe, audio, raster};

#[derive(Debug, Clone)]
pub struct DeviceProfile {
  pub name:       &'static str,
  pub user_agent: &'static str,
  pub probes:     ProbeSet,
}

pub fn builtin() -> Vec<DeviceProfile> {
  vec![
    DeviceProfile {
      name:       "linux-firefox",
      user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) \
         Gecko/20100101 Firefox/128.0",
      probes: probes(
        ScreenProbe { width: 1920, height: 1080, color_depth: 24 },
        "en-US",
        "Linux x86_64",
        0,
        11,
      ),
    },
    DeviceProfile {
      name:       "windows-chrome",
      user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 \
         Safari/537.36",
      probes: probes(
        ScreenProbe { width: 2560, height: 1440, color_depth: 24 },
        "tr-TR",
        "Win32",
        0,
        23,
      ),
    },
    DeviceProfile {
      name:       "iphone-safari",
      user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 \
         Mobile/15E148 Safari/604.1",
      probes: probes(
        ScreenProbe { width: 390, height: 844, color_depth: 32 },
        "tr-TR",
        "iPhone",
        5,
        37,
      ),
    },
    DeviceProfile {
      name:       "android-chrome",
      user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile \
         Safari/537.36",
      probes: probes(
        ScreenProbe { width: 412, height: 915, color_depth: 24 },
        "tr-TR",
        "Linux armv8l",
        5,
        41,
      ),
    },
  ]
}

fn probes(
  screen: ScreenProbe,
  locale: &str,
  platform: &str,
  touch_points: u8,
  render_seed: u32,
) -> ProbeSet {
  ProbeSet {
    screen: Some(screen),
    locale:   Some(locale.to_owned()),
    timezone: Some("Europe/Istanbul".to_owned()),
    platform: Some(platform.to_owned()),
    features: Some(FeatureFlags {
      local_storage:   true,
      session_storage: true,
      indexed_db:      true,
      touch_points,
    }),
    canvas_digest: Some(raster::digest(render_seed)),
    audio_digest:  Some(audio::digest(render_seed)),
  }
}
