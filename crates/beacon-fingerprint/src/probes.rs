//! Probe collection and the canonical string.
//!
//! A [`ProbeSource`] supplies raw context values fallibly; [`ProbeSet`]
//! is the assembled result with every failed probe recorded as absent.
//! The canonical string fixes field order and formatting so the digest is
//! a pure function of the probe values.

use serde::{Deserialize, Serialize};

use crate::{ProbeError, audio, raster};

// ─── Probe values ────────────────────────────────────────────────────────────

/// Display geometry and color depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenProbe {
  pub width:       u32,
  pub height:      u32,
  pub color_depth: u8,
}

/// Enabled-feature flags: storage APIs and touch support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
  pub local_storage:   bool,
  pub session_storage: bool,
  pub indexed_db:      bool,
  pub touch_points:    u8,
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Supplies raw probe inputs from the embedding context. Every method may
/// fail independently; a failure only blanks that probe's field.
pub trait ProbeSource {
  fn screen(&self) -> Result<ScreenProbe, ProbeError>;
  fn locale(&self) -> Result<String, ProbeError>;
  fn timezone(&self) -> Result<String, ProbeError>;
  fn platform(&self) -> Result<String, ProbeError>;
  fn features(&self) -> Result<FeatureFlags, ProbeError>;

  /// Seed characterising the rendering path, fed to the offscreen raster
  /// probe (see [`raster::digest`]).
  fn raster_seed(&self) -> Result<u32, ProbeError>;

  /// Seed characterising the audio processing path (see
  /// [`audio::digest`]).
  fn audio_seed(&self) -> Result<u32, ProbeError>;
}

// ─── Set ─────────────────────────────────────────────────────────────────────

/// Assembled probe values; `None` means the probe failed or is
/// unsupported in this context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSet {
  pub screen:   Option<ScreenProbe>,
  pub locale:   Option<String>,
  pub timezone: Option<String>,
  pub platform: Option<String>,
  pub features: Option<FeatureFlags>,
  pub canvas_digest: Option<String>,
  pub audio_digest:  Option<String>,
}

impl ProbeSet {
  /// Run every probe against `source`, tolerating individual failures.
  pub fn collect<E: ProbeSource>(source: &E) -> Self {
    Self {
      screen:   source.screen().ok(),
      locale:   source.locale().ok(),
      timezone: source.timezone().ok(),
      platform: source.platform().ok(),
      features: source.features().ok(),
      canvas_digest: source.raster_seed().ok().map(raster::digest),
      audio_digest:  source.audio_seed().ok().map(audio::digest),
    }
  }

  /// Fixed-order `key:value` fields joined with `|`. Absent probes
  /// contribute an empty value so the field layout never shifts.
  pub fn canonical_string(&self) -> String {
    let screen = self
      .screen
      .map(|s| format!("{}x{}x{}", s.width, s.height, s.color_depth))
      .unwrap_or_default();
    let features = self
      .features
      .map(|f| {
        format!(
          "{}{}{}-{}",
          u8::from(f.local_storage),
          u8::from(f.session_storage),
          u8::from(f.indexed_db),
          f.touch_points
        )
      })
      .unwrap_or_default();

    format!(
      "screen:{screen}|locale:{}|tz:{}|platform:{}|features:{features}|canvas:{}|audio:{}",
      self.locale.as_deref().unwrap_or(""),
      self.timezone.as_deref().unwrap_or(""),
      self.platform.as_deref().unwrap_or(""),
      self.canvas_digest.as_deref().unwrap_or(""),
      self.audio_digest.as_deref().unwrap_or(""),
    )
  }
}
