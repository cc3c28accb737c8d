//! Fingerprint generation for Beacon.
//!
//! Derives a low-entropy, stable pseudo-identity for a browsing context
//! from device and rendering signals: probe values are assembled into a
//! canonical string and passed through SHA-256; the fingerprint is the
//! first 32 hex characters of the digest.
//!
//! Two properties, and only these two, are guaranteed:
//! - stable across reloads of the same context absent configuration
//!   changes (the generator is a pure function of its probe inputs);
//! - always returns a value — a probe that fails or is unsupported
//!   contributes an empty field instead of aborting generation.
//!
//! Uniqueness is explicitly NOT guaranteed. Collisions (two devices with
//! identical signals) and instability (a browser update shifting a raster
//! digest) are expected; nothing downstream may treat a fingerprint as a
//! security or billing boundary.

pub mod audio;
pub mod error;
pub mod probes;
pub mod raster;

pub use error::ProbeError;
pub use probes::{FeatureFlags, ProbeSet, ProbeSource, ScreenProbe};

use beacon_core::session::Fingerprint;
use sha2::{Digest as _, Sha256};

/// Length of the hex-encoded fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// Compute the fingerprint for an assembled probe set.
pub fn fingerprint(probes: &ProbeSet) -> Fingerprint {
  let canonical = probes.canonical_string();
  let digest = Sha256::digest(canonical.as_bytes());
  let mut hexed = hex::encode(digest);
  hexed.truncate(FINGERPRINT_LEN);
  Fingerprint::new(hexed)
}
