//! Audio-path probe.
//!
//! Synthesizes a short fixed oscillator burst, pushes it through a
//! soft-knee compression curve, and digests the quantized samples. As
//! with the raster probe, the host audio stack is characterised by the
//! supplied seed; the synthesis is deterministic per seed.

use sha2::{Digest as _, Sha256};

const SAMPLES: usize = 1024;
const SAMPLE_RATE: f32 = 44_100.0;

/// Render the probe burst for `seed` and return a 16-hex-char digest.
pub fn digest(seed: u32) -> String {
  let freq = 997.0 + (seed % 251) as f32;
  let drive = 1.0 + (seed % 7) as f32 * 0.25;

  let mut quantized = Vec::with_capacity(SAMPLES * 2);
  for n in 0..SAMPLES {
    let t = n as f32 / SAMPLE_RATE;
    let raw = (t * freq * std::f32::consts::TAU).sin() * drive;
    // Soft-knee compression; tanh keeps the tail differentiable the way a
    // real dynamics processor does.
    let shaped = raw.tanh();
    let q = (shaped * i16::MAX as f32) as i16;
    quantized.extend_from_slice(&q.to_le_bytes());
  }

  let mut hexed = hex::encode(Sha256::digest(&quantized));
  hexed.truncate(16);
  hexed
}
