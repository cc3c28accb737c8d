//! Offscreen raster probe.
//!
//! Draws a short deterministic scene — a gradient wash with a row of
//! pseudo-glyph boxes, alpha-blended in floating point — into an RGBA
//! buffer and digests the pixels. In a browser the interesting entropy
//! comes from the host's rendering stack; here that stack is
//! characterised by the `seed` the probe source supplies, and the drawing
//! itself is a pure function so the digest is stable for a given seed.

use sha2::{Digest as _, Sha256};

const WIDTH: usize = 64;
const HEIGHT: usize = 16;

/// Render the probe scene for `seed` and return a 16-hex-char digest of
/// the pixel buffer.
pub fn digest(seed: u32) -> String {
  let mut pixels = vec![0u8; WIDTH * HEIGHT * 4];

  // Background gradient, phase-shifted by the seed.
  for y in 0..HEIGHT {
    for x in 0..WIDTH {
      let i = (y * WIDTH + x) * 4;
      pixels[i] = ((x as u32 * 4 + seed) % 256) as u8;
      pixels[i + 1] = ((y as u32 * 16 + seed / 3) % 256) as u8;
      pixels[i + 2] = ((x as u32 ^ y as u32).wrapping_mul(seed | 1) % 256) as u8;
      pixels[i + 3] = 255;
    }
  }

  // A row of glyph-like boxes blended over the gradient. The blend runs
  // through f32 so rounding behaves like a real compositor.
  let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
  for g in 0..6 {
    state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    let x0 = 2 + g * 10 + (state % 3) as usize;
    let alpha = 0.35 + (state >> 8 & 0x3f) as f32 / 128.0;
    for y in 3..HEIGHT - 3 {
      for x in x0..(x0 + 6).min(WIDTH) {
        let i = (y * WIDTH + x) * 4;
        for c in 0..3 {
          let base = pixels[i + c] as f32;
          let ink = ((g * 40) as f32 + (c * 70) as f32) % 255.0;
          pixels[i + c] = (base * (1.0 - alpha) + ink * alpha).round() as u8;
        }
      }
    }
  }

  let mut hexed = hex::encode(Sha256::digest(&pixels));
  hexed.truncate(16);
  hexed
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_seed_same_digest() {
    assert_eq!(digest(42), digest(42));
  }

  #[test]
  fn different_seeds_differ() {
    assert_ne!(digest(1), digest(2));
  }

  #[test]
  fn digest_is_16_hex_chars() {
    let d = digest(0);
    assert_eq!(d.len(), 16);
    assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
