//! Probe failure type.

use thiserror::Error;

/// A single probe failed or is unsupported in this context. Never fatal:
/// the probe's contribution degrades to "absent".
#[derive(Debug, Clone, Error)]
#[error("probe failed: {0}")]
pub struct ProbeError(pub String);

impl ProbeError {
  pub fn unsupported(what: &str) -> Self {
    Self(format!("{what} unsupported"))
  }
}
