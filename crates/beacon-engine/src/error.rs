//! Error type for `beacon-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A signal was rejected: malformed, unknown session, ended session, or
  /// an excluded path. Rejections never change state.
  #[error(transparent)]
  Signal(#[from] beacon_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
