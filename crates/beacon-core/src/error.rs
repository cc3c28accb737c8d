//! Error types for `beacon-core`.

use thiserror::Error;

use crate::session::SessionId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown session: {0}")]
  UnknownSession(SessionId),

  #[error("session {0} has already ended")]
  SessionEnded(SessionId),

  #[error("path excluded from tracking: {0:?}")]
  ExcludedPath(String),

  #[error("invalid session id: {0:?}")]
  InvalidSessionId(String),

  #[error("invalid page path: {0:?}")]
  InvalidPagePath(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
