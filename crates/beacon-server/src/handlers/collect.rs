//! `POST /collect` — the anonymous ingestion endpoint.
//!
//! | Signal outcome | Status |
//! |----------------|--------|
//! | accepted | `202 Accepted` |
//! | excluded path | `204 No Content` |
//! | unknown session | `404 Not Found` |
//! | ended session | `410 Gone` |
//! | malformed | `400 Bad Request` |
//! | store failure | `500` |
//!
//! The status is informational only: the client is fire-and-forget and
//! never retries. Rejections are logged here; none of them changed state.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use beacon_core::{signal::Signal, store::SessionStore};

use crate::AppState;

pub async fn ingest<S>(
  State(state): State<AppState<S>>,
  Json(signal): Json<Signal>,
) -> Response
where
  S: SessionStore + 'static,
{
  let kind = signal.discriminant();
  let session = signal.session_id().clone();

  match state.engine.process(signal).await {
    Ok(()) => StatusCode::ACCEPTED.into_response(),
    Err(beacon_engine::Error::Signal(err)) => {
      use beacon_core::Error as Core;
      let status = match &err {
        Core::ExcludedPath(_) => StatusCode::NO_CONTENT,
        Core::UnknownSession(_) => StatusCode::NOT_FOUND,
        Core::SessionEnded(_) => StatusCode::GONE,
        _ => StatusCode::BAD_REQUEST,
      };
      if matches!(err, Core::ExcludedPath(_)) {
        tracing::debug!(signal = kind, session = %session, %err, "signal filtered");
      } else {
        tracing::warn!(signal = kind, session = %session, %err, "signal rejected");
      }
      status.into_response()
    }
    Err(beacon_engine::Error::Store(err)) => {
      tracing::error!(signal = kind, session = %session, error = %err, "store failure");
      StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
  }
}
