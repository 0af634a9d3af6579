//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": "<locale-neutral identifier>"}`.
//! Trust-related detail is deliberately withheld from response bodies.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use veriloc_engine::Error as EngineError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = match &self {
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      ApiError::Engine(e) => match e {
        EngineError::ConsentRequired => {
          (StatusCode::FORBIDDEN, "consent_required")
        }
        EngineError::LocationUnavailable => {
          (StatusCode::SERVICE_UNAVAILABLE, "location_unavailable")
        }
        EngineError::PermissionDenied => {
          (StatusCode::SERVICE_UNAVAILABLE, "location_permission_denied")
        }
        EngineError::ServiceDisabled => {
          (StatusCode::SERVICE_UNAVAILABLE, "location_service_disabled")
        }
        EngineError::UnknownTarget(_) => {
          (StatusCode::NOT_FOUND, "unknown_target")
        }
        EngineError::AlreadyMonitoring(_) => {
          (StatusCode::CONFLICT, "already_monitoring")
        }
        EngineError::Core(veriloc_core::Error::InvalidCoordinate { .. }) => {
          (StatusCode::BAD_REQUEST, "invalid_coordinate")
        }
        EngineError::Core(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        EngineError::Store(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "storage_failure")
        }
        EngineError::ExportFailed(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "export_failed")
        }
        EngineError::ErasureFailed(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "erasure_failed")
        }
      },
    };

    (status, Json(json!({ "error": code }))).into_response()
  }
}
