//! Handlers for the monitoring lifecycle.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects/:id/monitoring/start` | Body: [`StartBody`] |
//! | `POST` | `/subjects/:id/monitoring/stop` | Clears session state |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use veriloc_core::store::VerificationStore;
use veriloc_engine::{
  LocationSource, MotionSource, TargetRegistry, VerificationEngine,
};

use crate::error::ApiError;

/// JSON body accepted by `POST /subjects/:id/monitoring/start`.
#[derive(Debug, Deserialize)]
pub struct StartBody {
  pub target_id: Uuid,
}

/// `POST /subjects/:id/monitoring/start`
pub async fn start<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Path(subject_id): Path<Uuid>,
  Json(body): Json<StartBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  engine.start_monitoring(subject_id, body.target_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /subjects/:id/monitoring/stop`
pub async fn stop<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Path(subject_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  let stopped = engine.stop_monitoring(subject_id).await;
  Ok(Json(json!({ "stopped": stopped })))
}
