//! Handlers for data-subject rights.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/subjects/:id/export` | Full structured bundle, all-or-nothing |
//! | `DELETE` | `/subjects/:id` | Erasure; audit trail is tombstoned, not deleted |

use axum::{
  Json,
  extract::{Path, State},
};
use uuid::Uuid;
use veriloc_core::store::VerificationStore;
use veriloc_engine::{
  ErasureReport, LocationSource, MotionSource, SubjectExport, TargetRegistry,
  VerificationEngine,
};

use crate::error::ApiError;

/// `GET /subjects/:id/export`
pub async fn export<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<SubjectExport>, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  Ok(Json(engine.export_subject_data(subject_id).await?))
}

/// `DELETE /subjects/:id`
pub async fn erase<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<ErasureReport>, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  Ok(Json(engine.erase_subject_data(subject_id).await?))
}
