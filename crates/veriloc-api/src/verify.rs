//! Handlers for verification and emergency recording.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/verify` | Body: [`VerifyBody`]; returns [`VerifyResponse`] |
//! | `POST` | `/subjects/:id/emergency` | 201 + the full-precision record |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veriloc_core::{
  consent::Purpose,
  geofence::TargetLocation,
  outcome::VerificationOutcome,
  record::AccuracyBucket,
  store::VerificationStore,
};
use veriloc_engine::{
  LocationSource, MotionSource, TargetRegistry, VerificationEngine,
};

use crate::error::ApiError;

// ─── Verify ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub subject_id: Uuid,
  pub purpose:    Purpose,
  /// Candidate targets, typically from the caller's site registry lookup.
  pub targets:    Vec<TargetLocation>,
}

/// The externally visible verification outcome.
///
/// Mirrors [`VerificationOutcome`] except that `Untrusted` is collapsed to a
/// bare identifier: revealing which detection layer triggered would let a
/// spoofing tool be tuned against the detector.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyResponse {
  ConsentRequired,
  Cooldown { remaining_seconds: i64 },
  NotRelevant,
  UntrustedLocation,
  Verified {
    target_id:  Uuid,
    contained:  bool,
    distance_m: u32,
    accuracy:   AccuracyBucket,
  },
}

impl From<VerificationOutcome> for VerifyResponse {
  fn from(outcome: VerificationOutcome) -> Self {
    match outcome {
      VerificationOutcome::ConsentRequired => Self::ConsentRequired,
      VerificationOutcome::Cooldown { remaining_seconds } => {
        Self::Cooldown { remaining_seconds }
      }
      VerificationOutcome::NotRelevant => Self::NotRelevant,
      VerificationOutcome::Untrusted { .. } => Self::UntrustedLocation,
      VerificationOutcome::Verified { target_id, contained, distance_m, accuracy } => {
        Self::Verified { target_id, contained, distance_m, accuracy }
      }
    }
  }
}

/// `POST /verify`
pub async fn handler<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyResponse>, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  let outcome = engine
    .verify(body.subject_id, body.purpose, &body.targets)
    .await?;
  Ok(Json(outcome.into()))
}

// ─── Emergency ────────────────────────────────────────────────────────────────

/// `POST /subjects/:id/emergency` — returns 201 + the stored record.
pub async fn emergency<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Path(subject_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  let record = engine.record_emergency(subject_id).await?;
  Ok((StatusCode::CREATED, Json(record)))
}
