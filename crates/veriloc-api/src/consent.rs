//! Handlers for `/consents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/consents` | Body: [`GrantBody`]; returns 201 + the record |
//! | `POST` | `/consents/revoke` | Body: [`RevokeBody`] |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use veriloc_core::{consent::Purpose, store::VerificationStore};
use veriloc_engine::{
  LocationSource, MotionSource, TargetRegistry, VerificationEngine,
};

use crate::error::ApiError;

/// JSON body accepted by `POST /consents`.
#[derive(Debug, Deserialize)]
pub struct GrantBody {
  pub subject_id: Uuid,
  pub purpose:    Purpose,
  pub expires_at: Option<DateTime<Utc>>,
}

/// `POST /consents` — returns 201 + the stored record.
pub async fn grant<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Json(body): Json<GrantBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  let record = engine
    .grant_consent(body.subject_id, body.purpose, body.expires_at)
    .await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// JSON body accepted by `POST /consents/revoke`.
#[derive(Debug, Deserialize)]
pub struct RevokeBody {
  pub subject_id: Uuid,
  pub purpose:    Purpose,
}

/// `POST /consents/revoke`
pub async fn revoke<S, L, R, M>(
  State(engine): State<VerificationEngine<S, L, R, M>>,
  Json(body): Json<RevokeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  let revoked = engine.revoke_consent(body.subject_id, body.purpose).await?;
  Ok(Json(json!({ "revoked": revoked })))
}
