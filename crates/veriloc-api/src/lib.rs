//! JSON REST API for the Veriloc engine.
//!
//! Exposes an axum [`Router`] over a [`VerificationEngine`] with any
//! storage backend. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! All error identifiers returned to callers are locale-neutral snake_case
//! strings; presentation-layer localization is out of scope.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", veriloc_api::api_router(engine.clone()))
//! ```

pub mod consent;
pub mod error;
pub mod monitoring;
pub mod rights;
pub mod verify;

use axum::{
  Router,
  routing::{delete, get, post},
};
use veriloc_core::store::VerificationStore;
use veriloc_engine::{
  LocationSource, MotionSource, TargetRegistry, VerificationEngine,
};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, L, R, M>(engine: VerificationEngine<S, L, R, M>) -> Router<()>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  Router::new()
    // Verification
    .route("/verify", post(verify::handler::<S, L, R, M>))
    .route("/subjects/{id}/emergency", post(verify::emergency::<S, L, R, M>))
    // Monitoring lifecycle
    .route(
      "/subjects/{id}/monitoring/start",
      post(monitoring::start::<S, L, R, M>),
    )
    .route(
      "/subjects/{id}/monitoring/stop",
      post(monitoring::stop::<S, L, R, M>),
    )
    // Data-subject rights
    .route("/subjects/{id}/export", get(rights::export::<S, L, R, M>))
    .route("/subjects/{id}", delete(rights::erase::<S, L, R, M>))
    // Consent
    .route("/consents", post(consent::grant::<S, L, R, M>))
    .route("/consents/revoke", post(consent::revoke::<S, L, R, M>))
    .with_state(engine)
}
