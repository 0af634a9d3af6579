//! Error types for `veriloc-engine`.
//!
//! Taxonomy: input errors (`ConsentRequired`, anything from
//! `veriloc_core::Error`) are safe to retry after remediation; transient
//! errors (`LocationUnavailable`, `PermissionDenied`, `ServiceDisabled`) are
//! retryable and never logged as fraud signals; rights-management errors
//! (`ExportFailed`, `ErasureFailed`) must be retried by the caller — partial
//! state is never acceptable.

use thiserror::Error;
use uuid::Uuid;

use crate::sources::SourceError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("consent required")]
  ConsentRequired,

  #[error("location fix unavailable")]
  LocationUnavailable,

  #[error("location permission denied")]
  PermissionDenied,

  #[error("location service disabled")]
  ServiceDisabled,

  #[error("unknown target: {0}")]
  UnknownTarget(Uuid),

  #[error("subject {0} is already being monitored")]
  AlreadyMonitoring(Uuid),

  #[error("core error: {0}")]
  Core(#[from] veriloc_core::Error),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("export failed: {0}")]
  ExportFailed(#[source] BoxError),

  #[error("erasure failed: {0}")]
  ErasureFailed(#[source] BoxError),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub(crate) fn export<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::ExportFailed(Box::new(e))
  }

  pub(crate) fn erasure<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::ErasureFailed(Box::new(e))
  }
}

impl From<SourceError> for Error {
  fn from(e: SourceError) -> Self {
    match e {
      SourceError::PermissionDenied => Self::PermissionDenied,
      SourceError::ServiceDisabled => Self::ServiceDisabled,
      SourceError::Unavailable(_) => Self::LocationUnavailable,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
