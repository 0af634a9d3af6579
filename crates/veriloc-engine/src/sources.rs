//! Collaborator traits: the live position source, the optional motion feed,
//! and the site registry.
//!
//! All are injected into the engine at construction. The motion feed is
//! best-effort — the engine is fully specified without it.

use std::{collections::HashMap, future::Future};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;
use veriloc_core::{
  geofence::TargetLocation,
  sample::{LocationSample, MotionSample},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Transient faults from the position source. Surfaced to callers as
/// retryable errors; never treated as fraud signals.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
  #[error("location permission denied")]
  PermissionDenied,

  #[error("location service disabled")]
  ServiceDisabled,

  #[error("no fix available: {0}")]
  Unavailable(String),
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A live position source. Fetching a fix is the engine's primary blocking
/// operation; the engine bounds every call with its configured timeout.
pub trait LocationSource: Send + Sync {
  fn current_fix(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<LocationSample, SourceError>> + Send + '_;
}

/// An optional motion-sensor feed. Infallible by contract: a feed with no
/// data simply returns an empty window.
pub trait MotionSource: Send + Sync {
  fn recent_motion(
    &self,
    subject_id: Uuid,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Vec<MotionSample>> + Send + '_;
}

/// The site registry: read-only [`TargetLocation`] lookups.
pub trait TargetRegistry: Send + Sync {
  fn target(
    &self,
    target_id: Uuid,
  ) -> impl Future<Output = Option<TargetLocation>> + Send + '_;
}

// ─── Stock implementations ───────────────────────────────────────────────────

/// The "no motion feed" collaborator; placeholder type for engines built
/// without one. Never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMotion;

impl MotionSource for NoMotion {
  async fn recent_motion(&self, _subject_id: Uuid, _since: DateTime<Utc>) -> Vec<MotionSample> {
    Vec::new()
  }
}

/// An in-memory registry over a fixed site list (e.g. from server config).
#[derive(Debug, Clone, Default)]
pub struct StaticTargetRegistry {
  targets: HashMap<Uuid, TargetLocation>,
}

impl StaticTargetRegistry {
  pub fn new(targets: impl IntoIterator<Item = TargetLocation>) -> Self {
    Self {
      targets: targets.into_iter().map(|t| (t.target_id, t)).collect(),
    }
  }
}

impl TargetRegistry for StaticTargetRegistry {
  async fn target(&self, target_id: Uuid) -> Option<TargetLocation> {
    self.targets.get(&target_id).cloned()
  }
}
