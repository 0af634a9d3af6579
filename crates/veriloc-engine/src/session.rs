//! Per-subject session state and the arena that guards it.
//!
//! The signal history and cooldown timestamp are subject-scoped mutable
//! state. The arena hands out one async-mutexed cell per subject: the outer
//! map lock is held only long enough to fetch or insert the cell, and the
//! inner lock serializes the whole verification pipeline per subject while
//! cross-subject calls stay fully parallel.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;
use veriloc_core::history::SignalHistory;

/// Mutable state for one monitored/verifying subject. Discarded when the
/// subject's session ends.
#[derive(Debug, Default)]
pub struct SubjectSession {
  pub history:          SignalHistory,
  pub last_verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SessionArena {
  inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<SubjectSession>>>>,
}

impl SessionArena {
  pub fn new() -> Self {
    Self::default()
  }

  fn map(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AsyncMutex<SubjectSession>>>> {
    // A poisoned map only means another thread panicked mid-access; the map
    // itself is still structurally sound.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// The session cell for `subject_id`, created on first use.
  pub fn session(&self, subject_id: Uuid) -> Arc<AsyncMutex<SubjectSession>> {
    self.map().entry(subject_id).or_default().clone()
  }

  /// Drop a subject's session state (history and cooldown). In-flight calls
  /// holding the cell keep their clone; new calls start fresh.
  pub fn remove(&self, subject_id: Uuid) -> bool {
    self.map().remove(&subject_id).is_some()
  }
}
