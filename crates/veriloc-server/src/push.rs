//! Push-based location source.
//!
//! The engine pulls fixes on demand; HTTP clients push them. This adapter
//! bridges the two: devices `POST` fixes per subject, and a pending
//! `current_fix` call picks up the next queued fix, waiting (bounded by the
//! engine's fetch timeout) until one arrives.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex, PoisonError},
};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Notify;
use uuid::Uuid;
use veriloc_core::sample::{LocationProvider, LocationSample};
use veriloc_engine::{LocationSource, SourceError};

use crate::error::Error;

// ─── Source ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct PushLocationSource {
  queues: Mutex<HashMap<Uuid, VecDeque<LocationSample>>>,
  notify: Notify,
}

impl PushLocationSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, subject_id: Uuid, sample: LocationSample) {
    self
      .queues
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(subject_id)
      .or_default()
      .push_back(sample);
    self.notify.notify_waiters();
  }

  fn pop(&self, subject_id: Uuid) -> Option<LocationSample> {
    self
      .queues
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get_mut(&subject_id)
      .and_then(VecDeque::pop_front)
  }
}

impl LocationSource for PushLocationSource {
  async fn current_fix(
    &self,
    subject_id: Uuid,
  ) -> Result<LocationSample, SourceError> {
    loop {
      // Register for wakeups before checking the queue, or a push landing
      // between the check and the await would be missed.
      let notified = self.notify.notified();
      if let Some(sample) = self.pop(subject_id) {
        return Ok(sample);
      }
      notified.await;
    }
  }
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /subjects/:id/fix`.
#[derive(Debug, Deserialize)]
pub struct FixBody {
  pub latitude:        f64,
  pub longitude:       f64,
  pub accuracy_m:      f64,
  pub altitude_m:      Option<f64>,
  /// Defaults to the server's receive time.
  pub captured_at:     Option<DateTime<Utc>>,
  #[serde(default)]
  pub reported_mocked: bool,
  #[serde(default)]
  pub provider:        LocationProvider,
}

/// `POST /subjects/:id/fix` — queue a device-reported fix.
pub async fn push_fix(
  State(source): State<Arc<PushLocationSource>>,
  Path(subject_id): Path<Uuid>,
  Json(body): Json<FixBody>,
) -> Result<StatusCode, Error> {
  let mut sample = LocationSample::new(
    body.latitude,
    body.longitude,
    body.accuracy_m,
    body.captured_at.unwrap_or_else(Utc::now),
  )
  .map_err(|e| Error::InvalidSample(e.to_string()))?;

  sample.altitude_m = body.altitude_m;
  sample.reported_mocked = body.reported_mocked;
  sample.provider = body.provider;

  source.push(subject_id, sample);
  Ok(StatusCode::ACCEPTED)
}
