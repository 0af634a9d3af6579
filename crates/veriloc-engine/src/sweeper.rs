//! The hourly retention sweep.
//!
//! Runs decoupled from request handling. Each record class is swept in its
//! own short store transaction, so live verification calls are never blocked
//! behind a long-running batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use veriloc_core::{record::RecordClass, store::VerificationStore};

/// Per-class deletion counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepReport {
  pub sample_cache:         usize,
  pub verification_results: usize,
  pub emergency_locations:  usize,
  pub audit_entries:        usize,
}

impl SweepReport {
  pub fn total(&self) -> usize {
    self.sample_cache
      + self.verification_results
      + self.emergency_locations
      + self.audit_entries
  }
}

/// Sweep every record class once, deleting records whose retention deadline
/// is at or before `now`.
pub async fn sweep_once<S: VerificationStore>(
  store: &S,
  now: DateTime<Utc>,
) -> Result<SweepReport, S::Error> {
  Ok(SweepReport {
    sample_cache: store.sweep_class(RecordClass::SampleCache, now).await?,
    verification_results: store
      .sweep_class(RecordClass::VerificationResult, now)
      .await?,
    emergency_locations: store
      .sweep_class(RecordClass::EmergencyLocation, now)
      .await?,
    audit_entries: store.sweep_class(RecordClass::AuditEntry, now).await?,
  })
}

/// Background task driving [`sweep_once`] on a fixed interval. Started at
/// server boot, stopped at shutdown.
pub struct RetentionSweeper {
  shutdown: watch::Sender<bool>,
  task:     JoinHandle<()>,
}

impl RetentionSweeper {
  pub fn start<S>(store: Arc<S>, interval: std::time::Duration) -> Self
  where
    S: VerificationStore + 'static,
  {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
      let mut ticks = tokio::time::interval(interval);
      ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        tokio::select! {
          _ = shutdown_rx.changed() => break,
          _ = ticks.tick() => {
            match sweep_once(store.as_ref(), Utc::now()).await {
              Ok(report) if report.total() > 0 => {
                tracing::info!(
                  deleted = report.total(),
                  samples = report.sample_cache,
                  results = report.verification_results,
                  emergencies = report.emergency_locations,
                  audits = report.audit_entries,
                  "retention sweep complete"
                );
              }
              Ok(_) => {
                tracing::debug!("retention sweep complete; nothing expired");
              }
              Err(error) => {
                tracing::warn!(%error, "retention sweep failed");
              }
            }
          }
        }
      }
    });

    Self { shutdown, task }
  }

  pub async fn stop(self) {
    let _ = self.shutdown.send(true);
    let _ = self.task.await;
  }
}
