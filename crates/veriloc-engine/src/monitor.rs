//! Periodic monitoring: one cancellable task per monitored subject.
//!
//! Monitor ticks go through the same serialized [`verify`] entry point as
//! request-driven calls, so the two call sites can never race on a subject's
//! history buffer or cooldown state. Shutdown is signalled over a `watch`
//! channel rather than aborting the task, so an in-flight verification
//! completes before the loop exits.
//!
//! [`verify`]: crate::VerificationEngine::verify

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use uuid::Uuid;
use veriloc_core::{consent::Purpose, store::VerificationStore};

use crate::{
  Error, Result, VerificationEngine,
  sources::{LocationSource, MotionSource, TargetRegistry},
};

pub(crate) struct MonitorHandle {
  shutdown: watch::Sender<bool>,
  task:     JoinHandle<()>,
}

impl<S, L, R, M> VerificationEngine<S, L, R, M>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  /// Start periodic monitoring of `subject_id` against `target_id`.
  ///
  /// The target is resolved through the site registry once, at start.
  /// Errors with [`Error::AlreadyMonitoring`] if a monitor is active; stop
  /// it first to change targets.
  pub async fn start_monitoring(
    &self,
    subject_id: Uuid,
    target_id: Uuid,
  ) -> Result<()> {
    let target = self
      .registry
      .target(target_id)
      .await
      .ok_or(Error::UnknownTarget(target_id))?;

    let mut monitors = self.monitors_map();
    if monitors.contains_key(&subject_id) {
      return Err(Error::AlreadyMonitoring(subject_id));
    }

    let engine = self.clone();
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let interval = self.config.monitor_interval;

    let task = tokio::spawn(async move {
      let mut ticks = tokio::time::interval(interval);
      ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        tokio::select! {
          _ = shutdown_rx.changed() => break,
          _ = ticks.tick() => {
            let result = engine
              .verify(
                subject_id,
                Purpose::ShiftMonitoring,
                std::slice::from_ref(&target),
              )
              .await;
            match result {
              Ok(outcome) => {
                tracing::debug!(subject = %subject_id, ?outcome, "monitoring tick");
              }
              Err(error) => {
                tracing::warn!(subject = %subject_id, %error, "monitoring tick failed");
              }
            }
          }
        }
      }
      tracing::debug!(subject = %subject_id, "monitoring stopped");
    });

    monitors.insert(subject_id, MonitorHandle { shutdown, task });
    tracing::info!(subject = %subject_id, target = %target_id, "monitoring started");
    Ok(())
  }

  /// Stop periodic monitoring and release the subject's session state
  /// (signal history and cooldown). Returns `false` if the subject was not
  /// being monitored; the session state is cleared either way.
  pub async fn stop_monitoring(&self, subject_id: Uuid) -> bool {
    let handle = self.monitors_map().remove(&subject_id);
    let was_monitoring = handle.is_some();

    if let Some(handle) = handle {
      let _ = handle.shutdown.send(true);
      // Wait for an in-flight verification to finish cleanly.
      let _ = handle.task.await;
    }

    self.sessions.remove(subject_id);
    was_monitoring
  }
}
