//! [`VerificationEngine`] — the façade over the verification pipeline.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use veriloc_core::{
  consent::{ConsentRecord, Purpose},
  detector::SpoofingDetector,
  geofence::{self, GeofenceOutcome, TargetLocation},
  geometry,
  outcome::VerificationOutcome,
  record::{
    AuditDecision, AuditEntry, CachedSample, EmergencyLocationRecord,
    RecordClass, SubjectRef, VerificationResult,
  },
  store::VerificationStore,
};

use crate::{
  Error, Result,
  config::EngineConfig,
  monitor::MonitorHandle,
  privacy,
  session::SessionArena,
  sources::{LocationSource, MotionSource, NoMotion, TargetRegistry},
};

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The verification orchestrator. Cheap to clone; all state is shared.
///
/// Every verification call — request-driven or monitor-driven — goes through
/// [`VerificationEngine::verify`], which serializes per subject while
/// distinct subjects run fully in parallel.
pub struct VerificationEngine<S, L, R, M = NoMotion> {
  pub(crate) store:    Arc<S>,
  pub(crate) location: Arc<L>,
  pub(crate) registry: Arc<R>,
  pub(crate) motion:   Option<Arc<M>>,
  pub(crate) detector: SpoofingDetector,
  pub(crate) config:   Arc<EngineConfig>,
  pub(crate) sessions: Arc<SessionArena>,
  pub(crate) monitors: Arc<Mutex<HashMap<Uuid, MonitorHandle>>>,
}

// Hand-written so clones never require the backends themselves to be Clone.
impl<S, L, R, M> Clone for VerificationEngine<S, L, R, M> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      location: Arc::clone(&self.location),
      registry: Arc::clone(&self.registry),
      motion:   self.motion.clone(),
      detector: self.detector.clone(),
      config:   Arc::clone(&self.config),
      sessions: Arc::clone(&self.sessions),
      monitors: Arc::clone(&self.monitors),
    }
  }
}

impl<S, L, R> VerificationEngine<S, L, R, NoMotion> {
  /// Build an engine without a motion feed; layer 5 of the detector reports
  /// `Skipped`.
  pub fn new(
    store: Arc<S>,
    location: Arc<L>,
    registry: Arc<R>,
    config: EngineConfig,
  ) -> Self {
    Self::assemble(store, location, registry, None, config)
  }
}

impl<S, L, R, M> VerificationEngine<S, L, R, M> {
  /// Build an engine with a best-effort motion feed.
  pub fn with_motion(
    store: Arc<S>,
    location: Arc<L>,
    registry: Arc<R>,
    motion: Arc<M>,
    config: EngineConfig,
  ) -> Self {
    Self::assemble(store, location, registry, Some(motion), config)
  }

  fn assemble(
    store: Arc<S>,
    location: Arc<L>,
    registry: Arc<R>,
    motion: Option<Arc<M>>,
    config: EngineConfig,
  ) -> Self {
    Self {
      store,
      location,
      registry,
      motion,
      detector: SpoofingDetector::new(config.detector.clone()),
      config: Arc::new(config),
      sessions: Arc::new(SessionArena::new()),
      monitors: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub(crate) fn monitors_map(
    &self,
  ) -> std::sync::MutexGuard<'_, HashMap<Uuid, MonitorHandle>> {
    self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub(crate) fn audit_entry(
    &self,
    decision: AuditDecision,
    subject: SubjectRef,
    context: serde_json::Value,
    now: chrono::DateTime<Utc>,
  ) -> AuditEntry {
    AuditEntry {
      entry_id: Uuid::new_v4(),
      decision,
      subject,
      recorded_at: now,
      context,
      retain_until: self.config.retention.deadline(RecordClass::AuditEntry, now),
    }
  }
}

// ─── Verification pipeline ───────────────────────────────────────────────────

impl<S, L, R, M> VerificationEngine<S, L, R, M>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  /// Verify a subject's current position against candidate targets.
  ///
  /// Gates run in order, each fail-closed: consent, cooldown, live fix,
  /// relevance, trust, minimisation, persistence. The raw fix never
  /// survives past the minimisation step.
  pub async fn verify(
    &self,
    subject_id: Uuid,
    purpose: Purpose,
    targets: &[TargetLocation],
  ) -> Result<VerificationOutcome> {
    let cell = self.sessions.session(subject_id);
    let mut session = cell.lock().await;
    let now = Utc::now();

    // 1. Consent. No valid record: no processing, no persistence.
    let consent = self
      .store
      .consent_for(subject_id, purpose)
      .await
      .map_err(Error::store)?;
    if !consent.is_some_and(|c| c.permits(purpose, now)) {
      tracing::debug!(subject = %subject_id, "verification blocked: consent missing");
      return Ok(VerificationOutcome::ConsentRequired);
    }

    // 2. Cooldown. Bounds abuse and unnecessary location processing.
    if let Some(last) = session.last_verified_at {
      let elapsed = now - last;
      if elapsed < self.config.cooldown {
        let remaining = self.config.cooldown - elapsed;
        let remaining_seconds = (remaining.num_milliseconds() + 999) / 1000;
        return Ok(VerificationOutcome::Cooldown { remaining_seconds });
      }
    }

    // Fetch the live fix, bounded by the configured timeout.
    let sample = tokio::time::timeout(
      self.config.fix_timeout,
      self.location.current_fix(subject_id),
    )
    .await
    .map_err(|_| Error::LocationUnavailable)?
    .map_err(Error::from)?;

    let previous_captured_at = session.history.latest().map(|s| s.captured_at);
    session.history.push(sample.clone());

    // 3. Relevance. Irrelevant targets are dropped unexamined; with no
    // relevant target at all, nothing beyond the audit note is persisted.
    let relevance = geofence::evaluate(
      sample.point(),
      targets,
      self.config.relevance_threshold_m,
    )?;
    let (target_id, _raw_distance) = match relevance {
      GeofenceOutcome::NotRelevant => {
        self
          .store
          .append_audit(self.audit_entry(
            AuditDecision::NotRelevant,
            SubjectRef::Subject(subject_id),
            json!({ "purpose": purpose, "candidates": targets.len() }),
            now,
          ))
          .await
          .map_err(Error::store)?;
        session.last_verified_at = Some(now);
        return Ok(VerificationOutcome::NotRelevant);
      }
      GeofenceOutcome::Relevant { target_id, distance_m, .. } => {
        (target_id, distance_m)
      }
    };

    // 4. Trust.
    let motion_window = match (&self.motion, previous_captured_at) {
      (Some(source), Some(since)) => {
        Some(source.recent_motion(subject_id, since).await)
      }
      _ => None,
    };
    let verdict =
      self.detector.evaluate(&session.history, motion_window.as_deref());

    for failed in verdict.failed_layers() {
      tracing::warn!(subject = %subject_id, layer = ?failed, "detector layer degraded");
    }

    if !verdict.trusted {
      self
        .store
        .append_audit(self.audit_entry(
          AuditDecision::Untrusted,
          SubjectRef::Subject(subject_id),
          json!({ "purpose": purpose, "reasons": verdict.reasons }),
          now,
        ))
        .await
        .map_err(Error::store)?;
      session.last_verified_at = Some(now);
      return Ok(VerificationOutcome::Untrusted { reasons: verdict.reasons });
    }

    // 5. Minimise. Only the obfuscated sample is used from here on.
    let minimised =
      privacy::obfuscate(&sample, self.config.obfuscation_resolution_deg);
    drop(sample);

    // 6. Final proximity facts from the obfuscated sample.
    let target = targets
      .iter()
      .find(|t| t.target_id == target_id)
      .ok_or(Error::UnknownTarget(target_id))?;
    let distance =
      geometry::distance_meters(minimised.point(), target.point())?;
    let contained = distance <= target.radius_m;
    let distance_m =
      privacy::round_distance_m(distance, self.config.distance_rounding_m);
    let accuracy =
      veriloc_core::record::AccuracyBucket::from_accuracy_m(minimised.accuracy_m);

    // 7. Persist exactly one result, one cache row, one audit entry.
    let result = VerificationResult {
      result_id: Uuid::new_v4(),
      subject_id,
      target_id,
      relevant: true,
      contained,
      distance_m,
      accuracy,
      captured_at: minimised.captured_at,
      retain_until: self
        .config
        .retention
        .deadline(RecordClass::VerificationResult, now),
    };
    self
      .store
      .insert_result(result)
      .await
      .map_err(Error::store)?;

    self
      .store
      .cache_sample(CachedSample {
        sample_id: Uuid::new_v4(),
        subject_id,
        latitude: minimised.latitude,
        longitude: minimised.longitude,
        accuracy_m: minimised.accuracy_m,
        captured_at: minimised.captured_at,
        retain_until: self
          .config
          .retention
          .deadline(RecordClass::SampleCache, now),
      })
      .await
      .map_err(Error::store)?;

    self
      .store
      .append_audit(self.audit_entry(
        AuditDecision::Verified,
        SubjectRef::Subject(subject_id),
        json!({ "purpose": purpose, "target_id": target_id, "contained": contained }),
        now,
      ))
      .await
      .map_err(Error::store)?;

    session.last_verified_at = Some(now);
    tracing::debug!(
      subject = %subject_id,
      target = %target_id,
      contained,
      "verification persisted"
    );

    Ok(VerificationOutcome::Verified {
      target_id,
      contained,
      distance_m,
      accuracy,
    })
  }

  // ── Emergency recording ───────────────────────────────────────────────────

  /// Record one full-precision emergency location. Requires
  /// [`Purpose::EmergencyTracking`] consent; the only write path allowed to
  /// persist un-obfuscated coordinates.
  pub async fn record_emergency(
    &self,
    subject_id: Uuid,
  ) -> Result<EmergencyLocationRecord> {
    let now = Utc::now();

    let consent = self
      .store
      .consent_for(subject_id, Purpose::EmergencyTracking)
      .await
      .map_err(Error::store)?;
    if !consent.is_some_and(|c| c.permits(Purpose::EmergencyTracking, now)) {
      return Err(Error::ConsentRequired);
    }

    let sample = tokio::time::timeout(
      self.config.fix_timeout,
      self.location.current_fix(subject_id),
    )
    .await
    .map_err(|_| Error::LocationUnavailable)?
    .map_err(Error::from)?;

    let record = EmergencyLocationRecord {
      record_id: Uuid::new_v4(),
      subject_id,
      latitude: sample.latitude,
      longitude: sample.longitude,
      accuracy_m: sample.accuracy_m,
      captured_at: sample.captured_at,
      retain_until: self
        .config
        .retention
        .deadline(RecordClass::EmergencyLocation, now),
    };
    self
      .store
      .insert_emergency(record.clone())
      .await
      .map_err(Error::store)?;

    self
      .store
      .append_audit(self.audit_entry(
        AuditDecision::EmergencyRecorded,
        SubjectRef::Subject(subject_id),
        json!({ "provider": sample.provider }),
        now,
      ))
      .await
      .map_err(Error::store)?;

    tracing::info!(subject = %subject_id, "emergency location recorded");
    Ok(record)
  }

  // ── Consent management ────────────────────────────────────────────────────

  pub async fn grant_consent(
    &self,
    subject_id: Uuid,
    purpose: Purpose,
    expires_at: Option<chrono::DateTime<Utc>>,
  ) -> Result<ConsentRecord> {
    let now = Utc::now();
    let record = ConsentRecord {
      subject_id,
      purpose,
      granted: true,
      granted_at: now,
      expires_at,
      revoked_at: None,
    };

    self
      .store
      .grant_consent(record.clone())
      .await
      .map_err(Error::store)?;
    self
      .store
      .append_audit(self.audit_entry(
        AuditDecision::ConsentGranted,
        SubjectRef::Subject(subject_id),
        json!({ "purpose": purpose }),
        now,
      ))
      .await
      .map_err(Error::store)?;

    Ok(record)
  }

  /// Returns `true` if an active consent was revoked.
  pub async fn revoke_consent(
    &self,
    subject_id: Uuid,
    purpose: Purpose,
  ) -> Result<bool> {
    let now = Utc::now();
    let revoked = self
      .store
      .revoke_consent(subject_id, purpose, now)
      .await
      .map_err(Error::store)?;

    if revoked {
      self
        .store
        .append_audit(self.audit_entry(
          AuditDecision::ConsentRevoked,
          SubjectRef::Subject(subject_id),
          json!({ "purpose": purpose }),
          now,
        ))
        .await
        .map_err(Error::store)?;
    }

    Ok(revoked)
  }
}
