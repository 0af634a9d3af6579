//! Data-subject rights: export and erasure.
//!
//! Export is all-or-nothing — a failed sub-fetch yields `ExportFailed`, never
//! a partial bundle. Erasure deletes the personal record classes atomically
//! each, tombstones the audit trail (legal hold), and may be eventually
//! consistent across classes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use veriloc_core::{
  consent::ConsentRecord,
  record::{
    AuditDecision, AuditEntry, CachedSample, EmergencyLocationRecord,
    RecordClass, SubjectRef, VerificationResult,
  },
  store::VerificationStore,
};

use crate::{
  Error, Result, VerificationEngine,
  sources::{LocationSource, MotionSource, TargetRegistry},
};

// ─── Bundles ─────────────────────────────────────────────────────────────────

/// Everything the engine holds about one subject: all non-tombstoned records
/// plus the audit trail — including entries already tombstoned under the
/// subject's anonymization token.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectExport {
  pub subject_id:     Uuid,
  pub generated_at:   DateTime<Utc>,
  pub consents:       Vec<ConsentRecord>,
  pub results:        Vec<VerificationResult>,
  pub cached_samples: Vec<CachedSample>,
  pub emergencies:    Vec<EmergencyLocationRecord>,
  pub audit:          Vec<AuditEntry>,
}

/// What one erasure pass touched.
#[derive(Debug, Clone, Serialize)]
pub struct ErasureReport {
  pub subject_id:           Uuid,
  /// The anonymization token now carried by the subject's audit entries.
  pub token:                String,
  pub erased_at:            DateTime<Utc>,
  pub results_deleted:      usize,
  pub samples_deleted:      usize,
  pub emergencies_deleted:  usize,
  pub consents_tombstoned:  usize,
  pub audits_tombstoned:    usize,
}

// ─── Operations ──────────────────────────────────────────────────────────────

impl<S, L, R, M> VerificationEngine<S, L, R, M>
where
  S: VerificationStore + 'static,
  L: LocationSource + 'static,
  R: TargetRegistry + 'static,
  M: MotionSource + 'static,
{
  /// Aggregate all of a subject's records into one structured bundle.
  pub async fn export_subject_data(
    &self,
    subject_id: Uuid,
  ) -> Result<SubjectExport> {
    let now = Utc::now();

    let consents = self
      .store
      .consents_for_subject(subject_id)
      .await
      .map_err(Error::export)?;
    let results = self
      .store
      .results_for_subject(subject_id)
      .await
      .map_err(Error::export)?;
    let cached_samples = self
      .store
      .cached_samples_for_subject(subject_id)
      .await
      .map_err(Error::export)?;
    let emergencies = self
      .store
      .emergencies_for_subject(subject_id)
      .await
      .map_err(Error::export)?;

    let mut audit = self
      .store
      .audit_for_subject(SubjectRef::Subject(subject_id))
      .await
      .map_err(Error::export)?;

    // Entries tombstoned by an earlier erasure are reachable through the
    // recorded token and belong in the bundle too.
    let token = self
      .store
      .tombstone_token(subject_id)
      .await
      .map_err(Error::export)?;
    if let Some(token) = &token {
      audit.extend(
        self
          .store
          .audit_for_subject(SubjectRef::Anonymized(token.clone()))
          .await
          .map_err(Error::export)?,
      );
    }

    // The export itself is audited — under the token if the subject was
    // already erased, so no fresh linkage is created.
    let audit_subject = match token {
      Some(token) => SubjectRef::Anonymized(token),
      None => SubjectRef::Subject(subject_id),
    };
    self
      .store
      .append_audit(self.audit_entry(
        AuditDecision::Export,
        audit_subject,
        json!({
          "consents": consents.len(),
          "results": results.len(),
          "cached_samples": cached_samples.len(),
          "emergencies": emergencies.len(),
          "audit_entries": audit.len(),
        }),
        now,
      ))
      .await
      .map_err(Error::export)?;

    Ok(SubjectExport {
      subject_id,
      generated_at: now,
      consents,
      results,
      cached_samples,
      emergencies,
      audit,
    })
  }

  /// Erase a subject: delete the personal record classes, tombstone consent
  /// and audit records, and drop in-memory session state. Idempotent.
  pub async fn erase_subject_data(
    &self,
    subject_id: Uuid,
  ) -> Result<ErasureReport> {
    let now = Utc::now();

    // Monitoring must not keep collecting for an erased subject.
    self.stop_monitoring(subject_id).await;

    let results_deleted = self
      .store
      .purge_subject_class(subject_id, RecordClass::VerificationResult)
      .await
      .map_err(Error::erasure)?;
    let samples_deleted = self
      .store
      .purge_subject_class(subject_id, RecordClass::SampleCache)
      .await
      .map_err(Error::erasure)?;
    let emergencies_deleted = self
      .store
      .purge_subject_class(subject_id, RecordClass::EmergencyLocation)
      .await
      .map_err(Error::erasure)?;

    let consents_tombstoned = self
      .store
      .tombstone_consents(subject_id, now)
      .await
      .map_err(Error::erasure)?;

    let (token, audits_tombstoned) = self
      .store
      .tombstone_audit(subject_id)
      .await
      .map_err(Error::erasure)?;

    self
      .store
      .append_audit(self.audit_entry(
        AuditDecision::Erasure,
        SubjectRef::Anonymized(token.clone()),
        json!({
          "results": results_deleted,
          "cached_samples": samples_deleted,
          "emergencies": emergencies_deleted,
          "consents": consents_tombstoned,
          "audits_tombstoned": audits_tombstoned,
        }),
        now,
      ))
      .await
      .map_err(Error::erasure)?;

    tracing::info!(
      deleted = results_deleted + samples_deleted + emergencies_deleted,
      tombstoned = consents_tombstoned + audits_tombstoned,
      "subject data erased"
    );

    Ok(ErasureReport {
      subject_id,
      token,
      erased_at: now,
      results_deleted,
      samples_deleted,
      emergencies_deleted,
      consents_tombstoned,
      audits_tombstoned,
    })
  }
}
