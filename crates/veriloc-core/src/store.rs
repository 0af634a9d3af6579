//! The `VerificationStore` trait.
//!
//! Implemented by storage backends (e.g. `veriloc-store-sqlite`). Higher
//! layers (`veriloc-engine`, `veriloc-api`) depend on this abstraction, not
//! on any concrete backend.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  consent::{ConsentRecord, Purpose},
  record::{
    AuditEntry, CachedSample, EmergencyLocationRecord, RecordClass, SubjectRef,
    VerificationResult,
  },
};

/// Abstraction over a Veriloc storage backend.
///
/// Writes to records are append-only except for the narrow mutations the
/// data model allows: consent grant/revoke, consent tombstoning, and audit
/// tombstoning. Deletion happens only through `sweep_class` (retention) and
/// `purge_subject_class` (erasure).
pub trait VerificationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Consent ───────────────────────────────────────────────────────────

  /// Record (or re-grant) consent for one subject/purpose pair.
  fn grant_consent(
    &self,
    record: ConsentRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Revoke consent; returns `true` if an active record was revoked.
  fn revoke_consent(
    &self,
    subject_id: Uuid,
    purpose: Purpose,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The current (non-tombstoned) consent record for a subject/purpose.
  fn consent_for(
    &self,
    subject_id: Uuid,
    purpose: Purpose,
  ) -> impl Future<Output = Result<Option<ConsentRecord>, Self::Error>> + Send + '_;

  /// All non-tombstoned consent records for a subject.
  fn consents_for_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ConsentRecord>, Self::Error>> + Send + '_;

  /// Logically delete all of a subject's consent records (erasure).
  /// Returns the number of records tombstoned. Atomic.
  fn tombstone_consents(
    &self,
    subject_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Verification results ──────────────────────────────────────────────

  fn insert_result(
    &self,
    result: VerificationResult,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn results_for_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<VerificationResult>, Self::Error>> + Send + '_;

  // ── Audit trail ───────────────────────────────────────────────────────

  fn append_audit(
    &self,
    entry: AuditEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All audit entries referencing `subject` (plain id or token).
  fn audit_for_subject(
    &self,
    subject: SubjectRef,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;

  /// Replace the subject id on all of a subject's audit entries with an
  /// anonymization token, recording the mapping for later export requests.
  /// Reuses the existing token if the subject was already erased once.
  /// Returns `(token, entries_rewritten)`. Atomic.
  fn tombstone_audit(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<(String, usize), Self::Error>> + Send + '_;

  /// The anonymization token recorded for a previously erased subject.
  fn tombstone_token(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  // ── Emergency records & sample cache ──────────────────────────────────

  fn insert_emergency(
    &self,
    record: EmergencyLocationRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn emergencies_for_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<EmergencyLocationRecord>, Self::Error>> + Send + '_;

  fn cache_sample(
    &self,
    sample: CachedSample,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn cached_samples_for_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CachedSample>, Self::Error>> + Send + '_;

  // ── Retention & erasure ───────────────────────────────────────────────

  /// Delete every record of `class` whose retention deadline is at or
  /// before `now`. Returns the number deleted. Runs as one short
  /// transaction so it never starves live verification traffic.
  fn sweep_class(
    &self,
    class: RecordClass,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Delete every record of `class` belonging to `subject_id` (erasure).
  /// All-or-nothing within the class. Must refuse
  /// [`RecordClass::AuditEntry`] — the audit trail is tombstoned, never
  /// purged before its legal period.
  fn purge_subject_class(
    &self,
    subject_id: Uuid,
    class: RecordClass,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
