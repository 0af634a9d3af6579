//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use uuid::Uuid;
use veriloc_core::{
  consent::{ConsentRecord, Purpose},
  record::{
    AccuracyBucket, AuditDecision, AuditEntry, CachedSample,
    EmergencyLocationRecord, RecordClass, SubjectRef, VerificationResult,
  },
  store::VerificationStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn consent(subject_id: Uuid, purpose: Purpose) -> ConsentRecord {
  ConsentRecord {
    subject_id,
    purpose,
    granted: true,
    granted_at: Utc::now(),
    expires_at: None,
    revoked_at: None,
  }
}

fn result(subject_id: Uuid, retain_until: chrono::DateTime<Utc>) -> VerificationResult {
  VerificationResult {
    result_id: Uuid::new_v4(),
    subject_id,
    target_id: Uuid::new_v4(),
    relevant: true,
    contained: true,
    distance_m: 50,
    accuracy: AccuracyBucket::Good,
    captured_at: Utc::now(),
    retain_until,
  }
}

fn audit(subject_id: Uuid, decision: AuditDecision) -> AuditEntry {
  AuditEntry {
    entry_id: Uuid::new_v4(),
    decision,
    subject: SubjectRef::Subject(subject_id),
    recorded_at: Utc::now(),
    context: serde_json::json!({}),
    retain_until: Utc::now() + Duration::days(365 * 7),
  }
}

fn emergency(subject_id: Uuid) -> EmergencyLocationRecord {
  EmergencyLocationRecord {
    record_id: Uuid::new_v4(),
    subject_id,
    latitude: 47.3769,
    longitude: 8.5417,
    accuracy_m: 8.0,
    captured_at: Utc::now(),
    retain_until: Utc::now() + Duration::days(7),
  }
}

fn cached(subject_id: Uuid) -> CachedSample {
  CachedSample {
    sample_id: Uuid::new_v4(),
    subject_id,
    latitude: 47.376,
    longitude: 8.541,
    accuracy_m: 12.0,
    captured_at: Utc::now(),
    retain_until: Utc::now() + Duration::hours(24),
  }
}

// ─── Consent ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn grant_and_fetch_consent() {
  let s = store().await;
  let subject = Uuid::new_v4();

  s.grant_consent(consent(subject, Purpose::WorkVerification))
    .await
    .unwrap();

  let fetched = s
    .consent_for(subject, Purpose::WorkVerification)
    .await
    .unwrap()
    .unwrap();
  assert!(fetched.granted);
  assert_eq!(fetched.purpose, Purpose::WorkVerification);

  // A different purpose has no record.
  assert!(
    s.consent_for(subject, Purpose::ShiftMonitoring)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn regrant_clears_revocation() {
  let s = store().await;
  let subject = Uuid::new_v4();

  s.grant_consent(consent(subject, Purpose::WorkVerification))
    .await
    .unwrap();
  assert!(
    s.revoke_consent(subject, Purpose::WorkVerification, Utc::now())
      .await
      .unwrap()
  );

  let revoked = s
    .consent_for(subject, Purpose::WorkVerification)
    .await
    .unwrap()
    .unwrap();
  assert!(revoked.revoked_at.is_some());

  s.grant_consent(consent(subject, Purpose::WorkVerification))
    .await
    .unwrap();
  let regranted = s
    .consent_for(subject, Purpose::WorkVerification)
    .await
    .unwrap()
    .unwrap();
  assert!(regranted.revoked_at.is_none());
}

#[tokio::test]
async fn revoke_without_grant_is_noop() {
  let s = store().await;
  let changed = s
    .revoke_consent(Uuid::new_v4(), Purpose::WorkVerification, Utc::now())
    .await
    .unwrap();
  assert!(!changed);
}

#[tokio::test]
async fn tombstoned_consents_are_invisible() {
  let s = store().await;
  let subject = Uuid::new_v4();

  s.grant_consent(consent(subject, Purpose::WorkVerification))
    .await
    .unwrap();
  s.grant_consent(consent(subject, Purpose::EmergencyTracking))
    .await
    .unwrap();

  let tombstoned = s.tombstone_consents(subject, Utc::now()).await.unwrap();
  assert_eq!(tombstoned, 2);

  assert!(
    s.consent_for(subject, Purpose::WorkVerification)
      .await
      .unwrap()
      .is_none()
  );
  assert!(s.consents_for_subject(subject).await.unwrap().is_empty());
}

// ─── Verification results ────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_fetch_result() {
  let s = store().await;
  let subject = Uuid::new_v4();

  let r = result(subject, Utc::now() + Duration::days(90));
  s.insert_result(r.clone()).await.unwrap();

  let fetched = s.results_for_subject(subject).await.unwrap();
  assert_eq!(fetched.len(), 1);
  assert_eq!(fetched[0].result_id, r.result_id);
  assert_eq!(fetched[0].distance_m, 50);
  assert_eq!(fetched[0].accuracy, AccuracyBucket::Good);
}

// ─── Audit ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_and_fetch_audit() {
  let s = store().await;
  let subject = Uuid::new_v4();

  s.append_audit(audit(subject, AuditDecision::Verified))
    .await
    .unwrap();
  s.append_audit(audit(subject, AuditDecision::NotRelevant))
    .await
    .unwrap();

  let entries = s
    .audit_for_subject(SubjectRef::Subject(subject))
    .await
    .unwrap();
  assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn tombstone_rewrites_audit_refs() {
  let s = store().await;
  let subject = Uuid::new_v4();

  s.append_audit(audit(subject, AuditDecision::Verified))
    .await
    .unwrap();
  s.append_audit(audit(subject, AuditDecision::Verified))
    .await
    .unwrap();

  let (token, rewritten) = s.tombstone_audit(subject).await.unwrap();
  assert_eq!(rewritten, 2);
  assert!(token.starts_with("anon-"));
  assert_ne!(token, subject.hyphenated().to_string());

  // Nothing left under the plain subject id.
  assert!(
    s.audit_for_subject(SubjectRef::Subject(subject))
      .await
      .unwrap()
      .is_empty()
  );

  // Both entries reachable under the token.
  let tokenised = s
    .audit_for_subject(SubjectRef::Anonymized(token.clone()))
    .await
    .unwrap();
  assert_eq!(tokenised.len(), 2);
  assert!(tokenised.iter().all(|e| e.subject == SubjectRef::Anonymized(token.clone())));

  // The mapping is queryable for later export requests.
  assert_eq!(s.tombstone_token(subject).await.unwrap(), Some(token));
}

#[tokio::test]
async fn tombstone_is_idempotent_and_reuses_token() {
  let s = store().await;
  let subject = Uuid::new_v4();

  s.append_audit(audit(subject, AuditDecision::Verified))
    .await
    .unwrap();

  let (first, _) = s.tombstone_audit(subject).await.unwrap();

  // A new entry written under the plain id afterwards (e.g. an in-flight
  // call completing) is swept under the same token on the next erasure.
  s.append_audit(audit(subject, AuditDecision::Verified))
    .await
    .unwrap();
  let (second, rewritten) = s.tombstone_audit(subject).await.unwrap();

  assert_eq!(first, second);
  assert_eq!(rewritten, 1);
}

// ─── Emergency & cache ───────────────────────────────────────────────────────

#[tokio::test]
async fn emergency_roundtrip_keeps_full_precision() {
  let s = store().await;
  let subject = Uuid::new_v4();

  let record = emergency(subject);
  s.insert_emergency(record.clone()).await.unwrap();

  let fetched = s.emergencies_for_subject(subject).await.unwrap();
  assert_eq!(fetched.len(), 1);
  assert_eq!(fetched[0].latitude, record.latitude);
  assert_eq!(fetched[0].longitude, record.longitude);
}

// ─── Retention sweep ─────────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_deletes_only_expired_records() {
  let s = store().await;
  let subject = Uuid::new_v4();
  let now = Utc::now();

  s.insert_result(result(subject, now - Duration::hours(1)))
    .await
    .unwrap();
  s.insert_result(result(subject, now + Duration::days(30)))
    .await
    .unwrap();

  let deleted = s
    .sweep_class(RecordClass::VerificationResult, now)
    .await
    .unwrap();
  assert_eq!(deleted, 1);

  let remaining = s.results_for_subject(subject).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert!(remaining[0].retain_until > now);
}

#[tokio::test]
async fn audit_sweep_prunes_orphaned_tombstone_mappings() {
  let s = store().await;
  let subject = Uuid::new_v4();

  let mut entry = audit(subject, AuditDecision::Verified);
  entry.retain_until = Utc::now() - Duration::hours(1);
  s.append_audit(entry).await.unwrap();

  let (_, rewritten) = s.tombstone_audit(subject).await.unwrap();
  assert_eq!(rewritten, 1);

  let deleted = s
    .sweep_class(RecordClass::AuditEntry, Utc::now())
    .await
    .unwrap();
  assert_eq!(deleted, 1);

  // The last tokenised entry is gone, so the mapping goes with it.
  assert!(s.tombstone_token(subject).await.unwrap().is_none());
}

// ─── Erasure ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn purge_deletes_per_class() {
  let s = store().await;
  let subject = Uuid::new_v4();
  let other = Uuid::new_v4();

  s.insert_result(result(subject, Utc::now() + Duration::days(90)))
    .await
    .unwrap();
  s.insert_result(result(other, Utc::now() + Duration::days(90)))
    .await
    .unwrap();
  s.cache_sample(cached(subject)).await.unwrap();
  s.insert_emergency(emergency(subject)).await.unwrap();

  assert_eq!(
    s.purge_subject_class(subject, RecordClass::VerificationResult)
      .await
      .unwrap(),
    1
  );
  assert_eq!(
    s.purge_subject_class(subject, RecordClass::SampleCache)
      .await
      .unwrap(),
    1
  );
  assert_eq!(
    s.purge_subject_class(subject, RecordClass::EmergencyLocation)
      .await
      .unwrap(),
    1
  );

  // Another subject's records are untouched.
  assert_eq!(s.results_for_subject(other).await.unwrap().len(), 1);
}

#[tokio::test]
async fn purging_audit_entries_is_refused() {
  let s = store().await;
  let err = s
    .purge_subject_class(Uuid::new_v4(), RecordClass::AuditEntry)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::AuditRetentionProtected));
}
