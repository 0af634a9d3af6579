//! Persisted record types and their retention classes.
//!
//! Every record carries its retention deadline, set at creation time. The
//! Retention Manager is the only writer permitted to delete records; audit
//! entries are never deleted before their legal period elapses, only
//! tombstoned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Accuracy bucket ─────────────────────────────────────────────────────────

/// Categorical accuracy — the only accuracy information ever persisted.
/// Bucket boundaries are inclusive on the lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyBucket {
  Excellent,
  Good,
  Acceptable,
  Poor,
}

impl AccuracyBucket {
  pub fn from_accuracy_m(accuracy_m: f64) -> Self {
    if accuracy_m <= 5.0 {
      Self::Excellent
    } else if accuracy_m <= 20.0 {
      Self::Good
    } else if accuracy_m <= 50.0 {
      Self::Acceptable
    } else {
      Self::Poor
    }
  }
}

// ─── Record classes ──────────────────────────────────────────────────────────

/// The persisted record classes the Retention Manager sweeps. Retention is
/// per class, not per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordClass {
  /// Obfuscated recent-sample cache; 24 h.
  SampleCache,
  /// Verification results; 90 days.
  VerificationResult,
  /// Full-precision emergency records; 7 days.
  EmergencyLocation,
  /// Audit trail; 7 years, tombstoned on erasure but never deleted early.
  AuditEntry,
}

impl RecordClass {
  pub const ALL: [RecordClass; 4] = [
    RecordClass::SampleCache,
    RecordClass::VerificationResult,
    RecordClass::EmergencyLocation,
    RecordClass::AuditEntry,
  ];
}

// ─── Verification result ─────────────────────────────────────────────────────

/// The durable outcome of one verification call. Created once, never
/// mutated, deleted by the Retention Manager at its deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
  pub result_id:    Uuid,
  pub subject_id:   Uuid,
  pub target_id:    Uuid,
  pub relevant:     bool,
  pub contained:    bool,
  /// Rounded to the nearest 50 m; the only distance ever persisted.
  pub distance_m:   u32,
  pub accuracy:     AccuracyBucket,
  pub captured_at:  DateTime<Utc>,
  pub retain_until: DateTime<Utc>,
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
  NotRelevant,
  Untrusted,
  Verified,
  EmergencyRecorded,
  ConsentGranted,
  ConsentRevoked,
  Erasure,
  Export,
}

/// Who an audit entry is about: the subject directly, or — after erasure —
/// an opaque anonymization token that breaks the linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SubjectRef {
  Subject(Uuid),
  Anonymized(String),
}

/// Append-only audit record. Retained for the legal period regardless of
/// erasure requests; erasure replaces `subject` with an anonymized token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub entry_id:     Uuid,
  pub decision:     AuditDecision,
  pub subject:      SubjectRef,
  pub recorded_at:  DateTime<Utc>,
  /// Structured context; never contains raw coordinates.
  pub context:      serde_json::Value,
  pub retain_until: DateTime<Utc>,
}

// ─── Emergency record ────────────────────────────────────────────────────────

/// Full-precision coordinates, safety-justified exception to obfuscation.
/// Short retention; eligible for scheduled hard deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyLocationRecord {
  pub record_id:    Uuid,
  pub subject_id:   Uuid,
  pub latitude:     f64,
  pub longitude:    f64,
  pub accuracy_m:   f64,
  pub captured_at:  DateTime<Utc>,
  pub retain_until: DateTime<Utc>,
}

// ─── Sample cache ────────────────────────────────────────────────────────────

/// A cached recent fix. Coordinates are already obfuscated when this record
/// is built — the cache never holds full precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSample {
  pub sample_id:    Uuid,
  pub subject_id:   Uuid,
  pub latitude:     f64,
  pub longitude:    f64,
  pub accuracy_m:   f64,
  pub captured_at:  DateTime<Utc>,
  pub retain_until: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accuracy_bucket_boundaries_are_inclusive() {
    assert_eq!(AccuracyBucket::from_accuracy_m(3.0), AccuracyBucket::Excellent);
    assert_eq!(AccuracyBucket::from_accuracy_m(5.0), AccuracyBucket::Excellent);
    assert_eq!(AccuracyBucket::from_accuracy_m(5.1), AccuracyBucket::Good);
    assert_eq!(AccuracyBucket::from_accuracy_m(20.0), AccuracyBucket::Good);
    assert_eq!(AccuracyBucket::from_accuracy_m(50.0), AccuracyBucket::Acceptable);
    assert_eq!(AccuracyBucket::from_accuracy_m(50.001), AccuracyBucket::Poor);
  }
}
