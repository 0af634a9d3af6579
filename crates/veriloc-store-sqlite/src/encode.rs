//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Closed enums are stored as their snake_case
//! discriminants; audit context is compact JSON.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use veriloc_core::{
  consent::{ConsentRecord, Purpose},
  record::{
    AccuracyBucket, AuditDecision, AuditEntry, CachedSample,
    EmergencyLocationRecord, SubjectRef, VerificationResult,
  },
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Purpose ─────────────────────────────────────────────────────────────────

pub fn encode_purpose(p: Purpose) -> &'static str {
  match p {
    Purpose::WorkVerification => "work_verification",
    Purpose::ShiftMonitoring => "shift_monitoring",
    Purpose::EmergencyTracking => "emergency_tracking",
    Purpose::OrgMonitoring => "org_monitoring",
  }
}

pub fn decode_purpose(s: &str) -> Result<Purpose> {
  match s {
    "work_verification" => Ok(Purpose::WorkVerification),
    "shift_monitoring" => Ok(Purpose::ShiftMonitoring),
    "emergency_tracking" => Ok(Purpose::EmergencyTracking),
    "org_monitoring" => Ok(Purpose::OrgMonitoring),
    other => Err(Error::Decode(format!("unknown purpose: {other:?}"))),
  }
}

// ─── AccuracyBucket ──────────────────────────────────────────────────────────

pub fn encode_bucket(b: AccuracyBucket) -> &'static str {
  match b {
    AccuracyBucket::Excellent => "excellent",
    AccuracyBucket::Good => "good",
    AccuracyBucket::Acceptable => "acceptable",
    AccuracyBucket::Poor => "poor",
  }
}

pub fn decode_bucket(s: &str) -> Result<AccuracyBucket> {
  match s {
    "excellent" => Ok(AccuracyBucket::Excellent),
    "good" => Ok(AccuracyBucket::Good),
    "acceptable" => Ok(AccuracyBucket::Acceptable),
    "poor" => Ok(AccuracyBucket::Poor),
    other => Err(Error::Decode(format!("unknown accuracy bucket: {other:?}"))),
  }
}

// ─── AuditDecision ───────────────────────────────────────────────────────────

pub fn encode_decision(d: AuditDecision) -> &'static str {
  match d {
    AuditDecision::NotRelevant => "not_relevant",
    AuditDecision::Untrusted => "untrusted",
    AuditDecision::Verified => "verified",
    AuditDecision::EmergencyRecorded => "emergency_recorded",
    AuditDecision::ConsentGranted => "consent_granted",
    AuditDecision::ConsentRevoked => "consent_revoked",
    AuditDecision::Erasure => "erasure",
    AuditDecision::Export => "export",
  }
}

pub fn decode_decision(s: &str) -> Result<AuditDecision> {
  match s {
    "not_relevant" => Ok(AuditDecision::NotRelevant),
    "untrusted" => Ok(AuditDecision::Untrusted),
    "verified" => Ok(AuditDecision::Verified),
    "emergency_recorded" => Ok(AuditDecision::EmergencyRecorded),
    "consent_granted" => Ok(AuditDecision::ConsentGranted),
    "consent_revoked" => Ok(AuditDecision::ConsentRevoked),
    "erasure" => Ok(AuditDecision::Erasure),
    "export" => Ok(AuditDecision::Export),
    other => Err(Error::Decode(format!("unknown audit decision: {other:?}"))),
  }
}

// ─── SubjectRef ──────────────────────────────────────────────────────────────

/// `(subject_ref, anonymized)` column pair.
pub fn encode_subject_ref(r: &SubjectRef) -> (String, bool) {
  match r {
    SubjectRef::Subject(id) => (encode_uuid(*id), false),
    SubjectRef::Anonymized(token) => (token.clone(), true),
  }
}

pub fn decode_subject_ref(s: &str, anonymized: bool) -> Result<SubjectRef> {
  if anonymized {
    Ok(SubjectRef::Anonymized(s.to_owned()))
  } else {
    Ok(SubjectRef::Subject(decode_uuid(s)?))
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `consents` row.
pub struct RawConsent {
  pub subject_id: String,
  pub purpose:    String,
  pub granted:    bool,
  pub granted_at: String,
  pub expires_at: Option<String>,
  pub revoked_at: Option<String>,
}

impl RawConsent {
  pub fn into_consent(self) -> Result<ConsentRecord> {
    Ok(ConsentRecord {
      subject_id: decode_uuid(&self.subject_id)?,
      purpose:    decode_purpose(&self.purpose)?,
      granted:    self.granted,
      granted_at: decode_dt(&self.granted_at)?,
      expires_at: self.expires_at.as_deref().map(decode_dt).transpose()?,
      revoked_at: self.revoked_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `verification_results` row.
pub struct RawResult {
  pub result_id:    String,
  pub subject_id:   String,
  pub target_id:    String,
  pub relevant:     bool,
  pub contained:    bool,
  pub distance_m:   i64,
  pub accuracy:     String,
  pub captured_at:  String,
  pub retain_until: String,
}

impl RawResult {
  pub fn into_result(self) -> Result<VerificationResult> {
    Ok(VerificationResult {
      result_id:    decode_uuid(&self.result_id)?,
      subject_id:   decode_uuid(&self.subject_id)?,
      target_id:    decode_uuid(&self.target_id)?,
      relevant:     self.relevant,
      contained:    self.contained,
      distance_m:   u32::try_from(self.distance_m)
        .map_err(|_| Error::Decode(format!("negative distance: {}", self.distance_m)))?,
      accuracy:     decode_bucket(&self.accuracy)?,
      captured_at:  decode_dt(&self.captured_at)?,
      retain_until: decode_dt(&self.retain_until)?,
    })
  }
}

/// Raw strings read directly from an `audit_entries` row.
pub struct RawAudit {
  pub entry_id:     String,
  pub decision:     String,
  pub subject_ref:  String,
  pub anonymized:   bool,
  pub recorded_at:  String,
  pub context:      String,
  pub retain_until: String,
}

impl RawAudit {
  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      entry_id:     decode_uuid(&self.entry_id)?,
      decision:     decode_decision(&self.decision)?,
      subject:      decode_subject_ref(&self.subject_ref, self.anonymized)?,
      recorded_at:  decode_dt(&self.recorded_at)?,
      context:      serde_json::from_str(&self.context)?,
      retain_until: decode_dt(&self.retain_until)?,
    })
  }
}

/// Raw strings read directly from an `emergency_locations` row.
pub struct RawEmergency {
  pub record_id:    String,
  pub subject_id:   String,
  pub latitude:     f64,
  pub longitude:    f64,
  pub accuracy_m:   f64,
  pub captured_at:  String,
  pub retain_until: String,
}

impl RawEmergency {
  pub fn into_record(self) -> Result<EmergencyLocationRecord> {
    Ok(EmergencyLocationRecord {
      record_id:    decode_uuid(&self.record_id)?,
      subject_id:   decode_uuid(&self.subject_id)?,
      latitude:     self.latitude,
      longitude:    self.longitude,
      accuracy_m:   self.accuracy_m,
      captured_at:  decode_dt(&self.captured_at)?,
      retain_until: decode_dt(&self.retain_until)?,
    })
  }
}

/// Raw strings read directly from a `sample_cache` row.
pub struct RawCachedSample {
  pub sample_id:    String,
  pub subject_id:   String,
  pub latitude:     f64,
  pub longitude:    f64,
  pub accuracy_m:   f64,
  pub captured_at:  String,
  pub retain_until: String,
}

impl RawCachedSample {
  pub fn into_sample(self) -> Result<CachedSample> {
    Ok(CachedSample {
      sample_id:    decode_uuid(&self.sample_id)?,
      subject_id:   decode_uuid(&self.subject_id)?,
      latitude:     self.latitude,
      longitude:    self.longitude,
      accuracy_m:   self.accuracy_m,
      captured_at:  decode_dt(&self.captured_at)?,
      retain_until: decode_dt(&self.retain_until)?,
    })
  }
}
