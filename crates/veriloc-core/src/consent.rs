//! Consent records — the legal gate in front of all location processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The purpose a subject consented to. Closed set; each purpose is consented
/// to independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
  WorkVerification,
  ShiftMonitoring,
  EmergencyTracking,
  OrgMonitoring,
}

/// A subject's consent for one purpose. Created on explicit grant, mutated
/// only by grant/revoke, logically deleted (tombstoned) on erasure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
  pub subject_id: Uuid,
  pub purpose:    Purpose,
  pub granted:    bool,
  pub granted_at: DateTime<Utc>,
  pub expires_at: Option<DateTime<Utc>>,
  pub revoked_at: Option<DateTime<Utc>>,
}

impl ConsentRecord {
  /// Whether this record authorises processing for `purpose` at `now`.
  pub fn permits(&self, purpose: Purpose, now: DateTime<Utc>) -> bool {
    self.granted
      && self.purpose == purpose
      && self.revoked_at.is_none()
      && self.expires_at.is_none_or(|expiry| now < expiry)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn record() -> ConsentRecord {
    ConsentRecord {
      subject_id: Uuid::new_v4(),
      purpose:    Purpose::WorkVerification,
      granted:    true,
      granted_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
      expires_at: None,
      revoked_at: None,
    }
  }

  #[test]
  fn granted_consent_permits_its_purpose() {
    let now = Utc::now();
    assert!(record().permits(Purpose::WorkVerification, now));
    assert!(!record().permits(Purpose::ShiftMonitoring, now));
  }

  #[test]
  fn expired_consent_does_not_permit() {
    let mut c = record();
    c.expires_at = Some(c.granted_at + chrono::Duration::days(30));
    assert!(!c.permits(Purpose::WorkVerification, c.granted_at + chrono::Duration::days(31)));
    assert!(c.permits(Purpose::WorkVerification, c.granted_at + chrono::Duration::days(29)));
  }

  #[test]
  fn revoked_consent_does_not_permit() {
    let mut c = record();
    c.revoked_at = Some(Utc::now());
    assert!(!c.permits(Purpose::WorkVerification, Utc::now()));
  }
}
