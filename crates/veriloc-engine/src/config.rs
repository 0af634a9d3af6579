//! Engine configuration.
//!
//! The defaults are the authoritative operating values; carrying them as
//! configuration makes a calibration change a one-line edit without touching
//! pipeline logic.

use chrono::{DateTime, Utc};
use veriloc_core::{detector::DetectorConfig, record::RecordClass};

/// Retention periods per record class. The engine stamps each record's
/// deadline at creation time; the sweeper only ever reads the stored
/// deadline.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
  /// Obfuscated sample cache.
  pub sample_cache: chrono::Duration,
  /// Verification results.
  pub verification: chrono::Duration,
  /// Full-precision emergency records.
  pub emergency:    chrono::Duration,
  /// Audit trail (legal period).
  pub audit:        chrono::Duration,
}

impl Default for RetentionPolicy {
  fn default() -> Self {
    Self {
      sample_cache: chrono::Duration::hours(24),
      verification: chrono::Duration::days(90),
      emergency:    chrono::Duration::days(7),
      audit:        chrono::Duration::days(365 * 7),
    }
  }
}

impl RetentionPolicy {
  /// The retention deadline for a record of `class` created at `from`.
  pub fn deadline(&self, class: RecordClass, from: DateTime<Utc>) -> DateTime<Utc> {
    let period = match class {
      RecordClass::SampleCache => self.sample_cache,
      RecordClass::VerificationResult => self.verification,
      RecordClass::EmergencyLocation => self.emergency,
      RecordClass::AuditEntry => self.audit,
    };
    from + period
  }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Targets farther than this are never examined or logged. Meters.
  pub relevance_threshold_m:      f64,
  /// Minimum interval between processed verifications per subject.
  pub cooldown:                   chrono::Duration,
  /// Coordinate truncation resolution (~111 m at the equator). Degrees.
  pub obfuscation_resolution_deg: f64,
  /// Persisted distances are rounded to the nearest multiple of this.
  pub distance_rounding_m:        u32,
  /// Bound on the live fix fetch; expiry surfaces `LocationUnavailable`.
  pub fix_timeout:                std::time::Duration,
  /// Periodic-monitoring tick interval.
  pub monitor_interval:           std::time::Duration,
  /// Retention sweep interval.
  pub sweep_interval:             std::time::Duration,
  pub detector:                   DetectorConfig,
  pub retention:                  RetentionPolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      relevance_threshold_m:      500.0,
      cooldown:                   chrono::Duration::minutes(5),
      obfuscation_resolution_deg: 0.001,
      distance_rounding_m:        50,
      fix_timeout:                std::time::Duration::from_secs(30),
      monitor_interval:           std::time::Duration::from_secs(5 * 60),
      sweep_interval:             std::time::Duration::from_secs(60 * 60),
      detector:                   DetectorConfig::default(),
      retention:                  RetentionPolicy::default(),
    }
  }
}
