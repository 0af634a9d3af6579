//! [`SqliteStore`] — the SQLite implementation of [`VerificationStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use veriloc_core::{
  consent::{ConsentRecord, Purpose},
  record::{
    AuditEntry, CachedSample, EmergencyLocationRecord, RecordClass, SubjectRef,
    VerificationResult,
  },
  store::VerificationStore,
};

use crate::{
  Error, Result,
  encode::{
    RawAudit, RawCachedSample, RawConsent, RawEmergency, RawResult,
    encode_bucket, encode_decision, encode_dt, encode_purpose,
    encode_subject_ref, encode_uuid,
  },
  schema::SCHEMA,
  token::anonymization_token,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Veriloc store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn class_table(class: RecordClass) -> &'static str {
    match class {
      RecordClass::SampleCache => "sample_cache",
      RecordClass::VerificationResult => "verification_results",
      RecordClass::EmergencyLocation => "emergency_locations",
      RecordClass::AuditEntry => "audit_entries",
    }
  }
}

// ─── VerificationStore impl ──────────────────────────────────────────────────

impl VerificationStore for SqliteStore {
  type Error = Error;

  // ── Consent ───────────────────────────────────────────────────────────────

  async fn grant_consent(&self, record: ConsentRecord) -> Result<()> {
    let subject_str = encode_uuid(record.subject_id);
    let purpose_str = encode_purpose(record.purpose).to_owned();
    let granted_at  = encode_dt(record.granted_at);
    let expires_at  = record.expires_at.map(encode_dt);
    let revoked_at  = record.revoked_at.map(encode_dt);
    let granted     = record.granted;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO consents (
             subject_id, purpose, granted, granted_at, expires_at,
             revoked_at, tombstoned_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
           ON CONFLICT (subject_id, purpose) DO UPDATE SET
             granted       = excluded.granted,
             granted_at    = excluded.granted_at,
             expires_at    = excluded.expires_at,
             revoked_at    = excluded.revoked_at,
             tombstoned_at = NULL",
          rusqlite::params![
            subject_str,
            purpose_str,
            granted,
            granted_at,
            expires_at,
            revoked_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn revoke_consent(
    &self,
    subject_id: Uuid,
    purpose:    Purpose,
    at:         DateTime<Utc>,
  ) -> Result<bool> {
    let subject_str = encode_uuid(subject_id);
    let purpose_str = encode_purpose(purpose).to_owned();
    let at_str      = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE consents SET revoked_at = ?3
           WHERE subject_id = ?1 AND purpose = ?2
             AND revoked_at IS NULL AND tombstoned_at IS NULL",
          rusqlite::params![subject_str, purpose_str, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn consent_for(
    &self,
    subject_id: Uuid,
    purpose:    Purpose,
  ) -> Result<Option<ConsentRecord>> {
    let subject_str = encode_uuid(subject_id);
    let purpose_str = encode_purpose(purpose).to_owned();

    let raw: Option<RawConsent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subject_id, purpose, granted, granted_at, expires_at, revoked_at
             FROM consents
             WHERE subject_id = ?1 AND purpose = ?2 AND tombstoned_at IS NULL",
            rusqlite::params![subject_str, purpose_str],
            |row| {
              Ok(RawConsent {
                subject_id: row.get(0)?,
                purpose:    row.get(1)?,
                granted:    row.get(2)?,
                granted_at: row.get(3)?,
                expires_at: row.get(4)?,
                revoked_at: row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawConsent::into_consent).transpose()
  }

  async fn consents_for_subject(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<ConsentRecord>> {
    let subject_str = encode_uuid(subject_id);

    let raws: Vec<RawConsent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, purpose, granted, granted_at, expires_at, revoked_at
           FROM consents
           WHERE subject_id = ?1 AND tombstoned_at IS NULL",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], |row| {
            Ok(RawConsent {
              subject_id: row.get(0)?,
              purpose:    row.get(1)?,
              granted:    row.get(2)?,
              granted_at: row.get(3)?,
              expires_at: row.get(4)?,
              revoked_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConsent::into_consent).collect()
  }

  async fn tombstone_consents(
    &self,
    subject_id: Uuid,
    at:         DateTime<Utc>,
  ) -> Result<usize> {
    let subject_str = encode_uuid(subject_id);
    let at_str      = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE consents SET tombstoned_at = ?2
           WHERE subject_id = ?1 AND tombstoned_at IS NULL",
          rusqlite::params![subject_str, at_str],
        )?;
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(changed)
  }

  // ── Verification results ──────────────────────────────────────────────────

  async fn insert_result(&self, result: VerificationResult) -> Result<()> {
    let result_str   = encode_uuid(result.result_id);
    let subject_str  = encode_uuid(result.subject_id);
    let target_str   = encode_uuid(result.target_id);
    let accuracy_str = encode_bucket(result.accuracy).to_owned();
    let captured_str = encode_dt(result.captured_at);
    let retain_str   = encode_dt(result.retain_until);
    let relevant     = result.relevant;
    let contained    = result.contained;
    let distance     = i64::from(result.distance_m);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO verification_results (
             result_id, subject_id, target_id, relevant, contained,
             distance_m, accuracy, captured_at, retain_until
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            result_str,
            subject_str,
            target_str,
            relevant,
            contained,
            distance,
            accuracy_str,
            captured_str,
            retain_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn results_for_subject(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<VerificationResult>> {
    let subject_str = encode_uuid(subject_id);

    let raws: Vec<RawResult> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT result_id, subject_id, target_id, relevant, contained,
                  distance_m, accuracy, captured_at, retain_until
           FROM verification_results
           WHERE subject_id = ?1
           ORDER BY captured_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], |row| {
            Ok(RawResult {
              result_id:    row.get(0)?,
              subject_id:   row.get(1)?,
              target_id:    row.get(2)?,
              relevant:     row.get(3)?,
              contained:    row.get(4)?,
              distance_m:   row.get(5)?,
              accuracy:     row.get(6)?,
              captured_at:  row.get(7)?,
              retain_until: row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResult::into_result).collect()
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  async fn append_audit(&self, entry: AuditEntry) -> Result<()> {
    let entry_str    = encode_uuid(entry.entry_id);
    let decision_str = encode_decision(entry.decision).to_owned();
    let (ref_str, anonymized) = encode_subject_ref(&entry.subject);
    let recorded_str = encode_dt(entry.recorded_at);
    let context_str  = entry.context.to_string();
    let retain_str   = encode_dt(entry.retain_until);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_entries (
             entry_id, decision, subject_ref, anonymized,
             recorded_at, context, retain_until
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            entry_str,
            decision_str,
            ref_str,
            anonymized,
            recorded_str,
            context_str,
            retain_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn audit_for_subject(&self, subject: SubjectRef) -> Result<Vec<AuditEntry>> {
    let (ref_str, anonymized) = encode_subject_ref(&subject);

    let raws: Vec<RawAudit> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, decision, subject_ref, anonymized,
                  recorded_at, context, retain_until
           FROM audit_entries
           WHERE subject_ref = ?1 AND anonymized = ?2
           ORDER BY recorded_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![ref_str, anonymized], |row| {
            Ok(RawAudit {
              entry_id:     row.get(0)?,
              decision:     row.get(1)?,
              subject_ref:  row.get(2)?,
              anonymized:   row.get(3)?,
              recorded_at:  row.get(4)?,
              context:      row.get(5)?,
              retain_until: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAudit::into_entry).collect()
  }

  async fn tombstone_audit(&self, subject_id: Uuid) -> Result<(String, usize)> {
    let subject_str = encode_uuid(subject_id);
    // Generated up front; discarded if the subject already has a token.
    let fresh_token = anonymization_token(subject_id);

    let (token, rewritten) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
          .query_row(
            "SELECT token FROM erasure_tombstones WHERE subject_id = ?1",
            rusqlite::params![subject_str],
            |row| row.get(0),
          )
          .optional()?;

        let token = match existing {
          Some(t) => t,
          None => {
            tx.execute(
              "INSERT INTO erasure_tombstones (subject_id, token, erased_at)
               VALUES (?1, ?2, ?3)",
              rusqlite::params![
                subject_str,
                fresh_token,
                encode_dt(Utc::now()),
              ],
            )?;
            fresh_token
          }
        };

        let rewritten = tx.execute(
          "UPDATE audit_entries SET subject_ref = ?2, anonymized = 1
           WHERE subject_ref = ?1 AND anonymized = 0",
          rusqlite::params![subject_str, token],
        )?;

        tx.commit()?;
        Ok((token, rewritten))
      })
      .await?;

    Ok((token, rewritten))
  }

  async fn tombstone_token(&self, subject_id: Uuid) -> Result<Option<String>> {
    let subject_str = encode_uuid(subject_id);

    let token: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token FROM erasure_tombstones WHERE subject_id = ?1",
              rusqlite::params![subject_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(token)
  }

  // ── Emergency records & sample cache ──────────────────────────────────────

  async fn insert_emergency(&self, record: EmergencyLocationRecord) -> Result<()> {
    let record_str   = encode_uuid(record.record_id);
    let subject_str  = encode_uuid(record.subject_id);
    let captured_str = encode_dt(record.captured_at);
    let retain_str   = encode_dt(record.retain_until);
    let latitude     = record.latitude;
    let longitude    = record.longitude;
    let accuracy     = record.accuracy_m;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO emergency_locations (
             record_id, subject_id, latitude, longitude, accuracy_m,
             captured_at, retain_until
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            record_str,
            subject_str,
            latitude,
            longitude,
            accuracy,
            captured_str,
            retain_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn emergencies_for_subject(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<EmergencyLocationRecord>> {
    let subject_str = encode_uuid(subject_id);

    let raws: Vec<RawEmergency> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT record_id, subject_id, latitude, longitude, accuracy_m,
                  captured_at, retain_until
           FROM emergency_locations
           WHERE subject_id = ?1
           ORDER BY captured_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], |row| {
            Ok(RawEmergency {
              record_id:    row.get(0)?,
              subject_id:   row.get(1)?,
              latitude:     row.get(2)?,
              longitude:    row.get(3)?,
              accuracy_m:   row.get(4)?,
              captured_at:  row.get(5)?,
              retain_until: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEmergency::into_record).collect()
  }

  async fn cache_sample(&self, sample: CachedSample) -> Result<()> {
    let sample_str   = encode_uuid(sample.sample_id);
    let subject_str  = encode_uuid(sample.subject_id);
    let captured_str = encode_dt(sample.captured_at);
    let retain_str   = encode_dt(sample.retain_until);
    let latitude     = sample.latitude;
    let longitude    = sample.longitude;
    let accuracy     = sample.accuracy_m;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sample_cache (
             sample_id, subject_id, latitude, longitude, accuracy_m,
             captured_at, retain_until
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            sample_str,
            subject_str,
            latitude,
            longitude,
            accuracy,
            captured_str,
            retain_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn cached_samples_for_subject(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<CachedSample>> {
    let subject_str = encode_uuid(subject_id);

    let raws: Vec<RawCachedSample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT sample_id, subject_id, latitude, longitude, accuracy_m,
                  captured_at, retain_until
           FROM sample_cache
           WHERE subject_id = ?1
           ORDER BY captured_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], |row| {
            Ok(RawCachedSample {
              sample_id:    row.get(0)?,
              subject_id:   row.get(1)?,
              latitude:     row.get(2)?,
              longitude:    row.get(3)?,
              accuracy_m:   row.get(4)?,
              captured_at:  row.get(5)?,
              retain_until: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCachedSample::into_sample).collect()
  }

  // ── Retention & erasure ───────────────────────────────────────────────────

  async fn sweep_class(
    &self,
    class: RecordClass,
    now:   DateTime<Utc>,
  ) -> Result<usize> {
    let table   = Self::class_table(class);
    let now_str = encode_dt(now);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          &format!("DELETE FROM {table} WHERE retain_until <= ?1"),
          rusqlite::params![now_str],
        )?;
        if class == RecordClass::AuditEntry {
          // Mappings whose tokenised entries have all expired are no longer
          // needed to serve export requests.
          tx.execute(
            "DELETE FROM erasure_tombstones
             WHERE token NOT IN (
               SELECT subject_ref FROM audit_entries WHERE anonymized = 1
             )",
            [],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(deleted)
  }

  async fn purge_subject_class(
    &self,
    subject_id: Uuid,
    class:      RecordClass,
  ) -> Result<usize> {
    if class == RecordClass::AuditEntry {
      return Err(Error::AuditRetentionProtected);
    }

    let table       = Self::class_table(class);
    let subject_str = encode_uuid(subject_id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          &format!("DELETE FROM {table} WHERE subject_id = ?1"),
          rusqlite::params![subject_str],
        )?;
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(deleted)
  }
}
