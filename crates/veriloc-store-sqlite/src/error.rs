//! Error type for `veriloc-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] veriloc_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("cannot decode stored value: {0}")]
  Decode(String),

  /// Erasure may tombstone the audit trail but never purge it — the entries
  /// are under a legal retention period.
  #[error("audit entries are retention-protected and cannot be purged")]
  AuditRetentionProtected,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
