//! SQL schema for the Veriloc SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per subject/purpose pair. Grant re-grants in place; revocation and
-- erasure are recorded, never row-deleted.
CREATE TABLE IF NOT EXISTS consents (
    subject_id    TEXT NOT NULL,
    purpose       TEXT NOT NULL,    -- 'work_verification' | 'shift_monitoring'
                                    -- | 'emergency_tracking' | 'org_monitoring'
    granted       INTEGER NOT NULL,
    granted_at    TEXT NOT NULL,    -- ISO 8601 UTC
    expires_at    TEXT,
    revoked_at    TEXT,
    tombstoned_at TEXT,
    PRIMARY KEY (subject_id, purpose)
);

-- Created once per verification call; never updated. Deleted only by the
-- retention sweep or subject erasure.
CREATE TABLE IF NOT EXISTS verification_results (
    result_id    TEXT PRIMARY KEY,
    subject_id   TEXT NOT NULL,
    target_id    TEXT NOT NULL,
    relevant     INTEGER NOT NULL,
    contained    INTEGER NOT NULL,
    distance_m   INTEGER NOT NULL,  -- pre-rounded to 50 m
    accuracy     TEXT NOT NULL,     -- bucket name, not meters
    captured_at  TEXT NOT NULL,
    retain_until TEXT NOT NULL
);

-- Obfuscated recent-fix cache (0.001 deg resolution). 24 h class.
CREATE TABLE IF NOT EXISTS sample_cache (
    sample_id    TEXT PRIMARY KEY,
    subject_id   TEXT NOT NULL,
    latitude     REAL NOT NULL,
    longitude    REAL NOT NULL,
    accuracy_m   REAL NOT NULL,
    captured_at  TEXT NOT NULL,
    retain_until TEXT NOT NULL
);

-- The single full-precision table; safety exception with 7-day retention.
CREATE TABLE IF NOT EXISTS emergency_locations (
    record_id    TEXT PRIMARY KEY,
    subject_id   TEXT NOT NULL,
    latitude     REAL NOT NULL,
    longitude    REAL NOT NULL,
    accuracy_m   REAL NOT NULL,
    captured_at  TEXT NOT NULL,
    retain_until TEXT NOT NULL
);

-- Append-only. Erasure rewrites subject_ref to an anonymization token and
-- sets anonymized = 1; rows are deleted only by the sweep after the legal
-- retention period.
CREATE TABLE IF NOT EXISTS audit_entries (
    entry_id     TEXT PRIMARY KEY,
    decision     TEXT NOT NULL,
    subject_ref  TEXT NOT NULL,     -- uuid, or token once anonymized
    anonymized   INTEGER NOT NULL DEFAULT 0,
    recorded_at  TEXT NOT NULL,
    context      TEXT NOT NULL DEFAULT '{}',
    retain_until TEXT NOT NULL
);

-- Maps an erased subject to its token so later export requests can surface
-- the tombstoned audit trail. Pruned when the last tokenised entry expires.
CREATE TABLE IF NOT EXISTS erasure_tombstones (
    subject_id TEXT PRIMARY KEY,
    token      TEXT NOT NULL UNIQUE,
    erased_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS results_subject_idx   ON verification_results(subject_id);
CREATE INDEX IF NOT EXISTS results_retain_idx    ON verification_results(retain_until);
CREATE INDEX IF NOT EXISTS cache_subject_idx     ON sample_cache(subject_id);
CREATE INDEX IF NOT EXISTS cache_retain_idx      ON sample_cache(retain_until);
CREATE INDEX IF NOT EXISTS emergency_subject_idx ON emergency_locations(subject_id);
CREATE INDEX IF NOT EXISTS emergency_retain_idx  ON emergency_locations(retain_until);
CREATE INDEX IF NOT EXISTS audit_ref_idx         ON audit_entries(subject_ref);
CREATE INDEX IF NOT EXISTS audit_retain_idx      ON audit_entries(retain_until);

PRAGMA user_version = 1;
";
