//! The engine's answer to one verification request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{detector::ReasonCode, record::AccuracyBucket};

/// One of the five possible answers to `verify`. `Untrusted` carries the
/// triggered reason codes for logging and auditing; presentation layers
/// must not forward them to the subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
  /// No valid consent for the requested purpose. Nothing was processed.
  ConsentRequired,
  /// The subject verified too recently; retry after the remaining wait.
  Cooldown { remaining_seconds: i64 },
  /// No candidate target within the relevance threshold. Nothing beyond a
  /// relevance audit note was persisted.
  NotRelevant,
  /// The sample failed spoofing detection.
  Untrusted { reasons: Vec<ReasonCode> },
  /// The sample is genuine and relevant; the persisted proximity facts.
  Verified {
    target_id:  Uuid,
    contained:  bool,
    distance_m: u32,
    accuracy:   AccuracyBucket,
  },
}
