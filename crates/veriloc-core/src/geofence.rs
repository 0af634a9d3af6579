//! Geofence relevance and containment evaluation.
//!
//! Targets beyond the relevance threshold are dropped unexamined — no
//! distance is reported for them, so no location data is manufactured about
//! places the subject has no business relationship with.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, geometry::{self, GeoPoint}};

/// Default relevance threshold: targets farther than this are none of the
/// engine's business. Meters.
pub const RELEVANCE_THRESHOLD_M: f64 = 500.0;

/// A work site with a circular geofence. Read-only reference data supplied
/// by the site registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetLocation {
  pub target_id: Uuid,
  pub latitude:  f64,
  pub longitude: f64,
  /// Geofence radius in meters.
  pub radius_m:  f64,
  pub org_id:    Uuid,
}

impl TargetLocation {
  pub fn point(&self) -> GeoPoint {
    GeoPoint { latitude: self.latitude, longitude: self.longitude }
  }
}

/// The result of evaluating a sample against candidate targets.
#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceOutcome {
  /// No candidate within the relevance threshold. Nothing further may be
  /// computed or persisted about this sample beyond a relevance audit note.
  NotRelevant,
  /// The nearest relevant target, with the raw (un-rounded) distance.
  Relevant {
    target_id:  Uuid,
    distance_m: f64,
    contained:  bool,
  },
}

/// Evaluate `point` against `targets`, keeping only the nearest target
/// within `relevance_threshold_m`.
pub fn evaluate(
  point: GeoPoint,
  targets: &[TargetLocation],
  relevance_threshold_m: f64,
) -> Result<GeofenceOutcome> {
  let mut nearest: Option<(f64, &TargetLocation)> = None;

  for target in targets {
    let meters = geometry::distance_meters(point, target.point())?;
    if meters > relevance_threshold_m {
      continue;
    }
    if nearest.is_none_or(|(best, _)| meters < best) {
      nearest = Some((meters, target));
    }
  }

  Ok(match nearest {
    None => GeofenceOutcome::NotRelevant,
    Some((distance_m, target)) => GeofenceOutcome::Relevant {
      target_id: target.target_id,
      distance_m,
      contained: distance_m <= target.radius_m,
    },
  })
}
