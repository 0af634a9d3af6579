//! Raw sensor samples — the immutable inputs to the engine.
//!
//! A [`LocationSample`] is created on every raw fix and never mutated.
//! [`MotionSample`]s are best-effort; their absence must not block
//! verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, geometry::{self, GeoPoint}};

/// Which positioning subsystem produced a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
  Gps,
  Network,
  Fused,
  #[default]
  Unknown,
}

/// One raw position fix. Immutable value type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSample {
  pub latitude:        f64,
  pub longitude:       f64,
  /// Horizontal accuracy estimate in meters, 1σ.
  pub accuracy_m:      f64,
  pub altitude_m:      Option<f64>,
  pub captured_at:     DateTime<Utc>,
  /// The source's own mock/spoof flag, reported as-is.
  pub reported_mocked: bool,
  pub provider:        LocationProvider,
}

impl LocationSample {
  /// Build a sample with the optional fields defaulted. Rejects degenerate
  /// coordinates so downstream geometry never sees them.
  pub fn new(
    latitude: f64,
    longitude: f64,
    accuracy_m: f64,
    captured_at: DateTime<Utc>,
  ) -> Result<Self> {
    geometry::validate_coordinates(latitude, longitude)?;
    Ok(Self {
      latitude,
      longitude,
      accuracy_m,
      altitude_m: None,
      captured_at,
      reported_mocked: false,
      provider: LocationProvider::default(),
    })
  }

  pub fn point(&self) -> GeoPoint {
    GeoPoint { latitude: self.latitude, longitude: self.longitude }
  }
}

/// A motion-sensor reading: net linear acceleration magnitude at an instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionSample {
  pub magnitude:   f64,
  pub captured_at: DateTime<Utc>,
}
