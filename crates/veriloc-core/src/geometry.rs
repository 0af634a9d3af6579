//! Great-circle geometry on WGS84-style coordinates.
//!
//! Pure functions over a spherical Earth model. Degenerate inputs (NaN,
//! infinite, out-of-range) fail with [`Error::InvalidCoordinate`] instead of
//! silently returning zero.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A bare latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub latitude:  f64,
  pub longitude: f64,
}

impl GeoPoint {
  pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
    validate_coordinates(latitude, longitude)?;
    Ok(Self { latitude, longitude })
  }
}

/// Reject NaN/infinite values and anything outside [-90, 90] / [-180, 180].
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
  let valid = latitude.is_finite()
    && longitude.is_finite()
    && (-90.0..=90.0).contains(&latitude)
    && (-180.0..=180.0).contains(&longitude);
  if valid {
    Ok(())
  } else {
    Err(Error::InvalidCoordinate { latitude, longitude })
  }
}

/// Haversine great-circle distance between two points, in meters.
///
/// Accurate to well under 0.1% for regional distances; deterministic for
/// identical inputs.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> Result<f64> {
  validate_coordinates(a.latitude, a.longitude)?;
  validate_coordinates(b.latitude, b.longitude)?;

  let phi_a = a.latitude.to_radians();
  let phi_b = b.latitude.to_radians();
  let d_phi = (b.latitude - a.latitude).to_radians();
  let d_lambda = (b.longitude - a.longitude).to_radians();

  let h = (d_phi / 2.0).sin().powi(2)
    + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);

  // Clamp before asin: float error can push h a hair above 1 for antipodes.
  Ok(2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin())
}

/// Initial bearing from `a` to `b` in degrees, 0–360, 0 = north.
pub fn bearing_degrees(a: GeoPoint, b: GeoPoint) -> Result<f64> {
  validate_coordinates(a.latitude, a.longitude)?;
  validate_coordinates(b.latitude, b.longitude)?;

  let phi_a = a.latitude.to_radians();
  let phi_b = b.latitude.to_radians();
  let d_lambda = (b.longitude - a.longitude).to_radians();

  let y = d_lambda.sin() * phi_b.cos();
  let x = phi_a.cos() * phi_b.sin() - phi_a.sin() * phi_b.cos() * d_lambda.cos();

  Ok(y.atan2(x).to_degrees().rem_euclid(360.0))
}

/// Smallest absolute difference between two bearings, in [0, 180].
pub fn angular_difference_degrees(a: f64, b: f64) -> f64 {
  let d = (a - b).rem_euclid(360.0);
  if d > 180.0 { 360.0 - d } else { d }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn p(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint { latitude, longitude }
  }

  #[test]
  fn distance_to_self_is_zero() {
    let a = p(47.3769, 8.5417);
    assert_eq!(distance_meters(a, a).unwrap(), 0.0);
  }

  #[test]
  fn distance_is_symmetric() {
    let a = p(47.3769, 8.5417);
    let b = p(47.3800, 8.5500);
    let ab = distance_meters(a, b).unwrap();
    let ba = distance_meters(b, a).unwrap();
    assert_eq!(ab, ba);
  }

  #[test]
  fn one_degree_along_meridian_is_about_111_19_km() {
    let d = distance_meters(p(0.0, 0.0), p(1.0, 0.0)).unwrap();
    let expected = 111_190.0;
    assert!(
      (d - expected).abs() / expected < 0.001,
      "distance {d} not within 0.1% of {expected}"
    );
  }

  #[test]
  fn bearing_due_north_is_zero() {
    let b = bearing_degrees(p(0.0, 0.0), p(1.0, 0.0)).unwrap();
    assert!(b.abs() < 1e-9, "bearing {b}");
  }

  #[test]
  fn bearing_due_east_is_ninety() {
    let b = bearing_degrees(p(0.0, 0.0), p(0.0, 1.0)).unwrap();
    assert!((b - 90.0).abs() < 0.01, "bearing {b}");
  }

  #[test]
  fn nan_coordinates_are_rejected() {
    let err = distance_meters(p(f64::NAN, 0.0), p(0.0, 0.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidCoordinate { .. }));
  }

  #[test]
  fn out_of_range_latitude_is_rejected() {
    let err = bearing_degrees(p(91.0, 0.0), p(0.0, 0.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidCoordinate { .. }));
  }

  #[test]
  fn angular_difference_wraps() {
    assert_eq!(angular_difference_degrees(350.0, 10.0), 20.0);
    assert_eq!(angular_difference_degrees(10.0, 350.0), 20.0);
    assert_eq!(angular_difference_degrees(90.0, 90.0), 0.0);
  }
}
