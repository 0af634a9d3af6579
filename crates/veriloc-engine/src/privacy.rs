//! Data-minimisation primitives: coordinate obfuscation and categorical
//! distance rounding.
//!
//! Obfuscation truncates toward zero at a fixed resolution so exact
//! positions cannot be recovered from anything the engine persists.

use veriloc_core::sample::LocationSample;

/// Truncate a coordinate toward zero at `resolution_deg`.
///
/// Truncating an already-truncated value yields the same value: the nudge
/// absorbs the ulp lost when a quantised value is rescaled, which would
/// otherwise slide it down one step.
pub fn truncate_degrees(value: f64, resolution_deg: f64) -> f64 {
  let scaled = value / resolution_deg;
  let stepped = scaled.signum() * (scaled.abs() + 1e-9).trunc();
  stepped * resolution_deg
}

/// A copy of `sample` with both axes truncated. The caller must not retain
/// the original past this point.
pub fn obfuscate(sample: &LocationSample, resolution_deg: f64) -> LocationSample {
  let mut minimised = sample.clone();
  minimised.latitude = truncate_degrees(sample.latitude, resolution_deg);
  minimised.longitude = truncate_degrees(sample.longitude, resolution_deg);
  minimised
}

/// Round a distance to the nearest multiple of `step_m`; ties round up.
pub fn round_distance_m(distance_m: f64, step_m: u32) -> u32 {
  let step = f64::from(step_m);
  let lower = (distance_m / step).floor() * step;
  let rounded = if distance_m - lower >= step / 2.0 {
    lower + step
  } else {
    lower
  };
  rounded as u32
}
