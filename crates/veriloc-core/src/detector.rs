//! Multi-layer spoofing detection over a subject's recent signal history.
//!
//! The detector is stateless: it reads the history buffer (whose newest entry
//! is the sample under evaluation) plus optional motion data, and produces a
//! [`TrustVerdict`]. Layers are independent and OR-ed together — any single
//! triggered layer marks the sample untrusted, but every layer is still
//! evaluated so the verdict carries full diagnostics.
//!
//! Layers 3–7 fail open: an internal fault in one layer degrades it to
//! [`LayerOutcome::EvaluationFailed`] and the remaining layers still apply.

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  geometry::{self, GeoPoint},
  history::SignalHistory,
  sample::{LocationSample, MotionSample},
};

// ─── Verdict types ───────────────────────────────────────────────────────────

/// Why a sample was considered untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
  /// The source itself flagged the fix as mocked.
  MockedFlag,
  /// Reported accuracy below the consumer-GPS noise floor.
  SuspiciousPrecision,
  /// Implied speed from the previous fix exceeds the plausible maximum.
  ImpossibleVelocity,
  /// Consecutive bearings unnaturally aligned over the recent track.
  StraightLineTrack,
  /// Accuracy values unnaturally constant across recent fixes.
  UniformAccuracy,
  /// Inter-sample gaps too regular; automation-like cadence.
  RegularIntervals,
  /// GPS claims displacement the motion sensors did not register.
  MotionMismatch,
}

/// The outcome of evaluating one detection layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LayerOutcome {
  Triggered { reason: ReasonCode },
  NotTriggered,
  /// Preconditions not met (insufficient history, no motion feed).
  Skipped,
  /// The layer faulted and is treated as non-triggering (fail open).
  EvaluationFailed { reason: ReasonCode, detail: String },
}

/// Aggregate trust decision. Ephemeral — only the boolean and the reason
/// codes are ever persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustVerdict {
  pub trusted: bool,
  /// Triggered reasons in layer-evaluation order.
  pub reasons: Vec<ReasonCode>,
  /// One entry per layer, in evaluation order.
  pub layers:  Vec<LayerOutcome>,
}

impl TrustVerdict {
  pub fn first_reason(&self) -> Option<ReasonCode> {
    self.reasons.first().copied()
  }

  pub fn failed_layers(&self) -> impl Iterator<Item = &LayerOutcome> {
    self
      .layers
      .iter()
      .filter(|l| matches!(l, LayerOutcome::EvaluationFailed { .. }))
  }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Detection thresholds. The defaults are the authoritative values; they are
/// carried as configuration so a calibration change is a one-line edit.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  /// Implied speeds above this are impossible for a worker. km/h.
  pub max_speed_kmh:            f64,
  /// Consumer GPS never honestly reports accuracy below this. Meters.
  pub min_plausible_accuracy_m: f64,
  /// Pattern layers need at least this many buffered samples.
  pub pattern_min_samples:      usize,
  /// Window for the straight-line bearing check.
  pub bearing_window:           usize,
  /// Segment bearings within this many degrees of the overall bearing
  /// count as aligned.
  pub bearing_tolerance_deg:    f64,
  /// Fraction of aligned segments that triggers the straight-line layer.
  pub bearing_quorum:           f64,
  /// Window for the accuracy-homogeneity check.
  pub accuracy_window:          usize,
  /// Accuracy standard deviation below this is unnaturally constant. Meters.
  pub accuracy_stddev_floor_m:  f64,
  /// Gaps within this many seconds of the mean gap count as regular.
  pub interval_tolerance_s:     f64,
  /// Fraction of regular gaps that triggers the interval layer.
  pub interval_quorum:          f64,
  /// Motion cross-check applies only above this displacement. Meters.
  pub motion_displacement_m:    f64,
  /// Integrated acceleration magnitude below this contradicts GPS movement.
  pub motion_magnitude_floor:   f64,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      max_speed_kmh:            200.0,
      min_plausible_accuracy_m: 1.0,
      pattern_min_samples:      5,
      bearing_window:           5,
      bearing_tolerance_deg:    5.0,
      bearing_quorum:           0.8,
      accuracy_window:          6,
      accuracy_stddev_floor_m:  0.5,
      interval_tolerance_s:     2.0,
      interval_quorum:          0.75,
      motion_displacement_m:    10.0,
      motion_magnitude_floor:   0.1,
    }
  }
}

// ─── Detector ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SpoofingDetector {
  config: DetectorConfig,
}

impl SpoofingDetector {
  pub fn new(config: DetectorConfig) -> Self {
    Self { config }
  }

  /// Evaluate every layer against the history buffer. The newest buffered
  /// sample is the one under test; an empty buffer yields a trusted verdict
  /// with no layers evaluated (the orchestrator always pushes first).
  pub fn evaluate(
    &self,
    history: &SignalHistory,
    motion: Option<&[MotionSample]>,
  ) -> TrustVerdict {
    let Some(current) = history.latest() else {
      return TrustVerdict { trusted: true, reasons: Vec::new(), layers: Vec::new() };
    };

    let layers = vec![
      self.source_flag(current),
      self.suspicious_precision(current),
      guard(self.impossible_velocity(history), ReasonCode::ImpossibleVelocity),
      guard(self.straight_line_track(history), ReasonCode::StraightLineTrack),
      self.uniform_accuracy(history),
      self.regular_intervals(history),
      guard(self.motion_mismatch(history, motion), ReasonCode::MotionMismatch),
    ];

    let reasons: Vec<ReasonCode> = layers
      .iter()
      .filter_map(|l| match l {
        LayerOutcome::Triggered { reason } => Some(*reason),
        _ => None,
      })
      .collect();

    TrustVerdict { trusted: reasons.is_empty(), reasons, layers }
  }

  // ── Layer 1: source flag ──────────────────────────────────────────────────

  fn source_flag(&self, current: &LocationSample) -> LayerOutcome {
    if current.reported_mocked {
      LayerOutcome::Triggered { reason: ReasonCode::MockedFlag }
    } else {
      LayerOutcome::NotTriggered
    }
  }

  // ── Layer 2: suspicious precision ─────────────────────────────────────────

  fn suspicious_precision(&self, current: &LocationSample) -> LayerOutcome {
    if current.accuracy_m < self.config.min_plausible_accuracy_m {
      LayerOutcome::Triggered { reason: ReasonCode::SuspiciousPrecision }
    } else {
      LayerOutcome::NotTriggered
    }
  }

  // ── Layer 3: impossible velocity ──────────────────────────────────────────

  fn impossible_velocity(&self, history: &SignalHistory) -> Result<LayerOutcome> {
    let (Some(current), Some(previous)) = (history.latest(), history.previous())
    else {
      return Ok(LayerOutcome::Skipped);
    };

    let elapsed_s =
      (current.captured_at - previous.captured_at).num_milliseconds() as f64
        / 1000.0;
    if elapsed_s <= 0.0 {
      return Ok(LayerOutcome::Skipped);
    }

    let meters = geometry::distance_meters(previous.point(), current.point())?;
    let speed_kmh = meters / elapsed_s * 3.6;

    Ok(if speed_kmh > self.config.max_speed_kmh {
      LayerOutcome::Triggered { reason: ReasonCode::ImpossibleVelocity }
    } else {
      LayerOutcome::NotTriggered
    })
  }

  // ── Layer 4a: straight-line bearing consistency ───────────────────────────

  fn straight_line_track(&self, history: &SignalHistory) -> Result<LayerOutcome> {
    if history.len() < self.config.pattern_min_samples {
      return Ok(LayerOutcome::Skipped);
    }

    let points: Vec<GeoPoint> =
      history.recent(self.config.bearing_window).map(|s| s.point()).collect();
    let overall =
      geometry::bearing_degrees(points[0], points[points.len() - 1])?;

    let segments = points.len() - 1;
    let mut aligned = 0usize;
    for pair in points.windows(2) {
      let bearing = geometry::bearing_degrees(pair[0], pair[1])?;
      if geometry::angular_difference_degrees(bearing, overall)
        < self.config.bearing_tolerance_deg
      {
        aligned += 1;
      }
    }

    Ok(if aligned as f64 / segments as f64 >= self.config.bearing_quorum {
      LayerOutcome::Triggered { reason: ReasonCode::StraightLineTrack }
    } else {
      LayerOutcome::NotTriggered
    })
  }

  // ── Layer 4b: accuracy homogeneity ────────────────────────────────────────

  fn uniform_accuracy(&self, history: &SignalHistory) -> LayerOutcome {
    let window = self.config.accuracy_window;
    if history.len() < window {
      return LayerOutcome::Skipped;
    }

    let values: Vec<f64> = history.recent(window).map(|s| s.accuracy_m).collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    if variance.sqrt() < self.config.accuracy_stddev_floor_m {
      LayerOutcome::Triggered { reason: ReasonCode::UniformAccuracy }
    } else {
      LayerOutcome::NotTriggered
    }
  }

  // ── Layer 4c: interval regularity ─────────────────────────────────────────

  fn regular_intervals(&self, history: &SignalHistory) -> LayerOutcome {
    if history.len() < self.config.pattern_min_samples {
      return LayerOutcome::Skipped;
    }

    let times: Vec<_> = history.iter().map(|s| s.captured_at).collect();
    let gaps: Vec<f64> = times
      .windows(2)
      .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
      .collect();

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let regular = gaps
      .iter()
      .filter(|g| (**g - mean).abs() <= self.config.interval_tolerance_s)
      .count();

    if regular as f64 / gaps.len() as f64 >= self.config.interval_quorum {
      LayerOutcome::Triggered { reason: ReasonCode::RegularIntervals }
    } else {
      LayerOutcome::NotTriggered
    }
  }

  // ── Layer 5: sensor cross-correlation ─────────────────────────────────────

  fn motion_mismatch(
    &self,
    history: &SignalHistory,
    motion: Option<&[MotionSample]>,
  ) -> Result<LayerOutcome> {
    let Some(motion) = motion else {
      return Ok(LayerOutcome::Skipped);
    };
    let (Some(current), Some(previous)) = (history.latest(), history.previous())
    else {
      return Ok(LayerOutcome::Skipped);
    };

    let meters = geometry::distance_meters(previous.point(), current.point())?;
    if meters <= self.config.motion_displacement_m {
      return Ok(LayerOutcome::NotTriggered);
    }

    // Only readings inside the window between the two fixes count. An empty
    // window is missing data, not evidence of stillness.
    let integrated: f64 = {
      let window: Vec<&MotionSample> = motion
        .iter()
        .filter(|m| {
          m.captured_at > previous.captured_at
            && m.captured_at <= current.captured_at
        })
        .collect();
      if window.is_empty() {
        return Ok(LayerOutcome::Skipped);
      }
      window.iter().map(|m| m.magnitude).sum()
    };

    Ok(if integrated < self.config.motion_magnitude_floor {
      LayerOutcome::Triggered { reason: ReasonCode::MotionMismatch }
    } else {
      LayerOutcome::NotTriggered
    })
  }
}

fn guard(outcome: Result<LayerOutcome>, reason: ReasonCode) -> LayerOutcome {
  match outcome {
    Ok(outcome) => outcome,
    Err(e) => {
      LayerOutcome::EvaluationFailed { reason, detail: e.to_string() }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, TimeZone, Utc};

  use super::*;

  fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
  }

  fn sample(
    latitude: f64,
    longitude: f64,
    accuracy_m: f64,
    offset_s: i64,
  ) -> LocationSample {
    LocationSample::new(
      latitude,
      longitude,
      accuracy_m,
      base_time() + chrono::Duration::seconds(offset_s),
    )
    .unwrap()
  }

  fn history_of(samples: Vec<LocationSample>) -> SignalHistory {
    let mut history = SignalHistory::new();
    for s in samples {
      history.push(s);
    }
    history
  }

  fn detector() -> SpoofingDetector {
    SpoofingDetector::default()
  }

  // One sample per 7–13 s with meandering positions and jittered accuracy:
  // a plausible pedestrian track that must not trip any pattern layer.
  fn plausible_track() -> SignalHistory {
    let offsets = [0, 9, 16, 29, 36, 48];
    let latitudes = [0.0, 0.00005, 0.00004, 0.00011, 0.00009, 0.00016];
    let longitudes = [0.0, 0.00004, 0.00012, 0.00010, 0.00019, 0.00015];
    let accuracies = [8.0, 11.5, 6.0, 14.0, 9.5, 17.0];

    history_of(
      (0..6)
        .map(|i| sample(latitudes[i], longitudes[i], accuracies[i], offsets[i]))
        .collect(),
    )
  }

  #[test]
  fn plausible_track_is_trusted() {
    let verdict = detector().evaluate(&plausible_track(), None);
    assert!(verdict.trusted, "reasons: {:?}", verdict.reasons);
  }

  #[test]
  fn mocked_flag_triggers() {
    let mut s = sample(0.0, 0.0, 10.0, 0);
    s.reported_mocked = true;
    let verdict = detector().evaluate(&history_of(vec![s]), None);
    assert!(!verdict.trusted);
    assert_eq!(verdict.first_reason(), Some(ReasonCode::MockedFlag));
  }

  #[test]
  fn suspicious_precision_triggers_without_history() {
    // accuracy 0.3 m with the mocked flag false — layer 2 alone must flag it.
    let verdict =
      detector().evaluate(&history_of(vec![sample(0.0, 0.0, 0.3, 0)]), None);
    assert!(!verdict.trusted);
    assert_eq!(verdict.reasons, vec![ReasonCode::SuspiciousPrecision]);
  }

  #[test]
  fn impossible_velocity_triggers() {
    // ~50 km in 10 s.
    let history =
      history_of(vec![sample(0.0, 0.0, 10.0, 0), sample(0.45, 0.0, 12.0, 10)]);
    let verdict = detector().evaluate(&history, None);
    assert!(!verdict.trusted);
    assert!(verdict.reasons.contains(&ReasonCode::ImpossibleVelocity));
  }

  #[test]
  fn velocity_layer_skipped_when_clock_goes_backwards() {
    let history =
      history_of(vec![sample(0.0, 0.0, 10.0, 10), sample(0.45, 0.0, 12.0, 0)]);
    let verdict = detector().evaluate(&history, None);
    assert!(verdict.trusted);
    assert_eq!(verdict.layers[2], LayerOutcome::Skipped);
  }

  #[test]
  fn straight_line_track_triggers() {
    // Five fixes marching due north at walking pace, jittered gaps so the
    // interval layer stays quiet, accuracy varied so 4b stays quiet.
    let history = history_of(vec![
      sample(0.00000, 0.0, 8.0, 0),
      sample(0.00010, 0.0, 12.0, 9),
      sample(0.00020, 0.0, 6.5, 21),
      sample(0.00030, 0.0, 15.0, 26),
      sample(0.00040, 0.0, 9.0, 40),
    ]);
    let verdict = detector().evaluate(&history, None);
    assert!(!verdict.trusted);
    assert_eq!(verdict.reasons, vec![ReasonCode::StraightLineTrack]);
  }

  #[test]
  fn uniform_accuracy_triggers() {
    // Six meandering fixes all reporting exactly 10.0 m accuracy.
    let latitudes = [0.0, 0.00005, 0.00003, 0.00010, 0.00007, 0.00013];
    let longitudes = [0.0, 0.00006, 0.00013, 0.00011, 0.00018, 0.00014];
    let offsets = [0, 9, 16, 29, 36, 48];
    let history = history_of(
      (0..6)
        .map(|i| sample(latitudes[i], longitudes[i], 10.0, offsets[i]))
        .collect(),
    );
    let verdict = detector().evaluate(&history, None);
    assert!(!verdict.trusted);
    assert!(verdict.reasons.contains(&ReasonCode::UniformAccuracy));
  }

  #[test]
  fn regular_intervals_trigger() {
    // Five fixes exactly 10 s apart; positions meander, accuracy varies.
    let latitudes = [0.0, 0.00005, 0.00003, 0.00010, 0.00007];
    let longitudes = [0.0, 0.00006, 0.00013, 0.00011, 0.00018];
    let accuracies = [8.0, 11.5, 6.0, 14.0, 9.5];
    let history = history_of(
      (0..5)
        .map(|i| sample(latitudes[i], longitudes[i], accuracies[i], i as i64 * 10))
        .collect(),
    );
    let verdict = detector().evaluate(&history, None);
    assert!(!verdict.trusted);
    assert!(verdict.reasons.contains(&ReasonCode::RegularIntervals));
  }

  #[test]
  fn motion_mismatch_triggers() {
    // GPS claims ~55 m of displacement; the accelerometer barely moved.
    let history =
      history_of(vec![sample(0.0, 0.0, 10.0, 0), sample(0.0005, 0.0, 12.0, 60)]);
    let motion = vec![
      MotionSample { magnitude: 0.02, captured_at: base_time() + chrono::Duration::seconds(20) },
      MotionSample { magnitude: 0.03, captured_at: base_time() + chrono::Duration::seconds(40) },
    ];
    let verdict = detector().evaluate(&history, Some(&motion));
    assert!(!verdict.trusted);
    assert!(verdict.reasons.contains(&ReasonCode::MotionMismatch));
  }

  #[test]
  fn motion_layer_skipped_without_feed() {
    let history =
      history_of(vec![sample(0.0, 0.0, 10.0, 0), sample(0.0005, 0.0, 12.0, 60)]);
    let verdict = detector().evaluate(&history, None);
    assert!(verdict.trusted);
    assert_eq!(verdict.layers[6], LayerOutcome::Skipped);
  }

  #[test]
  fn motion_layer_skipped_when_window_has_no_readings() {
    let history =
      history_of(vec![sample(0.0, 0.0, 10.0, 0), sample(0.0005, 0.0, 12.0, 60)]);
    // A reading from before the window must not count as stillness evidence.
    let motion = vec![MotionSample {
      magnitude:   0.01,
      captured_at: base_time() - chrono::Duration::seconds(30),
    }];
    let verdict = detector().evaluate(&history, Some(&motion));
    assert!(verdict.trusted);
    assert_eq!(verdict.layers[6], LayerOutcome::Skipped);
  }

  #[test]
  fn layer_fault_fails_open() {
    // A NaN latitude smuggled in via the public field makes the geometry
    // layers fault; the verdict must degrade, not abort.
    let mut bad = sample(0.0, 0.0, 10.0, 10);
    bad.latitude = f64::NAN;
    let history = history_of(vec![sample(0.0, 0.0, 10.0, 0), bad]);
    let verdict = detector().evaluate(&history, None);
    assert!(verdict.trusted);
    assert!(verdict.failed_layers().count() > 0);
  }
}
