//! Per-subject rolling window of recent location samples.

use std::collections::VecDeque;

use crate::sample::LocationSample;

/// Number of samples retained per subject.
pub const HISTORY_CAPACITY: usize = 20;

/// Fixed-capacity ring buffer in arrival order; the oldest sample is evicted
/// on overflow. Owned by the orchestrator for the lifetime of a subject's
/// session and discarded when monitoring stops.
#[derive(Debug, Clone)]
pub struct SignalHistory {
  samples:  VecDeque<LocationSample>,
  capacity: usize,
}

impl Default for SignalHistory {
  fn default() -> Self {
    Self::new()
  }
}

impl SignalHistory {
  pub fn new() -> Self {
    Self::with_capacity(HISTORY_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self { samples: VecDeque::with_capacity(capacity), capacity }
  }

  pub fn push(&mut self, sample: LocationSample) {
    if self.samples.len() == self.capacity {
      self.samples.pop_front();
    }
    self.samples.push_back(sample);
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  /// Newest sample, if any.
  pub fn latest(&self) -> Option<&LocationSample> {
    self.samples.back()
  }

  /// Second-newest sample, if any.
  pub fn previous(&self) -> Option<&LocationSample> {
    self.samples.len().checked_sub(2).and_then(|i| self.samples.get(i))
  }

  /// All buffered samples, oldest first.
  pub fn iter(&self) -> impl Iterator<Item = &LocationSample> {
    self.samples.iter()
  }

  /// The newest `n` samples, oldest first.
  pub fn recent(&self, n: usize) -> impl Iterator<Item = &LocationSample> {
    self.samples.iter().skip(self.samples.len().saturating_sub(n))
  }

  pub fn clear(&mut self) {
    self.samples.clear();
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn sample(latitude: f64) -> LocationSample {
    LocationSample::new(
      latitude,
      0.0,
      10.0,
      Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    )
    .unwrap()
  }

  #[test]
  fn evicts_oldest_at_capacity() {
    let mut history = SignalHistory::with_capacity(3);
    for i in 0..5 {
      history.push(sample(f64::from(i)));
    }
    assert_eq!(history.len(), 3);
    let latitudes: Vec<f64> = history.iter().map(|s| s.latitude).collect();
    assert_eq!(latitudes, vec![2.0, 3.0, 4.0]);
  }

  #[test]
  fn latest_and_previous() {
    let mut history = SignalHistory::new();
    assert!(history.latest().is_none());
    assert!(history.previous().is_none());

    history.push(sample(1.0));
    assert_eq!(history.latest().unwrap().latitude, 1.0);
    assert!(history.previous().is_none());

    history.push(sample(2.0));
    assert_eq!(history.latest().unwrap().latitude, 2.0);
    assert_eq!(history.previous().unwrap().latitude, 1.0);
  }

  #[test]
  fn recent_returns_newest_in_arrival_order() {
    let mut history = SignalHistory::new();
    for i in 0..10 {
      history.push(sample(f64::from(i)));
    }
    let last_three: Vec<f64> = history.recent(3).map(|s| s.latitude).collect();
    assert_eq!(last_three, vec![7.0, 8.0, 9.0]);
  }
}
