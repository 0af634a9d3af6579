//! Error types for `veriloc-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A latitude/longitude pair that is NaN, infinite, or outside the
  /// WGS84 value range. Never silently mapped to zero.
  #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
  InvalidCoordinate { latitude: f64, longitude: f64 },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
