//! Verification orchestrator for Veriloc.
//!
//! Composes the pure components from `veriloc-core` — geometry, spoofing
//! detection, geofence evaluation — with the privacy-processing pipeline,
//! per-subject session state, periodic monitoring, the retention sweeper,
//! and the data-subject rights operations (export, erasure).
//!
//! All services are explicitly constructed and dependency-injected; there is
//! no ambient global state. The [`VerificationEngine`] owns the lifetime of
//! everything it composes.

pub mod config;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod privacy;
pub mod rights;
pub mod session;
pub mod sources;
pub mod sweeper;

pub use config::{EngineConfig, RetentionPolicy};
pub use engine::VerificationEngine;
pub use error::{Error, Result};
pub use rights::{ErasureReport, SubjectExport};
pub use sources::{
  LocationSource, MotionSource, NoMotion, SourceError, StaticTargetRegistry,
  TargetRegistry,
};
pub use sweeper::RetentionSweeper;
