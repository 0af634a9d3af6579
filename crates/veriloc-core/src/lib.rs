//! Core types and trait definitions for the Veriloc verification engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod consent;
pub mod detector;
pub mod error;
pub mod geofence;
pub mod geometry;
pub mod history;
pub mod outcome;
pub mod record;
pub mod sample;
pub mod store;

pub use error::{Error, Result};
