//! Core types and trait definitions for the Beacon telemetry engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod clock;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod session;
pub mod signal;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
