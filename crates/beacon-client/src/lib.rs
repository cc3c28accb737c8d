//! Client session driver for Beacon.
//!
//! Owns one session's local state — current page, timers, counters — and
//! emits start/heartbeat/page-change/end signals over a [`Transport`].
//! Everything is fire-and-forget: a transport failure is logged and
//! swallowed, never surfaced to the embedding page, and there is no retry
//! queue — a dropped heartbeat is simply superseded by the next one.
//!
//! The driver is single-threaded and cooperative: the caller owns the
//! heartbeat timer and event callbacks and calls in; the driver never
//! spawns anything of its own.

pub mod driver;
pub mod profile;
pub mod transport;
pub mod useragent;

pub use driver::{DriverConfig, PageContext, SessionDriver};
pub use transport::{HttpTransport, Transport};
