//! rdate: RFC 868 Time Protocol client
//!
//! This library fetches the time from one or more remote hosts over TCP or UDP,
//! trying every address a host resolves to until one answers, and reports a
//! per-host outcome for the whole run.
pub mod client;
pub mod core;
pub mod network;
pub mod protocol;
pub mod report;
pub mod time;
pub mod util;

// Re-export commonly used items
pub use client::TimeClient;
pub use core::{Config, Error, HostResult, Result, RunSummary, TimeSample, Transport};
pub use time::ClockAction;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
