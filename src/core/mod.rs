//! Core types and errors shared by every rdate component
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;

pub use self::error::{Error, FailureKind, Result};
pub use self::types::{Config, Endpoint, HostResult, RunSummary, TimeSample, Transport};

/// Default per-attempt timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
