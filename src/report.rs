//! Per-host reporting
//!
//! Successful hosts are reported at `INFO` under the [`TARGET`] target, failures
//! at `WARN`. Where the events end up (stdout, stderr, syslog) is decided by
//! the subscriber the binary installs.

use chrono::{Local, TimeZone};
use tracing::{info, warn};

use crate::core::HostResult;

/// Target of the per-host report events
pub const TARGET: &str = "rdate::report";

/// Layout of `ctime(3)` without the trailing newline
const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Emits the report line for one host
pub fn host_result(result: &HostResult) {
    match &result.outcome {
        Ok(_) => info!(target: TARGET, "{}", render(result)),
        Err(_) => warn!(target: TARGET, "{}", render(result)),
    }
}

/// Renders the report line for one host
///
/// Success is `[host]<TAB><local time>`; failure is the error text.
pub fn render(result: &HostResult) -> String {
    match &result.outcome {
        Ok(sample) => format!("[{}]\t{}", result.host, format_ctime(sample.unix_secs())),
        Err(e) => e.to_string(),
    }
}

/// Formats Unix seconds as local time the way `ctime(3)` does
pub fn format_ctime(unix_secs: i64) -> String {
    format_ctime_in(&Local, unix_secs)
}

fn format_ctime_in<Tz>(tz: &Tz, unix_secs: i64) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_opt(unix_secs, 0).earliest() {
        Some(time) => time.format(CTIME_FORMAT).to_string(),
        None => unix_secs.to_string(),
    }
}
