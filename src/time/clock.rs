use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::core::{Error, Result, TimeSample};

/// How a fetched time is applied to the local clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAction {
    /// Step the clock to the fetched time
    Set,
    /// Slew the clock towards the fetched time
    Adjust,
}

/// Applies `sample` to the system clock
pub fn apply(sample: &TimeSample, action: ClockAction) -> Result<()> {
    match action {
        ClockAction::Set => {
            debug!(secs = sample.unix_secs(), "setting local clock");
            set_clock(sample.unix_secs())
                .map_err(|e| Error::clock(format!("could not set system time: {}", e)))
        }
        ClockAction::Adjust => {
            let delta = offset_from_now(sample)?;
            info!("adjusting local clock by {} seconds.", delta);
            slew_clock(delta)
                .map_err(|e| Error::clock(format!("could not adjust system time: {}", e)))
        }
    }
}

/// Whole seconds the local clock is behind `sample` (negative if ahead)
pub fn offset_from_now(sample: &TimeSample) -> Result<i64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::clock(format!("could not get system time: {}", e)))?;
    let now = i64::try_from(now.as_secs())
        .map_err(|e| Error::clock(format!("could not get system time: {}", e)))?;
    Ok(sample.unix_secs() - now)
}

#[cfg(target_os = "linux")]
fn set_clock(secs: i64) -> std::result::Result<(), nix::Error> {
    use nix::sys::time::TimeSpec;
    use nix::time::{clock_settime, ClockId};

    clock_settime(ClockId::CLOCK_REALTIME, TimeSpec::new(secs as libc::time_t, 0))
}

#[cfg(all(unix, not(target_os = "linux")))]
fn set_clock(secs: i64) -> std::result::Result<(), std::io::Error> {
    let tv = libc::timeval {
        tv_sec: secs as libc::time_t,
        tv_usec: 0,
    };
    // SAFETY: tv is a valid timeval and a null timezone is allowed
    let rc = unsafe { libc::settimeofday(&tv, std::ptr::null()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn slew_clock(delta: i64) -> std::result::Result<(), std::io::Error> {
    let tv = libc::timeval {
        tv_sec: delta as libc::time_t,
        tv_usec: 0,
    };
    // SAFETY: tv is a valid timeval; the previous adjustment is not requested
    let rc = unsafe { libc::adjtime(&tv, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
