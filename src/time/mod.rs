//! Local clock management
//!
//! Applies a fetched [`TimeSample`](crate::core::TimeSample) to the system
//! clock, either by stepping it or by slewing it gradually:
//!
//! - **Set**: `clock_settime(CLOCK_REALTIME)` on Linux, `settimeofday(2)` on
//!   other Unix systems
//! - **Adjust**: `adjtime(2)`, which keeps the clock monotonic
//!
//! Both need root or `CAP_SYS_TIME`.
//!
//! # Examples
//!
//! ```no_run
//! use rdate::client::TimeClient;
//! use rdate::core::Config;
//! use rdate::time::{self, ClockAction};
//!
//! #[tokio::main]
//! async fn main() -> rdate::Result<()> {
//!     let client = TimeClient::new(Config::default());
//!     let sample = client.fetch_host_time("time.example.org").await?;
//!     time::apply(&sample, ClockAction::Adjust)
//! }
//! ```

mod clock;

pub use clock::{apply, offset_from_now, ClockAction};
