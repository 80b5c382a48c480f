//! Utility module
//!
//! Deadline helpers shared by the fetch strategies.

use std::future::Future;
use std::time::Duration;

/// Converts a timeout in whole seconds to a deadline length
///
/// Zero means "no deadline": the caller waits for as long as the exchange takes.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Runs `fut` to completion, or until `limit` has elapsed
///
/// On expiry the future is dropped, releasing whatever it owned, and the limit
/// that was exceeded is returned as the error.
pub async fn with_deadline<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, Duration>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| limit),
        None => Ok(fut.await),
    }
}
