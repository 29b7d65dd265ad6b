//! Bounded retry for transient availability-request failures.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::RecGovError;

/// Runs `operation`, retrying transient failures with exponential backoff.
///
/// A transient failure ([`RecGovError::is_transient`]) sleeps
/// `backoff_base_secs * 2^attempt` seconds before the next try, for at most
/// `max_retries` extra attempts. Anything else is returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, RecGovError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RecGovError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        warn!(
            "Transient availability error (attempt {}/{}), retrying in {}s: {}",
            attempt + 1,
            max_retries,
            delay_secs,
            err
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
