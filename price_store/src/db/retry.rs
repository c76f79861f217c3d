//! Caller-side retry for transient storage failures
//!
//! Store operations never retry on their own. Callers that want a retry
//! policy wrap the call here; only errors where
//! [`crate::StoreError::is_transient`] holds are retried.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 5_000;

/// Run a store operation, retrying transient failures with exponential backoff
///
/// # Example
/// ```ignore
/// use price_store::db::retry::execute_with_retry;
///
/// let boundaries = execute_with_retry(|| store.get_data_boundaries(), 3).await?;
/// ```
pub async fn execute_with_retry<F, Fut, T>(f: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    execute_with_retry_custom(f, max_attempts, BASE_BACKOFF_MS, MAX_BACKOFF_MS).await
}

/// Execute with retry and custom backoff configuration
pub async fn execute_with_retry_custom<F, Fut, T>(
    mut f: F,
    max_attempts: u32,
    base_backoff_ms: u64,
    max_backoff_ms: u64,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts && e.is_transient() => {
                let backoff_ms = backoff_for(attempt, base_backoff_ms, max_backoff_ms);
                warn!(
                    "Store operation failed (attempt {}/{}): {}. Retrying in {}ms",
                    attempt, max_attempts, e, backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn backoff_for(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    base_ms
        .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
        .min(max_ms)
}
