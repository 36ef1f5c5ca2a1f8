//! Optimistic concurrency retry for read-check-write operations.
//!
//! A service reads the documents it needs, decides, and commits with the
//! versions it read. If another writer got there first the commit fails with a
//! precondition error and the whole attempt runs again from fresh reads.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Maximum attempts for a contended read-check-write.
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Base delay between attempts (milliseconds), scaled linearly by attempt.
const RETRY_BASE_DELAY_MS: u64 = 50;

pub const CONCURRENT_MODIFICATION: &str =
    "The resource was modified concurrently, please retry";

/// Run `attempt` until it succeeds, fails for a reason other than a lost
/// race, or runs out of attempts.
pub async fn with_optimistic_retry<T, F, Fut>(operation: &'static str, mut attempt: F) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    for n in 0..MAX_COMMIT_ATTEMPTS {
        match attempt().await {
            Err(ApiError::Store(e)) if e.is_precondition_failed() => {
                metrics::record_commit_conflict(operation);
                debug!(operation, attempt = n + 1, "Commit precondition failed, retrying");
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * (n as u64 + 1));
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }

    warn!(
        operation,
        attempts = MAX_COMMIT_ATTEMPTS,
        "Operation failed after retries due to concurrent updates"
    );
    Err(ApiError::conflict(CONCURRENT_MODIFICATION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_store::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_lost_races_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_optimistic_retry("test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ApiError::Store(StoreError::PreconditionFailed("stale".into())))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_with_conflict() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: ApiResult<()> = with_optimistic_retry("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Store(StoreError::PreconditionFailed("stale".into())))
        })
        .await;

        assert!(matches!(result, Err(ApiError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_COMMIT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: ApiResult<()> = with_optimistic_retry("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::not_found("Recipe not found"))
        })
        .await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
