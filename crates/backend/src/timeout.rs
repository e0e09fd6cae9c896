//! Deadline enforcement for remote calls.

use std::future::Future;
use std::time::Duration;

use crate::{BackendError, Result};

/// Runs a remote operation under an explicit deadline.
///
/// A call that exceeds the deadline resolves to [`BackendError::Timeout`]
/// carrying the operation name, distinct from any other network failure, so
/// callers can branch on "timed out" without parsing messages.
pub async fn with_timeout<T, F>(op: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            metrics::counter!("backend_timeouts_total").increment(1);
            tracing::warn!(op, limit_ms = limit.as_millis() as u64, "remote call timed out");
            Err(BackendError::Timeout { op })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_deadline() {
        let result = with_timeout("fast op", Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exceeding_deadline_is_a_timeout() {
        let result: Result<()> = with_timeout("slow op", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(BackendError::Timeout { op: "slow op" })
        ));
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let result: Result<()> = with_timeout("failing op", Duration::from_secs(1), async {
            Err(BackendError::Network("boom".to_string()))
        })
        .await;

        assert!(matches!(result, Err(BackendError::Network(_))));
    }
}
