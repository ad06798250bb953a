//! Cancellation and deadlines for provider operations.
//!
//! Dropping an operation's future aborts its in-flight request. Steps that
//! already completed stay applied; the next reconcile converges the rest.

use crate::error::CloudError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `operation` until it finishes, `token` is cancelled, or `timeout` elapses
pub async fn with_cancellation<F, T>(
    token: &CancellationToken,
    timeout: Option<Duration>,
    operation: F,
) -> Result<T, CloudError>
where
    F: Future<Output = Result<T, CloudError>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_elapsed) => Err(CloudError::DeadlineExceeded(limit)),
            },
            None => operation.await,
        }
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CloudError::Cancelled),
        result = bounded => result,
    }
}
