//! Deadline and cancellation bounds for anything a session awaits.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::errors::{BarrierError, BarrierResult};

/// Run `fut` until it completes, the deadline passes, or the caller cancels,
/// whichever happens first. Cancellation wins ties.
pub(crate) async fn bounded<T, F>(
    deadline: Instant,
    cancel: &CancellationToken,
    what: &str,
    fut: F,
) -> BarrierResult<T>
where
    F: Future<Output = BarrierResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            Err(BarrierError::cancelled(format!("{} cancelled by caller", what)))
        }
        outcome = tokio::time::timeout_at(deadline, fut) => match outcome {
            Ok(result) => result,
            Err(_) => Err(BarrierError::timeout(format!(
                "request deadline elapsed during {}",
                what
            ))),
        },
    }
}

/// Sleep between attempts, bounded like any other await.
pub(crate) async fn pause(
    delay: Duration,
    deadline: Instant,
    cancel: &CancellationToken,
) -> BarrierResult<()> {
    bounded(deadline, cancel, "retry delay", async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}
