// Task poller
//
// Bounded-time polling loop against the upstream task-status endpoint.
// Generic over the status source so the loop itself can be exercised with
// fake upstreams under paused time.

use std::future::Future;
use tokio::time::{sleep, Duration, Instant};

use crate::proxy::types::{CompletedTask, TaskStatus};
use crate::proxy::upstream::UpstreamError;

/// Terminal failure outcomes of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Upstream task execution failed.")]
    TaskFailed,
    #[error("Task polling timed out after {0} seconds.")]
    TimedOut(u64),
}

/// Poll `check` until the task reaches a terminal state or the wall-clock
/// `timeout` elapses.
///
/// A single transient status-check failure skips interpretation for that
/// iteration and proceeds to the wait; `failed` stops immediately. The
/// inter-poll sleep is clamped to the remaining budget so the ceiling holds
/// regardless of the configured interval. Dropping the returned future
/// (e.g. on client disconnect) cancels both the in-flight check and the
/// pending delay.
pub async fn poll_until_complete<F, Fut>(
    mut check: F,
    interval: Duration,
    timeout: Duration,
    correlation_id: &str,
) -> Result<CompletedTask, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TaskStatus, UpstreamError>>,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        match check().await {
            Ok(TaskStatus::Completed(task)) => {
                tracing::info!(
                    "[{}] Task completed after {:?} ({} images)",
                    correlation_id,
                    start.elapsed(),
                    task.images.len()
                );
                return Ok(task);
            }
            Ok(TaskStatus::Failed) => {
                tracing::warn!("[{}] Task reported failed, stopping poll", correlation_id);
                return Err(PollError::TaskFailed);
            }
            Ok(TaskStatus::Pending) => {}
            Err(e) => {
                // Transient status-check failure: keep polling
                tracing::warn!("[{}] Status check failed, will retry: {}", correlation_id, e);
            }
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }
        sleep(interval.min(remaining)).await;
    }

    tracing::warn!(
        "[{}] Polling ceiling reached after {:?}",
        correlation_id,
        start.elapsed()
    );
    Err(PollError::TimedOut(timeout.as_secs()))
}
