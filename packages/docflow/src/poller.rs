//! Completion poller - a per-task state machine driven by backend status.
//!
//! The transition logic is a pure function ([`poll_step`]) so any host
//! scheduler can drive resumption: the async driver here sleeps the returned
//! delay, but a timer queue or message requeue works just as well.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::traits::backend::InferenceBackend;
use crate::types::config::PollConfig;
use crate::types::task::{BackendJobStatus, Task, TaskOutcome, TaskState};

/// Result of one poll transition.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPlan {
    /// State the task moves to after this status query
    pub state: TaskState,

    /// Delay before the next query, `None` when the state is terminal
    pub next_poll_in: Option<Duration>,
}

/// Pure transition function: `(task, latest backend status) → (new state,
/// optional next-poll delay)`.
///
/// `task.poll_attempts` is the number of queries performed *before* this
/// status arrived; the returned plan accounts for the query that produced
/// it. Calling with a task already in a terminal state is a no-op returning
/// that state with no delay, so redundant invocations (e.g. a scheduler
/// requeuing the check) are safe.
pub fn poll_step(task: &Task, status: &BackendJobStatus, config: &PollConfig) -> PollPlan {
    if task.state.is_terminal() {
        return PollPlan {
            state: task.state,
            next_poll_in: None,
        };
    }

    let attempts = task.poll_attempts + 1;

    match status {
        BackendJobStatus::Done => PollPlan {
            state: TaskState::Completed,
            next_poll_in: None,
        },
        BackendJobStatus::Error(_) => PollPlan {
            state: TaskState::Failed,
            next_poll_in: None,
        },
        BackendJobStatus::Queued | BackendJobStatus::Running => {
            if attempts >= config.max_attempts {
                PollPlan {
                    state: TaskState::TimedOut,
                    next_poll_in: None,
                }
            } else {
                PollPlan {
                    state: TaskState::Pending,
                    next_poll_in: Some(config.delay_after_attempt(attempts)),
                }
            }
        }
    }
}

/// Drive a task to a terminal state, sleeping between polls.
///
/// Idempotent: a task that already holds a cached terminal outcome is
/// returned immediately without touching the backend. Cancellation aborts
/// the wait with [`PipelineError::Cancelled`], leaving the coordinator to
/// record the task's documents as abandoned.
pub async fn poll_until_terminal<B: InferenceBackend>(
    task: &mut Task,
    backend: &B,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<TaskOutcome> {
    if let Some(outcome) = task.outcome() {
        debug!(task_id = %task.id, "task already terminal, returning cached outcome");
        return Ok(outcome.clone());
    }

    loop {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // A transport failure on the status query counts as a backend error
        // for the task, matching how a vanished job is reported.
        let status = match backend.poll_task(&task.id).await {
            Ok(status) => status,
            Err(e) => BackendJobStatus::Error(e.to_string()),
        };

        let plan = poll_step(task, &status, config);
        task.poll_attempts += 1;
        debug!(
            task_id = %task.id,
            attempts = task.poll_attempts,
            state = ?plan.state,
            "poll transition"
        );

        match plan.state {
            TaskState::Completed => {
                match backend.fetch_results(&task.id).await {
                    Ok(records) => {
                        info!(
                            task_id = %task.id,
                            records = records.len(),
                            "task completed"
                        );
                        task.complete(records);
                    }
                    Err(e) => {
                        warn!(task_id = %task.id, error = %e, "failed to fetch results");
                        task.fail(e.to_string());
                    }
                }
                return Ok(task.outcome().cloned().expect("terminal task has outcome"));
            }
            TaskState::Failed => {
                let message = match status {
                    BackendJobStatus::Error(message) => message,
                    _ => "backend reported failure".to_string(),
                };
                warn!(task_id = %task.id, message = %message, "task failed");
                task.fail(message);
                return Ok(task.outcome().cloned().expect("terminal task has outcome"));
            }
            TaskState::TimedOut => {
                warn!(
                    task_id = %task.id,
                    attempts = task.poll_attempts,
                    "poll attempts exhausted"
                );
                task.time_out();
                return Ok(task.outcome().cloned().expect("terminal task has outcome"));
            }
            TaskState::Pending => {
                task.state = TaskState::Pending;
                let delay = plan.next_poll_in.expect("pending plan carries a delay");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            TaskState::Submitted => unreachable!("poll_step never returns Submitted"),
        }
    }
}
