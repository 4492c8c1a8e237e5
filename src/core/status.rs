//! Task lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task run.
///
/// Transitions are `Init -> Running -> {Done, Error}`, with `Aborting`
/// entered from `Running` when cooperative cancellation is observed and
/// `Aborted` as its terminal form. Once a task is aborting it never
/// returns to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not yet started.
    Init,
    /// Submitted/spawned and still executing.
    Running,
    /// Cancellation requested; waiting for the job to leave the queue.
    Aborting,
    /// Completed successfully.
    Done,
    /// Completed unsuccessfully.
    Error,
    /// Cancelled before completion.
    Aborted,
}

impl TaskStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error | TaskStatus::Aborted)
    }

    /// Whether this status represents a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Init => "init",
            TaskStatus::Running => "running",
            TaskStatus::Aborting => "aborting",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
            TaskStatus::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}
