//! Execution backend capability interface.
//!
//! A backend runs one task to a deterministic terminal status. The
//! concrete strategy (local subprocess vs. batch-scheduler job) is picked
//! once, at startup, by [`create_backend`]; callers hold an
//! `Arc<dyn ExecutionBackend>` and never learn which one they got.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::core::abort::AbortFlag;
use crate::core::resource::ResourceAllocation;
use crate::core::status::TaskStatus;
use crate::core::task::{Task, TaskError};
use crate::core::types::{RunId, TaskId};
use crate::events::EventBus;

use super::grid::GridBackend;
use super::local::LocalBackend;

/// Recognized backend names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Run tasks as local subprocesses.
    Local,
    /// Submit tasks to the batch scheduler and supervise by polling.
    Grid,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BackendKind::Local),
            "grid" => Ok(BackendKind::Grid),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Grid => write!(f, "grid"),
        }
    }
}

/// Terminal report of one task run.
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// The task that ran.
    pub task_id: TaskId,
    /// This run's identifier.
    pub run_id: RunId,
    /// Terminal status: Done, Error, or Aborted.
    pub status: TaskStatus,
    /// Exit code when one was observed.
    pub exit_code: Option<i32>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Error message for failed or aborted runs.
    pub error: Option<String>,
    /// Captured output lines the task did not recognize; attached to
    /// failures as context.
    pub diagnostics: Vec<String>,
}

impl TaskReport {
    /// Create a successful report.
    pub fn done(task_id: TaskId, run_id: RunId, exit_code: Option<i32>, duration: Duration) -> Self {
        Self {
            task_id,
            run_id,
            status: TaskStatus::Done,
            exit_code,
            duration,
            error: None,
            diagnostics: Vec::new(),
        }
    }

    /// Create a failed report.
    pub fn failed(
        task_id: TaskId,
        run_id: RunId,
        error: String,
        exit_code: Option<i32>,
        duration: Duration,
        diagnostics: Vec<String>,
    ) -> Self {
        Self {
            task_id,
            run_id,
            status: TaskStatus::Error,
            exit_code,
            duration,
            error: Some(error),
            diagnostics,
        }
    }

    /// Create an aborted report.
    pub fn aborted(task_id: TaskId, run_id: RunId, duration: Duration) -> Self {
        Self {
            task_id,
            run_id,
            status: TaskStatus::Aborted,
            exit_code: None,
            duration,
            error: Some(TaskError::Aborted.to_string()),
            diagnostics: Vec::new(),
        }
    }

    /// Whether the run completed successfully.
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// A strategy for running one task to completion.
///
/// `run` returns `Ok` with a terminal report for every normal outcome,
/// including failures and aborts; `Err` is reserved for unexpected
/// supervision errors after best-effort cleanup has already happened.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Which strategy this backend implements.
    fn kind(&self) -> BackendKind;

    /// Run a task to a terminal status.
    async fn run(
        &self,
        task: &dyn Task,
        resources: &ResourceAllocation,
        abort: &AbortFlag,
    ) -> Result<TaskReport, TaskError>;
}

/// Build the backend selected by the configuration.
///
/// Called once at process start; the returned backend is shared by every
/// subsequent task. Unrecognized backend names were already rejected when
/// the configuration was parsed.
pub fn create_backend(config: &Config, events: EventBus) -> Arc<dyn ExecutionBackend> {
    match config.backend {
        BackendKind::Local => Arc::new(LocalBackend::new().with_event_bus(events)),
        BackendKind::Grid => {
            Arc::new(GridBackend::new(config.grid.clone()).with_event_bus(events))
        }
    }
}
