//! Local subprocess backend.
//!
//! Runs the task's command directly on this host with piped stdio,
//! feeding captured stdout through the task's `process_output` hook line
//! by line. The abort flag is observed at poll boundaries and kills the
//! child; the two-phase graceful/forced escalation is a scheduler-side
//! concern and does not apply here, where the OS owns the process.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::core::abort::AbortFlag;
use crate::core::environment::Environment;
use crate::core::resource::ResourceAllocation;
use crate::core::task::{Task, TaskError};
use crate::core::types::{RunId, TaskId};
use crate::events::{Event, EventBus};

use super::backend::{BackendKind, ExecutionBackend, TaskReport};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backend that executes tasks as child processes of this one.
pub struct LocalBackend {
    events: EventBus,
    poll_interval: Duration,
}

impl LocalBackend {
    /// Create a backend with the default abort-poll cadence.
    pub fn new() -> Self {
        Self {
            events: EventBus::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Builder: attach an event bus.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Builder: set how often the abort flag is checked while the child
    /// produces no output.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn run(
        &self,
        task: &dyn Task,
        resources: &ResourceAllocation,
        abort: &AbortFlag,
    ) -> Result<TaskReport, TaskError> {
        let task_id = TaskId::new(task.name());
        let run_id = RunId::new();
        let start = Instant::now();

        task.before_run().await?;

        let env = task.environment();
        let args = match task.task_arguments(resources, &env) {
            Some(args) if !args.is_empty() => args,
            _ => {
                error!(task = %task_id, "could not create the task arguments");
                return Ok(self
                    .fail(
                        task_id,
                        run_id,
                        TaskError::ArgumentsUnavailable.to_string(),
                        None,
                        start,
                        Vec::new(),
                    )
                    .await);
            }
        };
        debug!(task = %task_id, ?args, "task subprocess args");

        let (program, rest) = args.split_first().expect("checked non-empty");
        let mut command = Command::new(program);
        command
            .args(rest)
            .current_dir(task.job_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env.iter() {
            command.env(key, value);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(task = %task_id, error = %err, "failed to spawn task subprocess");
                task.after_run().await;
                return Ok(self
                    .fail(
                        task_id,
                        run_id,
                        TaskError::SpawnFailed(err.to_string()).to_string(),
                        None,
                        start,
                        Vec::new(),
                    )
                    .await);
            }
        };

        info!(task = %task_id, "task started");
        self.events
            .emit(Event::task_started(task_id.clone(), run_id))
            .await;

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");
        let stderr_reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
            collected
        });

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut unrecognized = Vec::new();
        let mut aborted = false;
        loop {
            tokio::select! {
                line = stdout_lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if !task.process_output(line) {
                            debug!(task = %task_id, line, "unrecognized output");
                            unrecognized.push(line.to_string());
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(task = %task_id, error = %err, "stopped reading task output");
                        break;
                    }
                },
                _ = tokio::time::sleep(self.poll_interval) => {
                    if abort.is_set() && !aborted {
                        warn!(task = %task_id, "abort requested; killing task subprocess");
                        if let Err(err) = child.start_kill() {
                            error!(task = %task_id, error = %err, "failed to kill task subprocess");
                        }
                        aborted = true;
                    }
                }
            }
        }

        let exit = match child.wait().await {
            Ok(exit) => exit,
            Err(err) => {
                // The post-run hook runs on every exit path.
                task.after_run().await;
                return Err(err.into());
            }
        };
        let stderr_lines = stderr_reader.await.unwrap_or_default();
        task.after_run().await;
        let duration = start.elapsed();

        if aborted {
            warn!(task = %task_id, "task aborted");
            self.events
                .emit(Event::task_aborted(task_id.clone(), run_id, duration))
                .await;
            return Ok(TaskReport::aborted(task_id, run_id, duration));
        }

        if exit.success() {
            info!(task = %task_id, "task completed");
            self.events
                .emit(Event::task_completed(
                    task_id.clone(),
                    run_id,
                    duration,
                    Some(0),
                ))
                .await;
            return Ok(TaskReport::done(task_id, run_id, Some(0), duration));
        }

        let code = exit.code().unwrap_or(-1);
        error!(task = %task_id, code, "task failed");
        task.after_runtime_error().await;
        let mut diagnostics = unrecognized;
        diagnostics.extend(
            stderr_lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
        Ok(self
            .fail(
                task_id,
                run_id,
                TaskError::CommandFailed(code).to_string(),
                Some(code),
                start,
                diagnostics,
            )
            .await)
    }
}

impl LocalBackend {
    async fn fail(
        &self,
        task_id: TaskId,
        run_id: RunId,
        error: String,
        exit_code: Option<i32>,
        start: Instant,
        diagnostics: Vec<String>,
    ) -> TaskReport {
        self.events
            .emit(Event::task_failed(
                task_id.clone(),
                run_id,
                error.clone(),
                exit_code,
            ))
            .await;
        TaskReport::failed(
            task_id,
            run_id,
            error,
            exit_code,
            start.elapsed(),
            diagnostics,
        )
    }
}
