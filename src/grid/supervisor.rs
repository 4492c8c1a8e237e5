//! Poll-loop supervision of one submitted job.
//!
//! The scheduler manages the job asynchronously and the only observation
//! channel is polling its status tables, so the supervisor is a small
//! state machine: `Init -> Running -> {Done, Error}`, with `Aborting`
//! entered once when the abort flag is observed. A graceful delete is
//! issued on entry to `Aborting`; if the job still reports running after
//! the grace period, exactly one forced delete follows. An empty status
//! snapshot is read as "the job left the queue". That heuristic cannot
//! tell completion apart from a transient query failure, so the terminal
//! verdict also consults the recorded exit indication and output files.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::core::abort::AbortFlag;
use crate::core::environment::Environment;
use crate::core::resource::ResourceAllocation;
use crate::core::task::{Task, TaskError};
use crate::core::types::{JobId, RunId, TaskId};
use crate::events::{Event, EventBus};
use crate::execution::backend::TaskReport;

use super::client::{GridClient, SubmitRequest};
use super::handle::{JobHandle, OutputStream};
use super::snapshot::StatusSnapshot;

/// What the poll loop observed by the time the job left the queue.
struct PollState {
    aborting: bool,
    last_snapshot: Option<StatusSnapshot>,
}

/// Supervises submitted jobs from submission to terminal status.
///
/// One `run` call owns exactly one job handle; instances share only the
/// immutable client configuration, so a supervisor can drive any number
/// of concurrent runs from separate tokio tasks.
pub struct GridSupervisor {
    client: Arc<GridClient>,
    events: EventBus,
}

impl GridSupervisor {
    /// Create a supervisor over a shared client.
    pub fn new(client: Arc<GridClient>) -> Self {
        Self {
            client,
            events: EventBus::new(),
        }
    }

    /// Builder: attach an event bus.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Run a task as a scheduler job and supervise it to a terminal
    /// status.
    ///
    /// Argument-construction and submission failures end the run in
    /// `Error` without anything to clean up. Unexpected errors while
    /// polling trigger a best-effort delete plus the task's `after_run`
    /// hook and then propagate.
    pub async fn run(
        &self,
        task: &dyn Task,
        resources: &ResourceAllocation,
        abort: &AbortFlag,
    ) -> Result<TaskReport, TaskError> {
        let task_id = TaskId::new(task.name());
        let run_id = RunId::new();
        let start = Instant::now();

        task.before_run().await?;

        let mut env = Environment::capture_from_process(&self.client.config().forward_env);
        env.merge(&task.environment());

        let args = match task.task_arguments(resources, &env) {
            Some(args) if !args.is_empty() => args,
            _ => {
                error!(task = %task_id, "could not create the task arguments");
                let report = TaskReport::failed(
                    task_id.clone(),
                    run_id,
                    TaskError::ArgumentsUnavailable.to_string(),
                    None,
                    start.elapsed(),
                    Vec::new(),
                );
                self.events
                    .emit(Event::task_failed(
                        task_id,
                        run_id,
                        TaskError::ArgumentsUnavailable.to_string(),
                        None,
                    ))
                    .await;
                return Ok(report);
            }
        };
        debug!(task = %task_id, ?args, "task subprocess args");

        let request = SubmitRequest::new(args, task.name(), task.job_dir()).with_env(env);
        let handle = match self.client.submit(&request).await {
            Ok(handle) => handle,
            Err(err) => {
                error!(task = %task_id, error = %err, "job submission failed");
                let report = TaskReport::failed(
                    task_id.clone(),
                    run_id,
                    err.to_string(),
                    None,
                    start.elapsed(),
                    Vec::new(),
                );
                self.events
                    .emit(Event::task_failed(task_id, run_id, err.to_string(), None))
                    .await;
                return Ok(report);
            }
        };

        info!(task = %task_id, job_id = %handle.id, "task started");
        self.events
            .emit(Event::job_submitted(
                task_id.clone(),
                run_id,
                handle.id.clone(),
            ))
            .await;
        self.events
            .emit(Event::task_started(task_id.clone(), run_id))
            .await;

        match self.poll(task, &handle, abort).await {
            Ok(state) => {
                // Scoped cleanup runs on every exit path. The job has
                // already left the queue here, so the delete is the
                // client-level no-op unless the loop raced the job's exit.
                let _ = self.client.delete(&handle.id).await;
                task.after_run().await;
                Ok(self
                    .finish(task, &handle, state, task_id, run_id, start)
                    .await)
            }
            Err(err) => {
                // Fatal path: remove the job if it is still there, give
                // the task its post-run hook, then propagate.
                self.try_delete(&handle.id, "cleanup").await;
                task.after_run().await;
                Err(err)
            }
        }
    }

    /// Poll until the scheduler no longer reports the job as live.
    async fn poll(
        &self,
        task: &dyn Task,
        handle: &JobHandle,
        abort: &AbortFlag,
    ) -> Result<PollState, TaskError> {
        let poll_interval = self.client.config().poll_interval();
        let abort_grace = self.client.config().abort_grace();
        let mut aborting_since: Option<Instant> = None;
        let mut escalated = false;
        let mut last_snapshot: Option<StatusSnapshot> = None;

        loop {
            let snapshot = self.client.status(&handle.id).await.map_err(TaskError::from)?;
            if snapshot.is_empty() {
                debug!(
                    job_id = %handle.id,
                    "scheduler no longer reports the job; treating it as finished"
                );
                break;
            }
            debug!(
                job_id = %handle.id,
                state = ?snapshot.state(),
                walltime = snapshot.get("resources_used.walltime"),
                "polled job status"
            );
            let running = snapshot.reports_running();
            last_snapshot = Some(snapshot);
            if !running {
                break;
            }

            if abort.is_set() && aborting_since.is_none() {
                warn!(task = %task.name(), job_id = %handle.id, "abort requested; deleting job");
                self.try_delete(&handle.id, "graceful").await;
                aborting_since = Some(Instant::now());
            }

            if let Some(since) = aborting_since {
                if !escalated && since.elapsed() > abort_grace {
                    warn!(
                        task = %task.name(),
                        job_id = %handle.id,
                        "job survived the abort grace period; forcing removal"
                    );
                    self.try_delete(&handle.id, "forced").await;
                    escalated = true;
                }
            }

            tokio::time::sleep(poll_interval).await;
        }

        Ok(PollState {
            aborting: aborting_since.is_some(),
            last_snapshot,
        })
    }

    /// Determine the terminal outcome once the job has left the queue.
    async fn finish(
        &self,
        task: &dyn Task,
        handle: &JobHandle,
        state: PollState,
        task_id: TaskId,
        run_id: RunId,
        start: Instant,
    ) -> TaskReport {
        let duration = start.elapsed();

        if state.aborting {
            warn!(task = %task_id, job_id = %handle.id, "task aborted");
            self.events
                .emit(Event::task_aborted(task_id.clone(), run_id, duration))
                .await;
            return TaskReport::aborted(task_id, run_id, duration);
        }

        let exit_code = state
            .last_snapshot
            .as_ref()
            .and_then(StatusSnapshot::exit_status);

        let stdout_lines = self
            .client
            .read_output(handle, OutputStream::Stdout)
            .await
            .unwrap_or_default();
        let stderr_lines = self
            .client
            .read_output(handle, OutputStream::Stderr)
            .await
            .unwrap_or_default();

        let mut unrecognized = Vec::new();
        for line in &stdout_lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !task.process_output(line) {
                debug!(task = %task_id, line, "unrecognized output");
                unrecognized.push(line.to_string());
            }
        }

        match exit_code {
            Some(code) if code != 0 => {
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
                let error = TaskError::CommandFailed(code).to_string();
                self.events
                    .emit(Event::task_failed(
                        task_id.clone(),
                        run_id,
                        error.clone(),
                        Some(code),
                    ))
                    .await;
                TaskReport::failed(task_id, run_id, error, Some(code), duration, diagnostics)
            }
            _ => {
                info!(task = %task_id, "task completed");
                self.events
                    .emit(Event::task_completed(
                        task_id.clone(),
                        run_id,
                        duration,
                        exit_code,
                    ))
                    .await;
                TaskReport::done(task_id, run_id, exit_code, duration)
            }
        }
    }

    /// Best-effort job removal; failures are logged, never propagated.
    /// The grace timer is the backstop when a delete does not stick.
    async fn try_delete(&self, id: &JobId, phase: &str) {
        match self.client.delete(id).await {
            Ok(true) => {}
            Ok(false) => {
                error!(job_id = %id, phase, "failed to delete submitted job");
            }
            Err(err) => {
                error!(job_id = %id, phase, error = %err, "failed to delete submitted job");
            }
        }
    }
}
