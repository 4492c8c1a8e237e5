//! Task trait and error types.
//!
//! A [`Task`] describes one long-lived unit of work and the hooks a
//! backend drives around it. Backends own the lifecycle; tasks only
//! supply their command line and react to the hook calls.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use super::environment::Environment;
use super::resource::ResourceAllocation;

/// Errors that can occur while a backend runs a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task produced no runnable arguments; nothing was started.
    #[error("task produced no runnable arguments")]
    ArgumentsUnavailable,

    /// The task's command could not be spawned locally.
    #[error("failed to spawn command: {0}")]
    SpawnFailed(String),

    /// The task's process exited with a non-zero code.
    #[error("command exited with code {0}")]
    CommandFailed(i32),

    /// The task was cancelled before completing.
    #[error("task aborted before completion")]
    Aborted,

    /// A `before_run` hook refused to start the task.
    #[error("before_run hook failed: {0}")]
    Hook(String),

    /// A scheduler interaction failed.
    #[error(transparent)]
    Grid(#[from] crate::grid::GridError),

    /// An I/O failure while supervising the task.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The unit of work a backend executes and supervises.
///
/// The required surface is the job's identity (`name`, `job_dir`) and its
/// command line (`task_arguments`). The remaining hooks have no-op
/// defaults: `before_run`/`after_run` bracket every run (`after_run` runs
/// on the error path too), `after_runtime_error` fires when the process
/// exits unsuccessfully, and `process_output` sees each captured stdout
/// line, returning `false` for lines it does not recognize so the backend
/// can attach them to a failure as diagnostics.
///
/// # Example
///
/// ```ignore
/// use gridrun::{Environment, ResourceAllocation, Task};
///
/// struct Train {
///     job_dir: std::path::PathBuf,
/// }
///
/// #[async_trait::async_trait]
/// impl Task for Train {
///     fn name(&self) -> &str {
///         "train_model"
///     }
///
///     fn job_dir(&self) -> &std::path::Path {
///         &self.job_dir
///     }
///
///     fn task_arguments(
///         &self,
///         resources: &ResourceAllocation,
///         _env: &Environment,
///     ) -> Option<Vec<String>> {
///         let mut args = vec!["python".into(), "train.py".into()];
///         if let Some(gpu) = resources.first("gpu") {
///             args.push(format!("--gpu={gpu}"));
///         }
///         Some(args)
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync {
    /// Returns the unique name/identifier for this task.
    fn name(&self) -> &str;

    /// Directory the task runs in; launch descriptors are written here.
    fn job_dir(&self) -> &Path;

    /// Build the command vector for this run.
    ///
    /// Returning `None` (or an empty vector) fails the run before anything
    /// is spawned or submitted.
    fn task_arguments(
        &self,
        resources: &ResourceAllocation,
        env: &Environment,
    ) -> Option<Vec<String>>;

    /// Extra environment variables for this task.
    fn environment(&self) -> Environment {
        Environment::new()
    }

    /// Called before anything is spawned or submitted.
    async fn before_run(&self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Called after the run finishes, on every exit path.
    async fn after_run(&self) {}

    /// Called when the process exited unsuccessfully, before the terminal
    /// report is produced.
    async fn after_runtime_error(&self) {}

    /// Inspect one line of captured stdout.
    ///
    /// Return `true` if the line was recognized and consumed; `false`
    /// lines are collected and attached to a failing run as diagnostics.
    fn process_output(&self, line: &str) -> bool {
        let _ = line;
        false
    }

    /// Optional description for display/logging purposes.
    fn description(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct EchoTask {
        job_dir: PathBuf,
    }

    #[async_trait]
    impl Task for EchoTask {
        fn name(&self) -> &str {
            "echo"
        }

        fn job_dir(&self) -> &Path {
            &self.job_dir
        }

        fn task_arguments(
            &self,
            resources: &ResourceAllocation,
            _env: &Environment,
        ) -> Option<Vec<String>> {
            let mut args = vec!["echo".to_string()];
            args.extend(resources.slot("gpu").iter().cloned());
            Some(args)
        }
    }

    struct NoArgsTask {
        job_dir: PathBuf,
    }

    #[async_trait]
    impl Task for NoArgsTask {
        fn name(&self) -> &str {
            "no_args"
        }

        fn job_dir(&self) -> &Path {
            &self.job_dir
        }

        fn task_arguments(
            &self,
            _resources: &ResourceAllocation,
            _env: &Environment,
        ) -> Option<Vec<String>> {
            None
        }
    }

    #[test]
    fn test_arguments_include_resources() {
        let task = EchoTask {
            job_dir: PathBuf::from("/tmp"),
        };
        let resources = ResourceAllocation::none().with_slot("gpu", ["0", "1"]);

        let args = task.task_arguments(&resources, &Environment::new()).unwrap();

        assert_eq!(args, ["echo", "0", "1"]);
    }

    #[test]
    fn test_arguments_can_be_absent() {
        let task = NoArgsTask {
            job_dir: PathBuf::from("/tmp"),
        };

        assert!(task
            .task_arguments(&ResourceAllocation::none(), &Environment::new())
            .is_none());
    }

    #[test]
    fn test_default_hooks() {
        let task = EchoTask {
            job_dir: PathBuf::from("/tmp"),
        };

        assert!(task.environment().is_empty());
        assert!(task.description().is_none());
        assert!(!task.process_output("anything"));
    }

    #[test]
    fn test_error_display() {
        let err = TaskError::CommandFailed(42);
        assert_eq!(err.to_string(), "command exited with code 42");

        let err = TaskError::ArgumentsUnavailable;
        assert!(err.to_string().contains("no runnable arguments"));
    }
}
