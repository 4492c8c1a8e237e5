//! Command-shaped task.
//!
//! [`CommandTask`] wraps an external executable so it can be run under
//! any backend. The builder configures the program, its arguments, the
//! job directory, and an environment overlay.
//!
//! ```rust
//! use gridrun::CommandTask;
//!
//! let task = CommandTask::builder("python")
//!     .name("train_model")
//!     .args(["train.py", "--epochs", "30"])
//!     .env("PYTHONPATH", "/opt/models")
//!     .job_dir("/data/jobs/7")
//!     .build();
//! ```

use std::path::{Path, PathBuf};

use crate::core::environment::Environment;
use crate::core::resource::ResourceAllocation;
use crate::core::task::Task;

/// A task that executes a fixed external command.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    program: String,
    args: Vec<String>,
    environment: Environment,
    job_dir: PathBuf,
}

impl CommandTask {
    /// Create a new builder for a command task.
    pub fn builder(program: impl Into<String>) -> CommandTaskBuilder {
        CommandTaskBuilder::new(program)
    }

    /// Get the program being executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the command arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Task for CommandTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    fn task_arguments(
        &self,
        _resources: &ResourceAllocation,
        _env: &Environment,
    ) -> Option<Vec<String>> {
        if self.program.is_empty() {
            return None;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program.clone());
        args.extend(self.args.iter().cloned());
        Some(args)
    }

    fn environment(&self) -> Environment {
        self.environment.clone()
    }
}

/// Builder for [`CommandTask`] instances.
#[derive(Debug, Clone)]
pub struct CommandTaskBuilder {
    name: Option<String>,
    program: String,
    args: Vec<String>,
    environment: Environment,
    job_dir: PathBuf,
}

impl CommandTaskBuilder {
    /// Create a new builder with the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            name: None,
            program: program.into(),
            args: Vec::new(),
            environment: Environment::default(),
            job_dir: PathBuf::from("."),
        }
    }

    /// Set the task name. Defaults to the program name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the environment overlay.
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = env;
        self
    }

    /// Add a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment = self.environment.with_var(key, value);
        self
    }

    /// Set the job directory.
    pub fn job_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.job_dir = dir.into();
        self
    }

    /// Build the `CommandTask`.
    pub fn build(self) -> CommandTask {
        let name = self.name.unwrap_or_else(|| self.program.clone());
        CommandTask {
            name,
            program: self.program,
            args: self.args,
            environment: self.environment,
            job_dir: self.job_dir,
        }
    }
}
