//! Batch scheduler client.
//!
//! Translates submit/query/delete intents into invocations of the
//! scheduler's command-line programs and parses their textual output.
//! Every operation shells out and awaits the program synchronously; there
//! is no live streaming from a remote job, only reading its finished
//! output files.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::core::environment::Environment;
use crate::core::types::JobId;

use super::config::GridConfig;
use super::error::GridError;
use super::handle::{JobHandle, OutputStream};
use super::snapshot::StatusSnapshot;

/// One job submission: command vector, name, working directory, and an
/// optional environment overlay rendered into the launch descriptor.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// The command to execute, as an ordered argument vector.
    pub command: Vec<String>,
    /// Job name; whitespace is normalized to underscores at submit time.
    pub name: String,
    /// Directory the job runs in and the launch descriptor is written to.
    pub workdir: PathBuf,
    /// Environment overlay for the remote shell.
    pub env: Environment,
}

impl SubmitRequest {
    /// Create a request with an empty environment overlay.
    pub fn new(
        command: Vec<String>,
        name: impl Into<String>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command,
            name: name.into(),
            workdir: workdir.into(),
            env: Environment::new(),
        }
    }

    /// Builder: set the environment overlay.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Job name with whitespace runs replaced by underscores.
    pub fn normalized_name(&self) -> String {
        self.name.split_whitespace().collect::<Vec<_>>().join("_")
    }
}

/// Client for one PBS-style batch scheduler.
///
/// Holds its configuration immutably from construction; cloning the
/// surrounding `Arc` is how supervisors share it.
#[derive(Debug)]
pub struct GridClient {
    config: GridConfig,
}

impl GridClient {
    /// Create a client over the given configuration.
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    /// The injected configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Submit a job.
    ///
    /// Writes the launch descriptor `job_{name}.launch` into the request's
    /// working directory, invokes the submit program on it, and parses the
    /// job id from the program's stdout. The descriptor file is left on
    /// disk for the scheduler (and postmortems); this client never cleans
    /// it up.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, GridError> {
        if request.command.is_empty() {
            return Err(GridError::EmptyCommand);
        }
        let name = request.normalized_name();
        if name.is_empty() {
            return Err(GridError::EmptyName);
        }
        if self.config.is_empty() {
            return Err(GridError::ConfigurationMissing);
        }

        let script_path = self.write_launch_file(request, &name).await?;

        let output = Command::new(&self.config.submit_program)
            .arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| GridError::CommandIo {
                program: self.config.submit_program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw_id = stdout.lines().next().unwrap_or("").trim();
        if raw_id.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                program = %self.config.submit_program,
                stderr = %stderr.trim(),
                "submit program produced no job id"
            );
            return Err(GridError::SubmissionFailed {
                program: self.config.submit_program.clone(),
            });
        }

        let id = JobId::new(raw_id);
        let numeric = id.numeric().to_string();
        let handle = JobHandle {
            stdout_path: self.config.stdout_dir.join(format!("{}.o{}", name, numeric)),
            stderr_path: self.config.stderr_dir.join(format!("{}.e{}", name, numeric)),
            id,
            script_path,
            name,
            workdir: request.workdir.clone(),
        };
        debug!(job_id = %handle.id, script = %handle.script_path.display(), "job submitted");
        Ok(handle)
    }

    /// Fetch a fresh status snapshot for a job.
    ///
    /// A job the scheduler no longer knows yields an empty snapshot, not
    /// an error; the query program's exit code is ignored for the same
    /// reason.
    pub async fn status(&self, id: &JobId) -> Result<StatusSnapshot, GridError> {
        let output = Command::new(&self.config.query_program)
            .arg("-f")
            .arg(id.numeric())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| GridError::CommandIo {
                program: self.config.query_program.clone(),
                source,
            })?;

        Ok(StatusSnapshot::parse(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Whether the scheduler still reports the job in a live state
    /// (running, queued, held, moving, waiting, or exiting).
    pub async fn is_running(&self, id: &JobId) -> Result<bool, GridError> {
        Ok(self.status(id).await?.reports_running())
    }

    /// Remove a job from the scheduler.
    ///
    /// Returns `false` without invoking the delete program when the job is
    /// already not running, which makes repeated deletes (and deletes that
    /// race the job's own exit) no-ops. Returns `true` iff the delete
    /// program exits 0.
    pub async fn delete(&self, id: &JobId) -> Result<bool, GridError> {
        if !self.is_running(id).await? {
            debug!(job_id = %id, "job is not running; skipping delete");
            return Ok(false);
        }

        let status = Command::new(&self.config.delete_program)
            .arg(id.numeric())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| GridError::CommandIo {
                program: self.config.delete_program.clone(),
                source,
            })?;

        Ok(status.success())
    }

    /// Read a finished job's captured output lines.
    ///
    /// `None` when the file does not exist yet; the scheduler may not
    /// have flushed it.
    pub async fn read_output(
        &self,
        handle: &JobHandle,
        stream: OutputStream,
    ) -> Option<Vec<String>> {
        let path = handle.output_path(stream);
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Some(contents.lines().map(str::to_string).collect()),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "output file not readable");
                None
            }
        }
    }

    async fn write_launch_file(
        &self,
        request: &SubmitRequest,
        name: &str,
    ) -> Result<PathBuf, GridError> {
        let path = request.workdir.join(format!("job_{}.launch", name));

        let mut contents = self.config.directive(name, &request.workdir);
        contents.push('\n');
        if let Some(env_line) = request.env.shell_line() {
            contents.push_str(&env_line);
            contents.push('\n');
        }
        contents.push_str(&request.command.join(" "));
        contents.push('\n');

        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| GridError::LaunchFile {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
