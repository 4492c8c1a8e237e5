//! Grid scheduler configuration.
//!
//! One immutable `GridConfig` is built at startup and injected into the
//! client; nothing mutates it afterwards, so supervisors on different
//! tasks can share it freely.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_abort_grace_ms() -> u64 {
    2_000
}

fn default_forward_env() -> Vec<String> {
    ["PATH", "LD_LIBRARY_PATH", "PYTHONPATH"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_submit_program() -> String {
    "qsub".to_string()
}

fn default_query_program() -> String {
    "qstat".to_string()
}

fn default_delete_program() -> String {
    "qdel".to_string()
}

/// Configuration for submitting to and supervising a PBS-style scheduler.
///
/// The directive fields (`nodes`, `stdout_dir`, `stderr_dir`) may be set
/// partially; empty fields are omitted from the generated `#PBS` line. A
/// configuration with no directive fields at all is considered
/// unestablished and submission fails with
/// [`GridError::ConfigurationMissing`](super::GridError::ConfigurationMissing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Node/resource request, rendered as `-l nodes=<value>`.
    pub nodes: String,

    /// Directory the scheduler writes job stdout files into (`-o`).
    pub stdout_dir: PathBuf,

    /// Directory the scheduler writes job stderr files into (`-e`).
    pub stderr_dir: PathBuf,

    /// Poll cadence of the supervisor loop, in milliseconds.
    pub poll_interval_ms: u64,

    /// How long after a graceful delete to wait before forcing a second
    /// removal, in milliseconds.
    pub abort_grace_ms: u64,

    /// Process environment variables forwarded into the launch
    /// descriptor's environment line.
    pub forward_env: Vec<String>,

    /// Submit program. Overridable for wrapper scripts and tests.
    pub submit_program: String,

    /// Detailed-status query program.
    pub query_program: String,

    /// Job removal program.
    pub delete_program: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nodes: String::new(),
            stdout_dir: PathBuf::new(),
            stderr_dir: PathBuf::new(),
            poll_interval_ms: default_poll_interval_ms(),
            abort_grace_ms: default_abort_grace_ms(),
            forward_env: default_forward_env(),
            submit_program: default_submit_program(),
            query_program: default_query_program(),
            delete_program: default_delete_program(),
        }
    }
}

impl GridConfig {
    /// Create a configuration with all directive fields set.
    pub fn new(
        nodes: impl Into<String>,
        stdout_dir: impl Into<PathBuf>,
        stderr_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            nodes: nodes.into(),
            stdout_dir: stdout_dir.into(),
            stderr_dir: stderr_dir.into(),
            ..Self::default()
        }
    }

    /// Builder: set the node/resource request.
    pub fn with_nodes(mut self, nodes: impl Into<String>) -> Self {
        self.nodes = nodes.into();
        self
    }

    /// Builder: set the stdout directory.
    pub fn with_stdout_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stdout_dir = dir.into();
        self
    }

    /// Builder: set the stderr directory.
    pub fn with_stderr_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stderr_dir = dir.into();
        self
    }

    /// Whether no directive field has been established.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.stdout_dir.as_os_str().is_empty()
            && self.stderr_dir.as_os_str().is_empty()
    }

    /// Supervisor poll cadence.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Grace period between the graceful and the forced delete.
    pub fn abort_grace(&self) -> Duration {
        Duration::from_millis(self.abort_grace_ms)
    }

    /// Render the scheduler directive line for a job.
    ///
    /// Empty directive fields are omitted; the job name and working
    /// directory are always appended.
    pub fn directive(&self, name: &str, workdir: &Path) -> String {
        let mut line = String::from("#PBS");
        if !self.nodes.is_empty() {
            line.push_str(&format!(" -l nodes={}", self.nodes));
        }
        if !self.stdout_dir.as_os_str().is_empty() {
            line.push_str(&format!(" -o {}", self.stdout_dir.display()));
        }
        if !self.stderr_dir.as_os_str().is_empty() {
            line.push_str(&format!(" -e {}", self.stderr_dir.display()));
        }
        line.push_str(&format!(" -N {}", name));
        if !workdir.as_os_str().is_empty() {
            line.push_str(&format!(" -d {}", workdir.display()));
        }
        line
    }
}
