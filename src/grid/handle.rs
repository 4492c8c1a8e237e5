//! Handle to a submitted job.

use std::path::{Path, PathBuf};

use crate::core::types::JobId;

/// Which captured output stream of a finished job to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// The result of a successful submission.
///
/// Created by [`GridClient::submit`](super::GridClient::submit) and
/// read-only for the lifetime of supervision. The artifact paths are
/// derived at submission time: `{stdout_dir}/{name}.o{numeric}` and
/// `{stderr_dir}/{name}.e{numeric}`.
#[derive(Debug, Clone)]
pub struct JobHandle {
    /// The scheduler-assigned identifier.
    pub id: JobId,
    /// The launch descriptor written for this submission.
    pub script_path: PathBuf,
    /// Normalized job name.
    pub name: String,
    /// Directory the job runs in.
    pub workdir: PathBuf,
    /// Where the scheduler will place the job's stdout.
    pub stdout_path: PathBuf,
    /// Where the scheduler will place the job's stderr.
    pub stderr_path: PathBuf,
}

impl JobHandle {
    /// The numeric portion of the job id.
    pub fn numeric_id(&self) -> &str {
        self.id.numeric()
    }

    /// Path of the derived artifact file for a stream.
    pub fn output_path(&self, stream: OutputStream) -> &Path {
        match stream {
            OutputStream::Stdout => &self.stdout_path,
            OutputStream::Stderr => &self.stderr_path,
        }
    }
}
