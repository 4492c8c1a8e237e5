//! Grid client error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from interacting with the batch scheduler.
#[derive(Debug, Error)]
pub enum GridError {
    /// The grid configuration has no directive fields at all; nothing was
    /// sent to the scheduler.
    #[error("grid configuration is empty; set nodes, stdout_dir or stderr_dir before submitting")]
    ConfigurationMissing,

    /// The submit request carried no command.
    #[error("job command must not be empty")]
    EmptyCommand,

    /// The submit request carried no job name.
    #[error("job name must not be empty")]
    EmptyName,

    /// The submit program exited without printing a job id.
    #[error("'{program}' produced no job id")]
    SubmissionFailed { program: String },

    /// A scheduler program could not be invoked at all.
    #[error("failed to run '{program}': {source}")]
    CommandIo {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The launch descriptor could not be written.
    #[error("failed to write launch file '{path}': {source}")]
    LaunchFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
