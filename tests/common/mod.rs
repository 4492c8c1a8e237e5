//! Common test utilities shared across integration tests.

use std::time::Duration;

use gridrun::{AbortFlag, CommandTask};

/// Build a shell command task running in the given directory.
///
/// The script rides in a single `sh -c` argument, which only survives the
/// local backend's argv-based spawn; for the grid path use
/// [`script_task`], since launch descriptors flatten the command to one
/// space-joined line.
pub fn shell_task(name: &str, script: &str, job_dir: &std::path::Path) -> CommandTask {
    CommandTask::builder("sh")
        .name(name)
        .arg("-c")
        .arg(script)
        .job_dir(job_dir)
        .build()
}

/// Write `script` to `<job_dir>/<name>.sh` and build a task that runs it
/// with `sh`. Safe for both backends.
pub fn script_task(name: &str, script: &str, job_dir: &std::path::Path) -> CommandTask {
    let path = job_dir.join(format!("{}.sh", name));
    std::fs::write(&path, script).expect("failed to write test script");
    CommandTask::builder("sh")
        .name(name)
        .arg(path.display().to_string())
        .job_dir(job_dir)
        .build()
}

/// Raise the abort flag after a delay, from a background task.
pub fn abort_after(abort: &AbortFlag, delay: Duration) {
    let abort = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        abort.set();
    });
}
