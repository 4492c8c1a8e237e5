//! Local backend integration tests.

use gridrun::testing::{InstrumentedTask, RecordingHandler};
use gridrun::{
    AbortFlag, Event, EventBus, ExecutionBackend, LocalBackend, ResourceAllocation, TaskStatus,
};

use crate::common::shell_task;

#[tokio::test]
async fn test_successful_command_reaches_done() {
    let dir = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new();
    let task = shell_task("hello", "echo hello", dir.path());

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Done);
    assert_eq!(report.exit_code, Some(0));
}

#[tokio::test]
async fn test_failing_command_reaches_error_with_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new();
    let task = shell_task("failer", "echo only_line; echo complaint >&2; exit 9", dir.path());

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Error);
    assert_eq!(report.exit_code, Some(9));
    assert!(report.diagnostics.contains(&"only_line".to_string()));
    assert!(report.diagnostics.contains(&"complaint".to_string()));
}

#[tokio::test]
async fn test_environment_overlay_reaches_subprocess() {
    let dir = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new();
    // A failing command so the captured stdout surfaces as diagnostics.
    let task = gridrun::CommandTask::builder("sh")
        .name("env_probe")
        .arg("-c")
        .arg("echo value:$GRIDRUN_PROBE; exit 1")
        .env("GRIDRUN_PROBE", "forwarded")
        .job_dir(dir.path())
        .build();

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert!(report.diagnostics.contains(&"value:forwarded".to_string()));
}

#[tokio::test]
async fn test_job_dir_is_the_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new();
    let task = shell_task("pwd_probe", "pwd; exit 1", dir.path());

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    let reported = report.diagnostics.first().expect("pwd output captured");
    assert_eq!(
        std::fs::canonicalize(reported).unwrap(),
        std::fs::canonicalize(dir.path()).unwrap()
    );
}

#[tokio::test]
async fn test_hooks_fire_on_both_paths() {
    let dir = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new();

    let ok_task = InstrumentedTask::new(shell_task("ok", "true", dir.path()));
    backend
        .run(&ok_task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();
    assert_eq!(ok_task.before_run_calls(), 1);
    assert_eq!(ok_task.after_run_calls(), 1);
    assert_eq!(ok_task.after_runtime_error_calls(), 0);

    let bad_task = InstrumentedTask::new(shell_task("bad", "exit 1", dir.path()));
    backend
        .run(&bad_task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();
    assert_eq!(bad_task.after_run_calls(), 1);
    assert_eq!(bad_task.after_runtime_error_calls(), 1);
}

#[tokio::test]
async fn test_events_for_local_run() {
    let dir = tempfile::tempdir().unwrap();
    let events = EventBus::new();
    let handler = RecordingHandler::new();
    events.register(handler.clone()).await;
    let backend = LocalBackend::new().with_event_bus(events);
    let task = shell_task("observed", "true", dir.path());

    backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    let recorded = handler.recorded().await;
    assert_eq!(recorded.len(), 2);
    assert!(matches!(recorded[0], Event::TaskStarted { .. }));
    assert!(matches!(recorded[1], Event::TaskCompleted { .. }));
}
