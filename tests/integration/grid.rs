//! Grid backend integration tests against the scripted fake scheduler.

use std::time::Duration;

use gridrun::testing::{FakeGrid, InstrumentedTask, RecordingHandler};
use gridrun::{
    AbortFlag, CommandTask, Event, EventBus, ExecutionBackend, GridBackend, ResourceAllocation,
    TaskStatus,
};

use crate::common::script_task;

#[tokio::test]
async fn test_successful_job_reaches_done() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = script_task("greet", "echo hello\n", fake.workdir());

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Done);
    assert_eq!(report.exit_code, Some(0));
    assert!(report.error.is_none());

    // The scheduler captured the job's stdout into the derived artifact.
    let artifacts: Vec<_> = std::fs::read_dir(fake.output_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        artifacts.iter().any(|name| name.starts_with("greet.o")),
        "expected a greet.o* artifact, got {:?}",
        artifacts
    );
}

#[tokio::test]
async fn test_failing_job_reaches_error_with_diagnostics() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = script_task(
        "failer",
        "echo unexpected_line\necho boom >&2\nexit 3\n",
        fake.workdir(),
    );

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Error);
    assert_eq!(report.exit_code, Some(3));
    assert!(report.error.unwrap().contains("code 3"));
    // Unrecognized stdout and captured stderr both land in diagnostics.
    assert!(report.diagnostics.contains(&"unexpected_line".to_string()));
    assert!(report.diagnostics.contains(&"boom".to_string()));
}

#[tokio::test]
async fn test_empty_command_fails_before_scheduler_contact() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = CommandTask::builder("")
        .name("empty")
        .job_dir(fake.workdir())
        .build();

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Error);
    assert!(report.error.unwrap().contains("no runnable arguments"));
    assert_eq!(fake.invocations("qsub"), 0);
}

#[tokio::test]
async fn test_hooks_fire_on_success() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = InstrumentedTask::new(script_task("hooked", "true\n", fake.workdir()));

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Done);
    assert_eq!(task.before_run_calls(), 1);
    assert_eq!(task.after_run_calls(), 1);
    assert_eq!(task.after_runtime_error_calls(), 0);
}

#[tokio::test]
async fn test_hooks_fire_on_failure() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = InstrumentedTask::new(script_task("hooked_failure", "exit 7\n", fake.workdir()));

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Error);
    assert_eq!(report.exit_code, Some(7));
    assert_eq!(task.after_run_calls(), 1);
    assert_eq!(task.after_runtime_error_calls(), 1);
}

#[tokio::test]
async fn test_events_are_emitted_in_lifecycle_order() {
    let fake = FakeGrid::new().unwrap();
    let events = EventBus::new();
    let handler = RecordingHandler::new();
    events.register(handler.clone()).await;
    let backend = GridBackend::new(fake.grid_config()).with_event_bus(events);
    let task = script_task("observed", "true\n", fake.workdir());

    let report = backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();
    assert_eq!(report.status, TaskStatus::Done);

    let recorded = handler.recorded().await;
    assert_eq!(recorded.len(), 3);
    assert!(matches!(recorded[0], Event::JobSubmitted { .. }));
    assert!(matches!(recorded[1], Event::TaskStarted { .. }));
    assert!(matches!(recorded[2], Event::TaskCompleted { .. }));
}

#[tokio::test]
async fn test_delete_is_idempotent_once_job_is_gone() {
    let fake = FakeGrid::new().unwrap();
    let client = gridrun::GridClient::new(fake.grid_config());
    let request = gridrun::SubmitRequest::new(
        vec!["sleep".to_string(), "30".to_string()],
        "victim",
        fake.workdir(),
    );
    let handle = client.submit(&request).await.unwrap();

    // First delete reaches the scheduler and removes the job.
    assert!(client.delete(&handle.id).await.unwrap());
    assert_eq!(fake.invocations("qdel"), 1);

    // Wait for the scheduler to stop reporting it.
    let start = std::time::Instant::now();
    while client.is_running(&handle.id).await.unwrap() {
        assert!(start.elapsed() < Duration::from_secs(5), "job never left the queue");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Second delete is a no-op: returns false without invoking the CLI.
    assert!(!client.delete(&handle.id).await.unwrap());
    assert_eq!(fake.invocations("qdel"), 1);
}

#[tokio::test]
async fn test_launch_descriptor_left_in_workdir() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = script_task("descriptor", "true\n", fake.workdir());

    backend
        .run(&task, &ResourceAllocation::none(), &AbortFlag::new())
        .await
        .unwrap();

    // Submission writes one descriptor per job and never cleans it up.
    let descriptor = fake.workdir().join("job_descriptor.launch");
    assert!(descriptor.exists());
    let contents = std::fs::read_to_string(descriptor).unwrap();
    assert!(contents.starts_with("#PBS "));
    let command_line = contents.lines().last().unwrap();
    assert!(command_line.starts_with("sh "));
    assert!(command_line.ends_with("descriptor.sh"));
}
