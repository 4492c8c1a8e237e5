//! Cooperative abort and delete-escalation tests.

use std::time::Duration;

use gridrun::testing::{FakeGrid, InstrumentedTask};
use gridrun::{
    AbortFlag, ExecutionBackend, GridBackend, LocalBackend, ResourceAllocation, TaskStatus,
};

use crate::common::{abort_after, script_task, shell_task};

#[tokio::test]
async fn test_grid_abort_issues_one_graceful_delete() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = InstrumentedTask::new(script_task("long", "sleep 30\n", fake.workdir()));

    let abort = AbortFlag::new();
    abort_after(&abort, Duration::from_millis(150));

    let report = backend
        .run(&task, &ResourceAllocation::none(), &abort)
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Aborted);
    // The graceful delete removed the job before the grace period ran
    // out, so exactly one delete was issued.
    assert_eq!(fake.invocations("qdel"), 1);
    // Cleanup hook still ran.
    assert_eq!(task.after_run_calls(), 1);
    assert_eq!(task.after_runtime_error_calls(), 0);
}

#[tokio::test]
async fn test_grid_abort_escalates_exactly_once() {
    let fake = FakeGrid::new().unwrap();
    // The first delete of the job is swallowed; only the forced delete
    // after the grace period actually removes it.
    fake.hold_first_delete().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = script_task("stubborn", "sleep 30\n", fake.workdir());

    let abort = AbortFlag::new();
    abort_after(&abort, Duration::from_millis(150));

    let report = backend
        .run(&task, &ResourceAllocation::none(), &abort)
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Aborted);
    assert_eq!(
        fake.invocations("qdel"),
        2,
        "expected one graceful and one forced delete"
    );
}

#[tokio::test]
async fn test_abort_latency_is_bounded_by_polling() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = script_task("bounded", "sleep 30\n", fake.workdir());

    let abort = AbortFlag::new();
    abort_after(&abort, Duration::from_millis(100));

    let start = std::time::Instant::now();
    let report = backend
        .run(&task, &ResourceAllocation::none(), &abort)
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Aborted);
    // 30s job, 50ms polls: the abort must land far sooner than the job
    // would have taken.
    assert!(
        start.elapsed() < Duration::from_secs(10),
        "abort took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_local_abort_kills_subprocess() {
    let dir = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new().with_poll_interval(Duration::from_millis(20));
    let task = shell_task("local_long", "sleep 30", dir.path());

    let abort = AbortFlag::new();
    abort_after(&abort, Duration::from_millis(100));

    let start = std::time::Instant::now();
    let report = backend
        .run(&task, &ResourceAllocation::none(), &abort)
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Aborted);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_abort_before_start_still_terminates() {
    let fake = FakeGrid::new().unwrap();
    let backend = GridBackend::new(fake.grid_config());
    let task = script_task("preaborted", "sleep 30\n", fake.workdir());

    let abort = AbortFlag::new();
    abort.set();

    let report = backend
        .run(&task, &ResourceAllocation::none(), &abort)
        .await
        .unwrap();

    assert_eq!(report.status, TaskStatus::Aborted);
}
