//! gridrun - run tasks as local subprocesses or as supervised
//! batch-scheduler jobs.
//!
//! A [`Task`] describes one unit of work; an [`ExecutionBackend`] runs it
//! to a terminal [`TaskStatus`]. The `local` backend spawns the task's
//! command on this host; the `grid` backend submits it to a PBS-style
//! scheduler and supervises the job by polling, honoring cooperative
//! aborts with a graceful-then-forced delete escalation. Callers pick a
//! backend once, at startup, via [`Config`] and [`create_backend`], and
//! never learn which strategy they got.

pub mod config;
pub mod core;
pub mod events;
pub mod execution;
pub mod grid;
pub mod testing;

pub use config::{Config, ConfigError};
pub use core::abort::AbortFlag;
pub use core::environment::Environment;
pub use core::resource::ResourceAllocation;
pub use core::status::TaskStatus;
pub use core::task::{Task, TaskError};
pub use core::types::{JobId, RunId, TaskId};
pub use events::{Event, EventBus, EventHandler};
pub use execution::{
    create_backend, BackendKind, CommandTask, CommandTaskBuilder, ExecutionBackend, GridBackend,
    LocalBackend, TaskReport,
};
pub use grid::{
    GridClient, GridConfig, GridError, GridSupervisor, JobHandle, JobState, OutputStream,
    StatusSnapshot, SubmitRequest,
};
