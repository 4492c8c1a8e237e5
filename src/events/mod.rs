//! Lifecycle events and event handling.
//!
//! Backends emit events as a task run moves through its lifecycle,
//! giving callers observability without coupling them to a backend.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::{JobId, RunId, TaskId};

/// Lifecycle events emitted during execution.
#[derive(Debug, Clone)]
pub enum Event {
    /// A job was accepted by the batch scheduler.
    JobSubmitted {
        task_id: TaskId,
        run_id: RunId,
        job_id: JobId,
        timestamp: Instant,
    },

    /// A task has started execution.
    TaskStarted {
        task_id: TaskId,
        run_id: RunId,
        timestamp: Instant,
    },

    /// A task completed successfully.
    TaskCompleted {
        task_id: TaskId,
        run_id: RunId,
        duration: Duration,
        exit_code: Option<i32>,
        timestamp: Instant,
    },

    /// A task failed.
    TaskFailed {
        task_id: TaskId,
        run_id: RunId,
        error: String,
        exit_code: Option<i32>,
        timestamp: Instant,
    },

    /// A task was cancelled before completion.
    TaskAborted {
        task_id: TaskId,
        run_id: RunId,
        duration: Duration,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::JobSubmitted { timestamp, .. } => *timestamp,
            Event::TaskStarted { timestamp, .. } => *timestamp,
            Event::TaskCompleted { timestamp, .. } => *timestamp,
            Event::TaskFailed { timestamp, .. } => *timestamp,
            Event::TaskAborted { timestamp, .. } => *timestamp,
        }
    }

    /// Create a JobSubmitted event.
    pub fn job_submitted(task_id: TaskId, run_id: RunId, job_id: JobId) -> Self {
        Event::JobSubmitted {
            task_id,
            run_id,
            job_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskStarted event.
    pub fn task_started(task_id: TaskId, run_id: RunId) -> Self {
        Event::TaskStarted {
            task_id,
            run_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskCompleted event.
    pub fn task_completed(
        task_id: TaskId,
        run_id: RunId,
        duration: Duration,
        exit_code: Option<i32>,
    ) -> Self {
        Event::TaskCompleted {
            task_id,
            run_id,
            duration,
            exit_code,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskFailed event.
    pub fn task_failed(
        task_id: TaskId,
        run_id: RunId,
        error: String,
        exit_code: Option<i32>,
    ) -> Self {
        Event::TaskFailed {
            task_id,
            run_id,
            error,
            exit_code,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskAborted event.
    pub fn task_aborted(task_id: TaskId, run_id: RunId, duration: Duration) -> Self {
        Event::TaskAborted {
            task_id,
            run_id,
            duration,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event. Handlers must not block for long; they run inline
    /// with the emitting backend.
    async fn handle(&self, event: &Event);
}

/// Event bus that dispatches events to registered handlers in
/// registration order.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    /// Create a bus with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}
