//! Cooperative abort signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set-once, read-many cancellation flag shared between a task's owner and
/// the backend supervising it.
///
/// Backends observe the flag only at poll boundaries, so cancellation
/// latency is bounded by the poll interval. Setting the flag is
/// irreversible for the lifetime of the run.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// Create a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
