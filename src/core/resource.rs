//! Resources assigned to a task for one run.
//!
//! The surrounding scheduler decides what a task may use and hands the
//! concrete assignment to `run()`; tasks consume it when building their
//! argument vector (e.g. turning an assigned GPU list into `--gpus 0,1`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Concrete resource assignment for one task run.
///
/// Named slots carry the identifiers assigned from a pool, e.g.
/// `"gpu" -> ["0", "1"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    slots: HashMap<String, Vec<String>>,
}

impl ResourceAllocation {
    /// An empty allocation (no resources assigned).
    pub fn none() -> Self {
        Self::default()
    }

    /// Builder: assign identifiers to a named slot.
    pub fn with_slot<I, S>(mut self, name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slots
            .insert(name.into(), ids.into_iter().map(Into::into).collect());
        self
    }

    /// Identifiers assigned to a slot; empty when the slot is absent.
    pub fn slot(&self, name: &str) -> &[String] {
        self.slots.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First identifier assigned to a slot, if any.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.slot(name).first().map(String::as_str)
    }

    /// Check if anything was assigned.
    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Vec::is_empty)
    }
}
