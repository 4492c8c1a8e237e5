//! Batch scheduler integration: client, job handles, status snapshots,
//! and the polling supervisor.

mod client;
mod config;
mod error;
mod handle;
mod snapshot;
mod supervisor;

pub use client::{GridClient, SubmitRequest};
pub use config::GridConfig;
pub use error::GridError;
pub use handle::{JobHandle, OutputStream};
pub use snapshot::{JobState, StatusSnapshot};
pub use supervisor::GridSupervisor;
