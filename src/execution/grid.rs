//! Grid backend: batch-scheduler submission behind the backend trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::abort::AbortFlag;
use crate::core::resource::ResourceAllocation;
use crate::core::task::{Task, TaskError};
use crate::events::EventBus;
use crate::grid::{GridClient, GridConfig, GridSupervisor};

use super::backend::{BackendKind, ExecutionBackend, TaskReport};

/// Backend that submits tasks to the batch scheduler and supervises them
/// by polling.
pub struct GridBackend {
    client: Arc<GridClient>,
    supervisor: GridSupervisor,
}

impl GridBackend {
    /// Create a backend over the given scheduler configuration.
    pub fn new(config: GridConfig) -> Self {
        let client = Arc::new(GridClient::new(config));
        Self {
            supervisor: GridSupervisor::new(Arc::clone(&client)),
            client,
        }
    }

    /// Builder: attach an event bus.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.supervisor = GridSupervisor::new(Arc::clone(&self.client)).with_event_bus(events);
        self
    }

    /// The shared scheduler client, for direct queries (e.g. a status
    /// subcommand) outside a supervised run.
    pub fn client(&self) -> &Arc<GridClient> {
        &self.client
    }
}

#[async_trait]
impl ExecutionBackend for GridBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Grid
    }

    async fn run(
        &self,
        task: &dyn Task,
        resources: &ResourceAllocation,
        abort: &AbortFlag,
    ) -> Result<TaskReport, TaskError> {
        self.supervisor.run(task, resources, abort).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let backend = GridBackend::new(GridConfig::default());
        assert_eq!(backend.kind(), BackendKind::Grid);
    }

    #[test]
    fn test_client_shares_config() {
        let config = GridConfig::default().with_nodes("1:ppn=2");
        let backend = GridBackend::new(config.clone());
        assert_eq!(backend.client().config(), &config);
    }
}
