//! Application state shared across request handlers.

use std::sync::Arc;

use talon_core::{IncidentService, ResourceDirectory};
use talon_storage::InMemoryRepository;

use crate::settings::Pipeline;

pub(crate) struct AppState {
    /// Intake pipeline; also owns the lifecycle service and directory.
    pub(crate) pipeline: Arc<Pipeline>,
}

impl AppState {
    pub(crate) fn new(pipeline: Arc<Pipeline>) -> Self {
        AppState { pipeline }
    }

    pub(crate) fn service(&self) -> &IncidentService<InMemoryRepository> {
        self.pipeline.service()
    }

    pub(crate) fn directory(&self) -> &ResourceDirectory {
        self.service().dispatch().directory()
    }
}
