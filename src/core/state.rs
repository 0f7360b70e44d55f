use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::coordinator::ExamCoordinator;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    coordinator: Arc<ExamCoordinator>,
}

impl AppState {
    pub(crate) fn new(settings: Settings, coordinator: Arc<ExamCoordinator>) -> Self {
        Self { inner: Arc::new(InnerState { settings, coordinator }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn coordinator(&self) -> &ExamCoordinator {
        &self.inner.coordinator
    }

    pub(crate) fn coordinator_handle(&self) -> Arc<ExamCoordinator> {
        Arc::clone(&self.inner.coordinator)
    }
}
