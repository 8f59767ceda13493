use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::controller::SearchController;
use crate::domain::{Capability, ViewSnapshot};
use crate::provider::DefinitionProvider;

const EVENT_CAPACITY: usize = 256;

/// Shared handles for every request handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<SearchController>>,
    pub provider: Arc<dyn DefinitionProvider>,
    pub events_tx: broadcast::Sender<ViewSnapshot>,
}

impl AppState {
    pub fn new(provider: Arc<dyn DefinitionProvider>) -> Self {
        let (events_tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            controller: Arc::new(Mutex::new(SearchController::new())),
            provider,
            events_tx,
        }
    }

    pub fn capability(&self) -> Capability {
        self.provider.capability()
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        self.controller.lock().await.snapshot()
    }

    pub fn publish(&self, snapshot: ViewSnapshot) {
        // Sending with no subscribers is not an error worth reporting.
        let _ = self.events_tx.send(snapshot);
    }
}
