use std::sync::Arc;

use stockroom_infra::{EngineConfig, InMemoryDocumentStore, PurchaseCoordinator, PurchaseError};

pub type Coordinator = PurchaseCoordinator<Arc<InMemoryDocumentStore>>;

/// Shared state behind every handler.
pub struct AppServices {
    store: Arc<InMemoryDocumentStore>,
    coordinator: Coordinator,
}

impl AppServices {
    pub fn in_memory(config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        Self {
            coordinator: PurchaseCoordinator::new(store.clone(), config),
            store,
        }
    }

    pub fn store(&self) -> &InMemoryDocumentStore {
        &self.store
    }

    /// Run a coordinator call on the blocking pool.
    ///
    /// The coordinator is synchronous and may sleep between conflict retries.
    pub async fn run<T, F>(self: &Arc<Self>, f: F) -> Result<T, PurchaseError>
    where
        F: FnOnce(&Coordinator) -> Result<T, PurchaseError> + Send + 'static,
        T: Send + 'static,
    {
        let services = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&services.coordinator))
            .await
            .map_err(|e| PurchaseError::Internal(format!("blocking task failed: {e}")))?
    }
}
