//! Infrastructure layer: document store, transactions, purchase coordinator, config.

pub mod config;
pub mod coordinator;
pub mod retry;
pub mod store;
pub mod transaction;


pub use config::{CostPropagationPolicy, EngineConfig};
pub use coordinator::{PurchaseCoordinator, PurchaseError};
pub use retry::RetryPolicy;
pub use store::{DocumentStore, InMemoryDocumentStore, StoreError};
pub use transaction::{ReadPhase, WritePhase};
