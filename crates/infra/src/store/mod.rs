//! Document store boundary.
//!
//! The engine only needs keyed reads, one filtered query and a conditional
//! multi-document commit. `r#trait` defines that contract, `in_memory` is the
//! dev/test implementation and `document` maps JSON bodies to domain entities.

pub mod document;
pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{
    Collection, CommitReceipt, DocumentKey, DocumentStore, DocumentWrite, Predicate, Query,
    StoreError, StoredDocument, WriteBatch,
};
