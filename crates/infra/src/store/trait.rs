use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;
use uuid::Uuid;

use stockroom_core::{ExpectedRevision, ItemId, PurchaseId, Revision, SupplierId};

/// Document collections the engine touches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Items,
    Purchases,
    Suppliers,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Items => "items",
            Collection::Purchases => "purchases",
            Collection::Suppliers => "suppliers",
        }
    }
}

/// Address of one document: collection + id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub collection: Collection,
    pub id: Uuid,
}

impl DocumentKey {
    pub fn new(collection: Collection, id: impl Into<Uuid>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    pub fn item(id: ItemId) -> Self {
        Self::new(Collection::Items, id)
    }

    pub fn purchase(id: PurchaseId) -> Self {
        Self::new(Collection::Purchases, id)
    }

    pub fn supplier(id: SupplierId) -> Self {
        Self::new(Collection::Suppliers, id)
    }
}

impl core::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.collection.as_str(), self.id)
    }
}

/// A document as returned by the store, with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: DocumentKey,
    pub revision: Revision,
    pub body: JsonValue,
}

/// One condition of a document query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Top-level field equals the given value.
    Equals { field: &'static str, value: JsonValue },
    /// Top-level field is a non-empty array.
    NonEmptyArray { field: &'static str },
}

impl Predicate {
    pub fn matches(&self, body: &JsonValue) -> bool {
        match self {
            Predicate::Equals { field, value } => body.get(*field) == Some(value),
            Predicate::NonEmptyArray { field } => body
                .get(*field)
                .and_then(JsonValue::as_array)
                .is_some_and(|a| !a.is_empty()),
        }
    }
}

/// Conjunctive query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub predicates: Vec<Predicate>,
}

impl Query {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            predicates: Vec::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn matches(&self, body: &JsonValue) -> bool {
        self.predicates.iter().all(|p| p.matches(body))
    }
}

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentWrite {
    /// Replace (or create) the whole document.
    Put { key: DocumentKey, body: JsonValue },
    /// Overwrite the given top-level fields of an existing document.
    Merge {
        key: DocumentKey,
        fields: JsonMap<String, JsonValue>,
    },
}

impl DocumentWrite {
    pub fn key(&self) -> &DocumentKey {
        match self {
            DocumentWrite::Put { key, .. } | DocumentWrite::Merge { key, .. } => key,
        }
    }
}

/// Conditional, all-or-nothing unit of writes.
///
/// The store applies `writes` only if every precondition still holds at commit
/// time; otherwise nothing is applied and `StoreError::Conflict` is returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub preconditions: Vec<(DocumentKey, ExpectedRevision)>,
    pub writes: Vec<DocumentWrite>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Revisions assigned by a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub revisions: Vec<(DocumentKey, Revision)>,
}

/// Document store operation error.
///
/// These are **infrastructure errors**; the coordinator maps them into its own
/// taxonomy (`Conflict` is retryable, everything else is internal).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("document {0} does not exist")]
    MissingDocument(DocumentKey),

    #[error("document mapping failed: {0}")]
    Mapping(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Keyed document store with snapshot reads and conditional commits.
///
/// Implementations must:
/// - return the revision each document was read at
/// - apply a `WriteBatch` atomically (all writes or none)
/// - reject a batch whose preconditions no longer hold with `StoreError::Conflict`
/// - bump the revision of every written document by one
pub trait DocumentStore: Send + Sync {
    fn get(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError>;

    fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError>;

    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError> {
        (**self).get(key)
    }

    fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError> {
        (**self).query(query)
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        (**self).commit(batch)
    }
}
