use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use stockroom_core::Revision;
use stockroom_inventory::Item;
use stockroom_purchasing::Supplier;

use super::document::{item_to_document, supplier_to_document};
use super::r#trait::{
    CommitReceipt, DocumentKey, DocumentStore, DocumentWrite, Query, StoreError, StoredDocument,
    WriteBatch,
};

#[derive(Debug, Clone)]
struct Slot {
    revision: Revision,
    body: JsonValue,
}

/// In-memory document store.
///
/// Intended for tests/dev. Commits are serialized behind the write lock and
/// every precondition is checked before the first write is applied.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<DocumentKey, Slot>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional out-of-band write (seeding, admin tooling).
    pub fn put(&self, key: DocumentKey, body: JsonValue) -> Result<Revision, StoreError> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        let revision = docs
            .get(&key)
            .map(|s| s.revision)
            .unwrap_or(Revision::ABSENT)
            .next();
        docs.insert(key, Slot { revision, body });
        Ok(revision)
    }

    /// Seed or replace an item document.
    pub fn put_item(&self, item: &Item) -> Result<Revision, StoreError> {
        self.put(DocumentKey::item(item.id_typed()), item_to_document(item))
    }

    /// Seed or replace a supplier document.
    pub fn put_supplier(&self, supplier: &Supplier) -> Result<Revision, StoreError> {
        self.put(DocumentKey::supplier(supplier.id), supplier_to_document(supplier))
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn current_revision(docs: &HashMap<DocumentKey, Slot>, key: &DocumentKey) -> Revision {
        docs.get(key).map(|s| s.revision).unwrap_or(Revision::ABSENT)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(docs.get(key).map(|slot| StoredDocument {
            key: *key,
            revision: slot.revision,
            body: slot.body.clone(),
        }))
    }

    fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // Ordered by key so callers see a stable result order.
        let hits: BTreeMap<DocumentKey, StoredDocument> = docs
            .iter()
            .filter(|(k, slot)| k.collection == query.collection && query.matches(&slot.body))
            .map(|(k, slot)| {
                (
                    *k,
                    StoredDocument {
                        key: *k,
                        revision: slot.revision,
                        body: slot.body.clone(),
                    },
                )
            })
            .collect();

        Ok(hits.into_values().collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        if batch.is_empty() {
            return Ok(CommitReceipt::default());
        }

        let mut docs = self
            .docs
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // 1) Validate everything before touching anything.
        for (key, expected) in &batch.preconditions {
            let actual = Self::current_revision(&docs, key);
            expected
                .check(actual)
                .map_err(|e| StoreError::Conflict(format!("{key}: {e}")))?;
        }
        for write in &batch.writes {
            if let DocumentWrite::Merge { key, .. } = write {
                match docs.get(key) {
                    None => return Err(StoreError::MissingDocument(*key)),
                    Some(slot) if !slot.body.is_object() => {
                        return Err(StoreError::Backend(format!(
                            "{key}: cannot merge fields into a non-object document"
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        // 2) Apply. A key written twice in one batch is bumped once per write.
        let mut receipt = CommitReceipt::default();
        for write in batch.writes {
            let key = *write.key();
            let next = Self::current_revision(&docs, &key).next();
            match write {
                DocumentWrite::Put { body, .. } => {
                    docs.insert(key, Slot { revision: next, body });
                }
                DocumentWrite::Merge { fields, .. } => {
                    let slot = docs
                        .get_mut(&key)
                        .ok_or(StoreError::MissingDocument(key))?;
                    if let Some(obj) = slot.body.as_object_mut() {
                        obj.extend(fields);
                    }
                    slot.revision = next;
                }
            }
            receipt.revisions.push((key, next));
        }

        Ok(receipt)
    }
}
