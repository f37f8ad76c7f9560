//! Two-phase transaction over a `DocumentStore`.
//!
//! ```text
//! ReadPhase::begin(store)
//!   ↓  typed reads; every document's revision is recorded
//! ReadPhase::finish()            (no read method exists past this point)
//!   ↓
//! WritePhase::write_*()          (buffered, nothing reaches the store)
//!   ↓
//! WritePhase::commit()           (one conditional batch: all reads must still be current)
//! ```
//!
//! A commit whose reads went stale fails with `StoreError::Conflict` and applies
//! nothing, so the whole unit can be re-run from `begin`.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use stockroom_core::{ExpectedRevision, ItemId, PurchaseId, Revision, SupplierId};
use stockroom_inventory::{Item, ItemKind};
use stockroom_purchasing::{Purchase, Supplier};

use crate::store::document::{
    item_from_document, item_stock_cost_fields, purchase_from_document, purchase_to_document,
    supplier_from_document,
};
use crate::store::{
    Collection, CommitReceipt, DocumentKey, DocumentStore, DocumentWrite, Predicate, Query,
    StoreError, WriteBatch,
};

/// Query for every product whose cost is derived from a recipe.
pub fn composite_products_query() -> Query {
    Query::new(Collection::Items)
        .filter(Predicate::Equals {
            field: "kind",
            value: JsonValue::String(ItemKind::Product.to_string()),
        })
        .filter(Predicate::NonEmptyArray { field: "recipe" })
}

/// Read side of a transaction.
pub struct ReadPhase<'s, S: ?Sized> {
    store: &'s S,
    observed: BTreeMap<DocumentKey, Revision>,
}

impl<'s, S> ReadPhase<'s, S>
where
    S: DocumentStore + ?Sized,
{
    pub fn begin(store: &'s S) -> Self {
        Self {
            store,
            observed: BTreeMap::new(),
        }
    }

    /// Number of distinct documents read so far.
    pub fn observed(&self) -> usize {
        self.observed.len()
    }

    fn observe(&mut self, key: DocumentKey, revision: Revision) -> Result<(), StoreError> {
        match self.observed.entry(key) {
            Entry::Vacant(v) => {
                v.insert(revision);
                Ok(())
            }
            Entry::Occupied(o) if *o.get() == revision => Ok(()),
            // Same document seen at two revisions: the reads are not one snapshot.
            Entry::Occupied(o) => Err(StoreError::Conflict(format!(
                "{key} changed during the read phase ({} -> {revision})",
                o.get()
            ))),
        }
    }

    fn read(&mut self, key: DocumentKey) -> Result<Option<JsonValue>, StoreError> {
        let doc = self.store.get(&key)?;
        let revision = doc.as_ref().map(|d| d.revision).unwrap_or(Revision::ABSENT);
        self.observe(key, revision)?;
        Ok(doc.map(|d| d.body))
    }

    pub fn supplier(&mut self, id: SupplierId) -> Result<Option<Supplier>, StoreError> {
        self.read(DocumentKey::supplier(id))?
            .map(|body| supplier_from_document(id, body))
            .transpose()
    }

    pub fn item(&mut self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.read(DocumentKey::item(id))?
            .map(|body| item_from_document(id, body))
            .transpose()
    }

    /// Read each id once. Ids without a document are absent from the result.
    pub fn items(&mut self, ids: &BTreeSet<ItemId>) -> Result<BTreeMap<ItemId, Item>, StoreError> {
        let mut out = BTreeMap::new();
        for id in ids {
            if let Some(item) = self.item(*id)? {
                out.insert(*id, item);
            }
        }
        Ok(out)
    }

    pub fn purchase(&mut self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        self.read(DocumentKey::purchase(id))?
            .map(|body| purchase_from_document(id, body))
            .transpose()
    }

    /// Every composite product currently stored.
    pub fn composite_products(&mut self) -> Result<Vec<Item>, StoreError> {
        let docs = self.store.query(&composite_products_query())?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            self.observe(doc.key, doc.revision)?;
            let id = ItemId::from_uuid(doc.key.id);
            out.push(item_from_document(id, doc.body)?);
        }
        Ok(out)
    }

    /// End the read phase. Reads are no longer possible afterwards.
    pub fn finish(self) -> WritePhase<'s, S> {
        WritePhase {
            store: self.store,
            observed: self.observed,
            writes: Vec::new(),
        }
    }
}

/// Write side of a transaction: buffered writes plus the revisions they depend on.
pub struct WritePhase<'s, S: ?Sized> {
    store: &'s S,
    observed: BTreeMap<DocumentKey, Revision>,
    writes: Vec<DocumentWrite>,
}

impl<'s, S> WritePhase<'s, S>
where
    S: DocumentStore + ?Sized,
{
    fn push(&mut self, write: DocumentWrite) {
        match self.writes.iter_mut().find(|w| w.key() == write.key()) {
            Some(existing) => *existing = write,
            None => self.writes.push(write),
        }
    }

    /// `WriteItem(id, stock, cost)`.
    pub fn write_item(&mut self, id: ItemId, stock: i64, cost: Decimal) {
        self.push(DocumentWrite::Merge {
            key: DocumentKey::item(id),
            fields: item_stock_cost_fields(Some(stock), Some(cost)),
        });
    }

    /// Cost-only update (composite products outside the purchase).
    pub fn write_item_cost(&mut self, id: ItemId, cost: Decimal) {
        self.push(DocumentWrite::Merge {
            key: DocumentKey::item(id),
            fields: item_stock_cost_fields(None, Some(cost)),
        });
    }

    pub fn write_purchase(&mut self, purchase: &Purchase) {
        self.push(DocumentWrite::Put {
            key: DocumentKey::purchase(purchase.id_typed()),
            body: purchase_to_document(purchase),
        });
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Build the conditional batch without committing it.
    pub fn into_batch(self) -> WriteBatch {
        let mut preconditions: Vec<(DocumentKey, ExpectedRevision)> = self
            .observed
            .iter()
            .map(|(k, r)| (*k, ExpectedRevision::Exact(*r)))
            .collect();

        for write in &self.writes {
            if !self.observed.contains_key(write.key()) {
                preconditions.push((*write.key(), blind_write_expectation(write)));
            }
        }

        WriteBatch {
            preconditions,
            writes: self.writes,
        }
    }

    pub fn commit(self) -> Result<CommitReceipt, StoreError> {
        let store = self.store;
        store.commit(self.into_batch())
    }
}

/// Expectation for a write whose document was never read in the transaction.
fn blind_write_expectation(write: &DocumentWrite) -> ExpectedRevision {
    match write {
        // Creating a document: it must still not exist.
        DocumentWrite::Put { .. } => ExpectedRevision::Exact(Revision::ABSENT),
        DocumentWrite::Merge { .. } => ExpectedRevision::Any,
    }
}
