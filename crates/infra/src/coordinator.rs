//! Purchase transaction coordinator.
//!
//! Every operation runs as one optimistic transaction against the injected
//! `DocumentStore`:
//!
//! ```text
//! validate input (no IO)
//!   ↓
//! 1. Read phase: supplier / purchase, every referenced item, and on create the
//!    composite products plus the recipe ingredients they need
//!   ↓
//! 2. Compute phase: stock reconciliation, then cost propagation
//!   ↓
//! 3. Write phase: each item's final stock/cost once, then the purchase
//!   ↓
//! conditional commit (all reads must still be current)
//! ```
//!
//! A stale read makes the commit fail as a whole; the coordinator then re-runs
//! the transaction from step 1, up to `RetryPolicy::max_attempts` times. Any
//! other failure aborts before the commit, so nothing is ever half-applied.
//!
//! The coordinator is synchronous. Async callers should run it on a blocking
//! thread (`tokio::task::spawn_blocking`).

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use stockroom_core::{DomainError, ItemId, PurchaseId, SupplierId};
use stockroom_inventory::{Item, RecomputedCost, affected_composites, propagate_costs, recipe_ingredients};
use stockroom_purchasing::{
    LineInput, Purchase, PurchaseLine, Reconciliation, StockLevel, reconcile_create,
    reconcile_edit, referenced_items, touched_ingredients, validate_lines,
};

use crate::config::EngineConfig;
use crate::store::{DocumentStore, StoreError};
use crate::transaction::{ReadPhase, WritePhase};

/// Errors surfaced by coordinator operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    /// Lost an optimistic concurrency race on every allowed attempt.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PurchaseError {
    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only conflicts are worth re-running.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PurchaseError::Conflict(_))
    }
}

impl From<DomainError> for PurchaseError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => PurchaseError::Validation(msg),
            DomainError::NotFound { entity, id } => PurchaseError::NotFound { entity, id },
            DomainError::Conflict(msg) => PurchaseError::Conflict(msg),
            DomainError::InvariantViolation(msg) => PurchaseError::Internal(msg),
        }
    }
}

impl From<StoreError> for PurchaseError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => PurchaseError::Conflict(msg),
            other => PurchaseError::Internal(other.to_string()),
        }
    }
}

/// Composite products a purchase may re-cost, plus the recipe ingredients
/// (outside the purchase) needed to cost them.
#[derive(Debug, Default)]
struct CostingInputs {
    composites: Vec<Item>,
    recipe_items: BTreeMap<ItemId, Item>,
}

/// Pending stock/cost update for one item.
#[derive(Debug, Default, Clone, Copy)]
struct ItemWrite {
    stock: Option<i64>,
    cost: Option<Decimal>,
}

pub struct PurchaseCoordinator<S> {
    store: S,
    config: EngineConfig,
}

impl<S> PurchaseCoordinator<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record a new purchase and apply it to stock and costs.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub fn create_purchase(
        &self,
        supplier_id: SupplierId,
        lines: Vec<LineInput>,
    ) -> Result<Purchase, PurchaseError> {
        validate_lines(&lines)?;

        // Fixed across attempts: a retried create must not mint a second purchase.
        let purchase_id = PurchaseId::new();
        let purchase = self.with_retry("create_purchase", || {
            self.try_create(purchase_id, supplier_id, &lines)
        })?;

        info!(
            purchase_id = %purchase.id_typed(),
            total = %purchase.total(),
            "purchase created"
        );
        Ok(purchase)
    }

    /// Replace a purchase's lines, moving stock from the old lines to the new ones.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub fn edit_purchase(
        &self,
        purchase_id: PurchaseId,
        lines: Vec<LineInput>,
    ) -> Result<Purchase, PurchaseError> {
        validate_lines(&lines)?;

        let purchase = self.with_retry("edit_purchase", || self.try_edit(purchase_id, &lines))?;

        info!(
            purchase_id = %purchase.id_typed(),
            total = %purchase.total(),
            "purchase edited"
        );
        Ok(purchase)
    }

    /// Flip PENDING <-> PAID. A void purchase is returned unchanged.
    #[tracing::instrument(skip(self))]
    pub fn toggle_payment_status(&self, purchase_id: PurchaseId) -> Result<Purchase, PurchaseError> {
        self.with_retry("toggle_payment_status", || self.try_toggle(purchase_id))
    }

    pub fn get_purchase(&self, purchase_id: PurchaseId) -> Result<Purchase, PurchaseError> {
        ReadPhase::begin(&self.store)
            .purchase(purchase_id)?
            .ok_or_else(|| PurchaseError::not_found("purchase", purchase_id))
    }

    pub fn get_item(&self, item_id: ItemId) -> Result<Item, PurchaseError> {
        ReadPhase::begin(&self.store)
            .item(item_id)?
            .ok_or_else(|| PurchaseError::not_found("item", item_id))
    }

    fn with_retry<T, F>(&self, operation: &'static str, mut attempt_once: F) -> Result<T, PurchaseError>
    where
        F: FnMut() -> Result<T, PurchaseError>,
    {
        let policy = self.config.retry;
        let mut attempt = 1;
        loop {
            match attempt_once() {
                Err(err) if err.is_retryable() && policy.should_retry(attempt) => {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(operation, attempt, ?delay, error = %err, "transaction conflicted; retrying");
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    warn!(operation, attempt, error = %err, "transaction conflicted; giving up");
                    return Err(err);
                }
                other => return other,
            }
        }
    }

    fn try_create(
        &self,
        purchase_id: PurchaseId,
        supplier_id: SupplierId,
        inputs: &[LineInput],
    ) -> Result<Purchase, PurchaseError> {
        // 1) Read
        let mut reads = ReadPhase::begin(&self.store);
        let supplier = reads
            .supplier(supplier_id)?
            .ok_or_else(|| PurchaseError::not_found("supplier", supplier_id))?;

        let ids: BTreeSet<ItemId> = inputs.iter().map(|l| l.item_id).collect();
        let items = reads.items(&ids)?;
        let lines = denormalize(inputs, &items)?;

        let touched = touched_ingredients(&lines);
        let costing = read_costing_inputs(&mut reads, &touched, &items)?;
        debug!(items = items.len(), composites = costing.composites.len(), "read phase complete");
        let mut writes = reads.finish();

        // 2) Compute
        let reconciliation = reconcile_create(&stock_levels(&items), &lines)?;
        let recomputed = recompute_costs(&costing, &touched, &reconciliation, &items)?;
        let purchase = Purchase::create(purchase_id, &supplier, lines, Utc::now())?;

        // 3) Write
        stage_item_writes(&mut writes, &reconciliation, &recomputed);
        writes.write_purchase(&purchase);
        writes.commit()?;

        Ok(purchase)
    }

    fn try_edit(&self, purchase_id: PurchaseId, inputs: &[LineInput]) -> Result<Purchase, PurchaseError> {
        // 1) Read
        let mut reads = ReadPhase::begin(&self.store);
        let mut purchase = reads
            .purchase(purchase_id)?
            .ok_or_else(|| PurchaseError::not_found("purchase", purchase_id))?;
        if purchase.status().is_terminal() {
            return Err(PurchaseError::Validation(format!(
                "purchase {purchase_id} is {} and cannot be edited",
                purchase.status()
            )));
        }

        let mut ids: BTreeSet<ItemId> = inputs.iter().map(|l| l.item_id).collect();
        ids.extend(referenced_items([purchase.lines()]));
        let items = reads.items(&ids)?;
        let lines = denormalize(inputs, &items)?;

        let touched = if self.config.cost_propagation.propagates_on_edit() {
            touched_ingredients(&lines)
        } else {
            BTreeSet::new()
        };
        let costing = read_costing_inputs(&mut reads, &touched, &items)?;
        debug!(items = items.len(), composites = costing.composites.len(), "read phase complete");
        let mut writes = reads.finish();

        // 2) Compute
        let reconciliation = reconcile_edit(&stock_levels(&items), purchase.lines(), &lines)?;
        let recomputed = recompute_costs(&costing, &touched, &reconciliation, &items)?;
        purchase.replace_lines(lines, Utc::now())?;

        // 3) Write
        stage_item_writes(&mut writes, &reconciliation, &recomputed);
        writes.write_purchase(&purchase);
        writes.commit()?;

        Ok(purchase)
    }

    fn try_toggle(&self, purchase_id: PurchaseId) -> Result<Purchase, PurchaseError> {
        let mut reads = ReadPhase::begin(&self.store);
        let mut purchase = reads
            .purchase(purchase_id)?
            .ok_or_else(|| PurchaseError::not_found("purchase", purchase_id))?;

        if !purchase.toggle_payment(Utc::now()) {
            debug!(status = %purchase.status(), "terminal status; toggle is a no-op");
            return Ok(purchase);
        }

        let mut writes = reads.finish();
        writes.write_purchase(&purchase);
        writes.commit()?;

        info!(status = %purchase.status(), "payment status toggled");
        Ok(purchase)
    }
}

fn denormalize(
    inputs: &[LineInput],
    items: &BTreeMap<ItemId, Item>,
) -> Result<Vec<PurchaseLine>, PurchaseError> {
    inputs
        .iter()
        .map(|input| -> Result<PurchaseLine, PurchaseError> {
            let item = items
                .get(&input.item_id)
                .ok_or_else(|| PurchaseError::not_found("item", input.item_id))?;
            Ok(PurchaseLine::denormalize(input, item)?)
        })
        .collect()
}

fn stock_levels(items: &BTreeMap<ItemId, Item>) -> BTreeMap<ItemId, StockLevel> {
    items.iter().map(|(id, item)| (*id, StockLevel::from(item))).collect()
}

/// Read-phase half of cost propagation. Does nothing when no ingredient is touched.
fn read_costing_inputs<S>(
    reads: &mut ReadPhase<'_, S>,
    touched: &BTreeSet<ItemId>,
    items: &BTreeMap<ItemId, Item>,
) -> Result<CostingInputs, PurchaseError>
where
    S: DocumentStore + ?Sized,
{
    if touched.is_empty() {
        return Ok(CostingInputs::default());
    }

    let products = reads.composite_products()?;
    let composites: Vec<Item> = affected_composites(&products, touched).cloned().collect();

    let needed: BTreeSet<ItemId> = recipe_ingredients(&composites)
        .into_iter()
        .filter(|id| !items.contains_key(id))
        .collect();
    let recipe_items = reads.items(&needed)?;

    Ok(CostingInputs {
        composites,
        recipe_items,
    })
}

/// Compute half of cost propagation: ingredient costs as they stand after the
/// reconciliation, falling back to the values read.
fn recompute_costs(
    costing: &CostingInputs,
    touched: &BTreeSet<ItemId>,
    reconciliation: &Reconciliation,
    items: &BTreeMap<ItemId, Item>,
) -> Result<Vec<RecomputedCost>, PurchaseError> {
    let recomputed = propagate_costs(&costing.composites, touched, |id| {
        reconciliation
            .final_cost(id)
            .or_else(|| costing.recipe_items.get(id).map(Item::cost))
            .or_else(|| items.get(id).map(Item::cost))
    })?;

    for r in recomputed.iter().filter(|r| !r.missing_ingredients.is_empty()) {
        warn!(
            product_id = %r.product_id,
            missing = ?r.missing_ingredients,
            "recipe references missing ingredients; costed as zero"
        );
    }
    Ok(recomputed)
}

/// Merge stock reconciliation and recomputed costs into one write per item.
fn stage_item_writes<S>(
    writes: &mut WritePhase<'_, S>,
    reconciliation: &Reconciliation,
    recomputed: &[RecomputedCost],
) where
    S: DocumentStore + ?Sized,
{
    let mut pending: BTreeMap<ItemId, ItemWrite> = reconciliation
        .iter()
        .map(|(id, adj)| {
            debug!(item_id = %id, delta = adj.stock_delta(), stock = adj.after.stock, "stock reconciled");
            (
                *id,
                ItemWrite {
                    stock: Some(adj.after.stock),
                    cost: Some(adj.after.cost),
                },
            )
        })
        .collect();

    for r in recomputed {
        match pending.get_mut(&r.product_id) {
            // Composite bought on this purchase: the recipe cost replaces the line cost.
            Some(w) => w.cost = Some(r.cost),
            None if r.changed() => {
                pending.insert(
                    r.product_id,
                    ItemWrite {
                        stock: None,
                        cost: Some(r.cost),
                    },
                );
            }
            None => {}
        }
    }

    for (id, w) in pending {
        match (w.stock, w.cost) {
            (Some(stock), Some(cost)) => writes.write_item(id, stock, cost),
            (None, Some(cost)) => writes.write_item_cost(id, cost),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(PurchaseError::Conflict("x".into()).is_retryable());
        assert!(!PurchaseError::Validation("x".into()).is_retryable());
        assert!(!PurchaseError::Internal("x".into()).is_retryable());
        assert!(!PurchaseError::not_found("item", "1").is_retryable());
    }

    #[test]
    fn lower_layer_errors_map_into_taxonomy() {
        assert_eq!(
            PurchaseError::from(StoreError::Conflict("stale".into())),
            PurchaseError::Conflict("stale".into())
        );
        assert!(matches!(
            PurchaseError::from(StoreError::Mapping("bad".into())),
            PurchaseError::Internal(_)
        ));
        assert_eq!(
            PurchaseError::from(DomainError::not_found("item", "abc")),
            PurchaseError::NotFound {
                entity: "item",
                id: "abc".into()
            }
        );
        assert!(matches!(
            PurchaseError::from(DomainError::validation("empty")),
            PurchaseError::Validation(_)
        ));
        assert!(matches!(
            PurchaseError::from(DomainError::invariant("overflow")),
            PurchaseError::Internal(_)
        ));
    }
}
