//! Stock reconciliation for purchase create and edit.
//!
//! Every function takes the stock/cost values read once per item and returns the
//! single final value per item. Callers write each entry exactly once; nothing
//! here is applied incrementally against the store.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use stockroom_core::{DomainError, DomainResult, ItemId};
use stockroom_inventory::{Item, ItemKind};

use crate::purchase::PurchaseLine;

/// Stock and unit cost of one item at a point in time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub stock: i64,
    pub cost: Decimal,
}

impl From<&Item> for StockLevel {
    fn from(item: &Item) -> Self {
        Self {
            stock: item.stock(),
            cost: item.cost(),
        }
    }
}

/// Before/after values for one item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ItemAdjustment {
    pub before: StockLevel,
    pub after: StockLevel,
}

impl ItemAdjustment {
    pub fn stock_delta(&self) -> i64 {
        self.after.stock - self.before.stock
    }
}

/// Final stock/cost per item for one purchase operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    adjustments: BTreeMap<ItemId, ItemAdjustment>,
}

impl Reconciliation {
    pub fn get(&self, item_id: &ItemId) -> Option<&ItemAdjustment> {
        self.adjustments.get(item_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &ItemAdjustment)> {
        self.adjustments.iter()
    }

    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    /// Cost an item ends the operation with, if the operation touches it.
    pub fn final_cost(&self, item_id: &ItemId) -> Option<Decimal> {
        self.adjustments.get(item_id).map(|a| a.after.cost)
    }

    fn entry(
        &mut self,
        current: &BTreeMap<ItemId, StockLevel>,
        item_id: ItemId,
    ) -> DomainResult<&mut ItemAdjustment> {
        if !self.adjustments.contains_key(&item_id) {
            let level = current
                .get(&item_id)
                .copied()
                .ok_or_else(|| DomainError::not_found("item", item_id))?;
            self.adjustments.insert(
                item_id,
                ItemAdjustment {
                    before: level,
                    after: level,
                },
            );
        }
        self.adjustments
            .get_mut(&item_id)
            .ok_or_else(|| DomainError::invariant("reconciliation entry vanished"))
    }

    fn add(&mut self, current: &BTreeMap<ItemId, StockLevel>, line: &PurchaseLine) -> DomainResult<()> {
        let entry = self.entry(current, line.item_id())?;
        entry.after.stock = entry
            .after
            .stock
            .checked_add(line.quantity())
            .ok_or_else(|| DomainError::invariant(format!("stock overflow for item {}", line.item_id())))?;
        entry.after.cost = line.unit_cost();
        Ok(())
    }

    fn revert(&mut self, current: &BTreeMap<ItemId, StockLevel>, line: &PurchaseLine) -> DomainResult<()> {
        let entry = self.entry(current, line.item_id())?;
        entry.after.stock = entry
            .after
            .stock
            .checked_sub(line.quantity())
            .ok_or_else(|| DomainError::invariant(format!("stock overflow for item {}", line.item_id())))?;
        Ok(())
    }
}

/// Stock/cost after recording a new purchase.
///
/// Each line adds its quantity and overwrites the unit cost; when an item
/// appears on several lines the quantities accumulate and the last line's cost wins.
pub fn reconcile_create(
    current: &BTreeMap<ItemId, StockLevel>,
    lines: &[PurchaseLine],
) -> DomainResult<Reconciliation> {
    let mut out = Reconciliation::default();
    for line in lines {
        out.add(current, line)?;
    }
    Ok(out)
}

/// Stock/cost after replacing `old_lines` with `new_lines`.
///
/// All old contributions are reverted before any new one is applied, against a
/// single value per item. An item only present in `old_lines` is decreased and
/// keeps its cost; a stock that goes negative stays negative.
pub fn reconcile_edit(
    current: &BTreeMap<ItemId, StockLevel>,
    old_lines: &[PurchaseLine],
    new_lines: &[PurchaseLine],
) -> DomainResult<Reconciliation> {
    let mut out = Reconciliation::default();
    for line in old_lines {
        out.revert(current, line)?;
    }
    for line in new_lines {
        out.add(current, line)?;
    }
    Ok(out)
}

/// Ingredients whose cost a line set overwrites.
pub fn touched_ingredients(lines: &[PurchaseLine]) -> BTreeSet<ItemId> {
    lines
        .iter()
        .filter(|l| l.item_kind() == ItemKind::Ingredient)
        .map(PurchaseLine::item_id)
        .collect()
}

/// Distinct item ids referenced by any of the given line sets.
pub fn referenced_items<'a, I>(line_sets: I) -> BTreeSet<ItemId>
where
    I: IntoIterator<Item = &'a [PurchaseLine]>,
{
    line_sets
        .into_iter()
        .flat_map(|lines| lines.iter().map(PurchaseLine::item_id))
        .collect()
}
