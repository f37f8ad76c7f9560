use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, ItemId, PurchaseId, SupplierId};
use stockroom_inventory::{Item, ItemKind};

use crate::supplier::Supplier;

/// Purchase payment status lifecycle.
///
/// `Pending` and `Paid` toggle into each other; `Void` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Pending,
    Paid,
    Void,
}

impl PurchaseStatus {
    /// Status after a payment toggle, `None` when the status is terminal.
    pub fn toggled(self) -> Option<Self> {
        match self {
            PurchaseStatus::Pending => Some(PurchaseStatus::Paid),
            PurchaseStatus::Paid => Some(PurchaseStatus::Pending),
            PurchaseStatus::Void => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PurchaseStatus::Void
    }
}

impl core::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PurchaseStatus::Pending => "PENDING",
            PurchaseStatus::Paid => "PAID",
            PurchaseStatus::Void => "VOID",
        })
    }
}

impl Default for PurchaseStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Requested purchase line, as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

impl LineInput {
    pub fn new(item_id: ItemId, quantity: i64, unit_cost: Decimal) -> Self {
        Self {
            item_id,
            quantity,
            unit_cost,
        }
    }
}

/// Reject line sets that must never reach the store.
///
/// Runs before any read: empty sets, non-positive quantities and negative unit
/// costs are caller mistakes, not storage conditions.
pub fn validate_lines(lines: &[LineInput]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("a purchase needs at least one line"));
    }
    for (idx, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "line {idx}: quantity must be positive (got {})",
                line.quantity
            )));
        }
        if line.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "line {idx}: unit cost cannot be negative (got {})",
                line.unit_cost
            )));
        }
    }
    Ok(())
}

/// Stored purchase line with the item's kind and name copied in at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseLine {
    item_id: ItemId,
    item_kind: ItemKind,
    item_name: String,
    quantity: i64,
    unit_cost: Decimal,
    subtotal: Decimal,
}

impl PurchaseLine {
    pub fn new(
        item_id: ItemId,
        item_kind: ItemKind,
        item_name: impl Into<String>,
        quantity: i64,
        unit_cost: Decimal,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if unit_cost < Decimal::ZERO {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        let subtotal = Decimal::from(quantity).checked_mul(unit_cost).ok_or_else(|| {
            DomainError::validation(format!(
                "line subtotal overflows ({quantity} x {unit_cost})"
            ))
        })?;
        Ok(Self {
            item_id,
            item_kind,
            item_name: item_name.into(),
            quantity,
            unit_cost,
            subtotal,
        })
    }

    /// Build a stored line from a request line and the item it references.
    pub fn denormalize(input: &LineInput, item: &Item) -> DomainResult<Self> {
        if input.item_id != item.id_typed() {
            return Err(DomainError::invariant("line item_id does not match item"));
        }
        Self::new(
            item.id_typed(),
            item.kind(),
            item.name(),
            input.quantity,
            input.unit_cost,
        )
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn item_kind(&self) -> ItemKind {
        self.item_kind
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }
}

/// Sum of line subtotals, rejecting totals Decimal cannot represent.
fn checked_total(lines: &[PurchaseLine]) -> DomainResult<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.subtotal)
            .ok_or_else(|| DomainError::validation("purchase total overflows"))
    })
}

/// Purchase record: what was bought, from whom, and whether it is paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    id: PurchaseId,
    supplier_id: SupplierId,
    supplier_name: String,
    lines: Vec<PurchaseLine>,
    total: Decimal,
    status: PurchaseStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Purchase {
    /// A new, pending purchase.
    pub fn create(
        id: PurchaseId,
        supplier: &Supplier,
        lines: Vec<PurchaseLine>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("a purchase needs at least one line"));
        }
        let total = checked_total(&lines)?;
        Ok(Self {
            id,
            supplier_id: supplier.id,
            supplier_name: supplier.name.clone(),
            lines,
            total,
            status: PurchaseStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a purchase from stored fields.
    pub fn restore(
        id: PurchaseId,
        supplier_id: SupplierId,
        supplier_name: impl Into<String>,
        lines: Vec<PurchaseLine>,
        status: PurchaseStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let total = checked_total(&lines)?;
        Ok(Self {
            id,
            supplier_id,
            supplier_name: supplier_name.into(),
            lines,
            total,
            status,
            created_at,
            updated_at,
        })
    }

    pub fn id_typed(&self) -> PurchaseId {
        self.id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn supplier_name(&self) -> &str {
        &self.supplier_name
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of line subtotals. Recomputed whenever the lines change.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Swap in a new line set (edit). Supplier, id and status are untouched.
    pub fn replace_lines(&mut self, lines: Vec<PurchaseLine>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::validation("void purchases cannot be edited"));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("a purchase needs at least one line"));
        }
        self.total = checked_total(&lines)?;
        self.lines = lines;
        self.updated_at = now;
        Ok(())
    }

    /// Flip between pending and paid. Returns `false` (and changes nothing) when void.
    pub fn toggle_payment(&mut self, now: DateTime<Utc>) -> bool {
        match self.status.toggled() {
            Some(next) => {
                self.status = next;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Administrative void. Irreversible.
    pub fn void(&mut self, now: DateTime<Utc>) {
        if !self.status.is_terminal() {
            self.status = PurchaseStatus::Void;
            self.updated_at = now;
        }
    }
}

impl Entity for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_supplier() -> Supplier {
        Supplier::new(SupplierId::new(), "Acme Mills")
    }

    fn line(qty: i64, unit_cost: Decimal) -> PurchaseLine {
        PurchaseLine::new(ItemId::new(), ItemKind::Ingredient, "Flour", qty, unit_cost).unwrap()
    }

    #[test]
    fn create_starts_pending_and_denormalizes_supplier() {
        let supplier = test_supplier();
        let purchase =
            Purchase::create(PurchaseId::new(), &supplier, vec![line(2, dec!(3.5))], test_time())
                .unwrap();
        assert_eq!(purchase.status(), PurchaseStatus::Pending);
        assert_eq!(purchase.supplier_id(), supplier.id);
        assert_eq!(purchase.supplier_name(), "Acme Mills");
        assert_eq!(purchase.created_at(), purchase.updated_at());
    }

    #[test]
    fn total_is_sum_of_subtotals() {
        let mut purchase = Purchase::create(
            PurchaseId::new(),
            &test_supplier(),
            vec![line(2, dec!(3.5)), line(4, dec!(0.25))],
            test_time(),
        )
        .unwrap();
        assert_eq!(purchase.total(), dec!(8));

        purchase
            .replace_lines(vec![line(1, dec!(10))], test_time())
            .unwrap();
        assert_eq!(purchase.total(), dec!(10));
    }

    #[test]
    fn toggle_cycles_between_pending_and_paid() {
        let mut purchase =
            Purchase::create(PurchaseId::new(), &test_supplier(), vec![line(1, dec!(1))], test_time())
                .unwrap();
        assert!(purchase.toggle_payment(test_time()));
        assert_eq!(purchase.status(), PurchaseStatus::Paid);
        assert!(purchase.toggle_payment(test_time()));
        assert_eq!(purchase.status(), PurchaseStatus::Pending);
    }

    #[test]
    fn void_is_terminal() {
        let mut purchase =
            Purchase::create(PurchaseId::new(), &test_supplier(), vec![line(1, dec!(1))], test_time())
                .unwrap();
        purchase.void(test_time());
        let snapshot = purchase.clone();

        for _ in 0..3 {
            assert!(!purchase.toggle_payment(test_time()));
        }
        assert_eq!(purchase, snapshot);

        let err = purchase
            .replace_lines(vec![line(1, dec!(1))], test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn subtotal_overflow_is_a_validation_error() {
        let err = PurchaseLine::new(ItemId::new(), ItemKind::Ingredient, "Gold", 10, Decimal::MAX)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn total_overflow_is_a_validation_error() {
        let lines = vec![line(1, Decimal::MAX), line(1, Decimal::MAX)];
        let err = Purchase::create(PurchaseId::new(), &test_supplier(), lines, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut purchase =
            Purchase::create(PurchaseId::new(), &test_supplier(), vec![line(1, dec!(1))], test_time())
                .unwrap();
        let snapshot = purchase.clone();
        let err = purchase
            .replace_lines(vec![line(1, Decimal::MAX), line(1, dec!(1))], test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(purchase, snapshot);
    }

    #[test]
    fn validate_lines_rejects_bad_input() {
        let id = ItemId::new();
        assert!(validate_lines(&[]).is_err());
        assert!(validate_lines(&[LineInput::new(id, 0, dec!(1))]).is_err());
        assert!(validate_lines(&[LineInput::new(id, -3, dec!(1))]).is_err());
        assert!(validate_lines(&[LineInput::new(id, 1, dec!(-0.01))]).is_err());
        assert!(validate_lines(&[LineInput::new(id, 1, dec!(0))]).is_ok());
    }

    #[test]
    fn denormalize_copies_kind_and_name() {
        let item = Item::ingredient(ItemId::new(), "Cocoa", 0, dec!(4)).unwrap();
        let line =
            PurchaseLine::denormalize(&LineInput::new(item.id_typed(), 3, dec!(5)), &item).unwrap();
        assert_eq!(line.item_kind(), ItemKind::Ingredient);
        assert_eq!(line.item_name(), "Cocoa");
        assert_eq!(line.subtotal(), dec!(15));
    }
}
