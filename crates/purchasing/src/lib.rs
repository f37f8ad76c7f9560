//! Purchasing domain module (purchase ledger + stock reconciliation).
//!
//! This crate contains business rules for purchases, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod purchase;
pub mod reconcile;
pub mod supplier;

pub use purchase::{LineInput, Purchase, PurchaseLine, PurchaseStatus, validate_lines};
pub use reconcile::{
    ItemAdjustment, Reconciliation, StockLevel, reconcile_create, reconcile_edit,
    referenced_items, touched_ingredients,
};
pub use supplier::Supplier;
