//! Inventory domain module.
//!
//! Items, recipes and recipe-driven cost propagation, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod costing;
pub mod item;

pub use costing::{
    RecomputedCost, affected_composites, propagate_costs, recipe_cost, recipe_ingredients,
};
pub use item::{DEFAULT_STOCK_MINIMO, Item, ItemKind, RecipeLine};
