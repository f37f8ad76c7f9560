use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, ItemId};

/// Low-stock threshold applied when a stored item carries none.
///
/// Only the alerting side reads this; purchases never change it.
pub const DEFAULT_STOCK_MINIMO: i64 = 5;

/// What an inventory item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    /// Raw item bought from suppliers and consumed by recipes.
    Ingredient,
    /// Sellable item; composite when it carries a recipe.
    Product,
}

impl core::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ItemKind::Ingredient => f.write_str("INGREDIENT"),
            ItemKind::Product => f.write_str("PRODUCT"),
        }
    }
}

/// One ingredient entry of a composite product's recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: ItemId,
    /// Amount of the ingredient consumed per unit of product.
    pub quantity: Decimal,
}

/// Inventory item (raw ingredient or sellable product).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    kind: ItemKind,
    name: String,
    stock: i64,
    cost: Decimal,
    stock_minimo: i64,
    recipe: Vec<RecipeLine>,
}

impl Item {
    /// Build an item, checking the invariants every stored item must satisfy.
    ///
    /// Stock is signed on purpose: it may go negative and is never clamped.
    pub fn new(
        id: ItemId,
        kind: ItemKind,
        name: impl Into<String>,
        stock: i64,
        cost: Decimal,
    ) -> DomainResult<Self> {
        ensure_cost(cost)?;
        Ok(Self {
            id,
            kind,
            name: name.into(),
            stock,
            cost,
            stock_minimo: DEFAULT_STOCK_MINIMO,
            recipe: Vec::new(),
        })
    }

    pub fn ingredient(id: ItemId, name: impl Into<String>, stock: i64, cost: Decimal) -> DomainResult<Self> {
        Self::new(id, ItemKind::Ingredient, name, stock, cost)
    }

    pub fn product(id: ItemId, name: impl Into<String>, stock: i64, cost: Decimal) -> DomainResult<Self> {
        Self::new(id, ItemKind::Product, name, stock, cost)
    }

    /// Attach a recipe, turning a product into a composite product.
    pub fn with_recipe(mut self, recipe: Vec<RecipeLine>) -> DomainResult<Self> {
        if !recipe.is_empty() && self.kind != ItemKind::Product {
            return Err(DomainError::invariant("only products can carry a recipe"));
        }
        if let Some(line) = recipe.iter().find(|l| l.quantity.is_sign_negative()) {
            return Err(DomainError::validation(format!(
                "recipe quantity for ingredient {} cannot be negative",
                line.ingredient_id
            )));
        }
        self.recipe = recipe;
        Ok(self)
    }

    pub fn with_stock_minimo(mut self, stock_minimo: i64) -> Self {
        self.stock_minimo = stock_minimo;
        self
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn stock_minimo(&self) -> i64 {
        self.stock_minimo
    }

    pub fn recipe(&self) -> &[RecipeLine] {
        &self.recipe
    }

    /// A product whose cost is derived from its recipe.
    pub fn is_composite(&self) -> bool {
        self.kind == ItemKind::Product && !self.recipe.is_empty()
    }

    /// True when the recipe uses at least one of `ingredients`.
    pub fn references_any(&self, ingredients: &BTreeSet<ItemId>) -> bool {
        self.recipe
            .iter()
            .any(|line| ingredients.contains(&line.ingredient_id))
    }

    pub fn is_below_minimum(&self) -> bool {
        self.stock < self.stock_minimo
    }

    pub fn set_stock(&mut self, stock: i64) {
        self.stock = stock;
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn ensure_cost(cost: Decimal) -> DomainResult<()> {
    if cost.is_sign_negative() && !cost.is_zero() {
        return Err(DomainError::validation("cost cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_item_rejects_negative_cost() {
        let err = Item::ingredient(ItemId::new(), "Flour", 0, dec!(-1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn stock_is_never_clamped() {
        let mut item = Item::ingredient(ItemId::new(), "Sugar", 3, dec!(2)).unwrap();
        item.set_stock(-7);
        assert_eq!(item.stock(), -7);
        assert!(item.is_below_minimum());
    }

    #[test]
    fn ingredients_cannot_carry_a_recipe() {
        let recipe = vec![RecipeLine {
            ingredient_id: ItemId::new(),
            quantity: dec!(1),
        }];
        let err = Item::ingredient(ItemId::new(), "Milk", 0, dec!(1))
            .unwrap()
            .with_recipe(recipe)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn composite_detection_requires_a_non_empty_recipe() {
        let flour = ItemId::new();
        let simple = Item::product(ItemId::new(), "Soda", 0, dec!(1)).unwrap();
        assert!(!simple.is_composite());

        let bread = Item::product(ItemId::new(), "Bread", 0, dec!(0))
            .unwrap()
            .with_recipe(vec![RecipeLine {
                ingredient_id: flour,
                quantity: dec!(0.5),
            }])
            .unwrap();
        assert!(bread.is_composite());
        assert!(bread.references_any(&BTreeSet::from([flour])));
        assert!(!bread.references_any(&BTreeSet::from([ItemId::new()])));
    }

    #[test]
    fn stock_minimo_defaults_to_named_threshold() {
        let item = Item::ingredient(ItemId::new(), "Salt", 10, dec!(1)).unwrap();
        assert_eq!(item.stock_minimo(), DEFAULT_STOCK_MINIMO);
        assert_eq!(item.with_stock_minimo(12).stock_minimo(), 12);
    }
}
