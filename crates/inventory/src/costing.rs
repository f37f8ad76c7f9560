//! Recipe cost propagation.
//!
//! Pure functions: callers gather every product and ingredient cost up front,
//! then ask for the recomputed composite costs. Nothing here performs IO, which
//! keeps the computation usable between a transaction's reads and its writes.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use stockroom_core::{DomainError, DomainResult, ItemId};

use crate::item::{Item, RecipeLine};

/// Outcome of recomputing one composite product's cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputedCost {
    pub product_id: ItemId,
    pub previous: Decimal,
    pub cost: Decimal,
    /// Recipe ingredients that could not be resolved; each contributed zero.
    pub missing_ingredients: Vec<ItemId>,
}

impl RecomputedCost {
    pub fn changed(&self) -> bool {
        self.previous != self.cost
    }
}

/// `Σ line.quantity * cost(line.ingredient)` over a recipe.
///
/// Returns the total and the ingredient ids `cost_of` could not resolve.
/// Fails when the cost does not fit in a `Decimal`.
pub fn recipe_cost<F>(recipe: &[RecipeLine], cost_of: F) -> DomainResult<(Decimal, Vec<ItemId>)>
where
    F: Fn(&ItemId) -> Option<Decimal>,
{
    let mut missing = Vec::new();
    let mut total = Decimal::ZERO;
    for line in recipe {
        let Some(cost) = cost_of(&line.ingredient_id) else {
            missing.push(line.ingredient_id);
            continue;
        };
        total = line
            .quantity
            .checked_mul(cost)
            .and_then(|contribution| total.checked_add(contribution))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "recipe cost overflows at ingredient {}",
                    line.ingredient_id
                ))
            })?;
    }
    Ok((total, missing))
}

/// Composite products among `products` whose recipe uses a touched ingredient.
pub fn affected_composites<'a, I>(
    products: I,
    touched: &'a BTreeSet<ItemId>,
) -> impl Iterator<Item = &'a Item> + 'a
where
    I: IntoIterator<Item = &'a Item>,
    I::IntoIter: 'a,
{
    products
        .into_iter()
        .filter(move |p| p.is_composite() && p.references_any(touched))
}

/// Every ingredient id any of `products` needs to cost its recipe.
pub fn recipe_ingredients<'a, I>(products: I) -> BTreeSet<ItemId>
where
    I: IntoIterator<Item = &'a Item>,
{
    products
        .into_iter()
        .flat_map(|p| p.recipe().iter().map(|line| line.ingredient_id))
        .collect()
}

/// Recompute the cost of every composite product depending on `touched`.
///
/// `cost_of` must answer with the ingredient costs as they will stand at the
/// end of the current operation. Results are ordered by product id.
pub fn propagate_costs<'a, I, F>(
    products: I,
    touched: &BTreeSet<ItemId>,
    cost_of: F,
) -> DomainResult<Vec<RecomputedCost>>
where
    I: IntoIterator<Item = &'a Item>,
    F: Fn(&ItemId) -> Option<Decimal>,
{
    if touched.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = products
        .into_iter()
        .filter(|p| p.is_composite() && p.references_any(touched))
        .map(|product| -> DomainResult<RecomputedCost> {
            let (cost, missing_ingredients) = recipe_cost(product.recipe(), &cost_of)?;
            Ok(RecomputedCost {
                product_id: product.id_typed(),
                previous: product.cost(),
                cost,
                missing_ingredients,
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    out.sort_by_key(|r| r.product_id);
    out.dedup_by_key(|r| r.product_id);
    Ok(out)
}
