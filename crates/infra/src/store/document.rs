//! Mapping between loosely-typed store documents and domain entities.
//!
//! Documents are plain JSON objects keyed by id (the id is not repeated in the
//! body). Missing optional fields fall back to the named defaults below.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue, json};

use stockroom_core::{ItemId, PurchaseId, SupplierId};
use stockroom_inventory::{DEFAULT_STOCK_MINIMO, Item, ItemKind, RecipeLine};
use stockroom_purchasing::{Purchase, PurchaseLine, PurchaseStatus, Supplier};

use super::r#trait::StoreError;

/// Stock assumed for an item document without a `stock` field.
pub const DEFAULT_STOCK: i64 = 0;

/// Cost assumed for an item document without a `cost` field.
pub const DEFAULT_COST: Decimal = Decimal::ZERO;

fn default_stock() -> i64 {
    DEFAULT_STOCK
}

fn default_cost() -> Decimal {
    DEFAULT_COST
}

fn default_stock_minimo() -> i64 {
    DEFAULT_STOCK_MINIMO
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeLineDocument {
    ingredient_id: ItemId,
    quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDocument {
    kind: ItemKind,
    name: String,
    #[serde(default = "default_stock")]
    stock: i64,
    #[serde(default = "default_cost")]
    cost: Decimal,
    #[serde(default = "default_stock_minimo")]
    stock_minimo: i64,
    #[serde(default)]
    recipe: Vec<RecipeLineDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SupplierDocument {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseLineDocument {
    item_id: ItemId,
    item_kind: ItemKind,
    #[serde(default)]
    item_name: String,
    quantity: i64,
    unit_cost: Decimal,
    /// Written for readers of the raw document; recomputed on load.
    #[serde(default)]
    subtotal: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseDocument {
    supplier_id: SupplierId,
    #[serde(default)]
    supplier_name: String,
    lines: Vec<PurchaseLineDocument>,
    /// Written for readers of the raw document; recomputed on load.
    #[serde(default)]
    total: Option<Decimal>,
    #[serde(default)]
    status: PurchaseStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn mapping(what: &str, id: impl core::fmt::Display, err: impl core::fmt::Display) -> StoreError {
    StoreError::Mapping(format!("{what} {id}: {err}"))
}

pub fn item_from_document(id: ItemId, body: JsonValue) -> Result<Item, StoreError> {
    let doc: ItemDocument = serde_json::from_value(body).map_err(|e| mapping("item", id, e))?;
    let recipe = doc
        .recipe
        .into_iter()
        .map(|l| RecipeLine {
            ingredient_id: l.ingredient_id,
            quantity: l.quantity,
        })
        .collect();

    Item::new(id, doc.kind, doc.name, doc.stock, doc.cost)
        .and_then(|item| item.with_recipe(recipe))
        .map(|item| item.with_stock_minimo(doc.stock_minimo))
        .map_err(|e| mapping("item", id, e))
}

pub fn item_to_document(item: &Item) -> JsonValue {
    let doc = ItemDocument {
        kind: item.kind(),
        name: item.name().to_string(),
        stock: item.stock(),
        cost: item.cost(),
        stock_minimo: item.stock_minimo(),
        recipe: item
            .recipe()
            .iter()
            .map(|l| RecipeLineDocument {
                ingredient_id: l.ingredient_id,
                quantity: l.quantity,
            })
            .collect(),
    };
    // Plain structs of strings/numbers always serialize.
    serde_json::to_value(doc).unwrap_or(JsonValue::Null)
}

/// Fields written by a stock/cost update; the rest of the item document stays as is.
pub fn item_stock_cost_fields(stock: Option<i64>, cost: Option<Decimal>) -> JsonMap<String, JsonValue> {
    let mut fields = JsonMap::new();
    if let Some(stock) = stock {
        fields.insert("stock".to_string(), json!(stock));
    }
    if let Some(cost) = cost {
        fields.insert("cost".to_string(), json!(cost));
    }
    fields
}

pub fn supplier_from_document(id: SupplierId, body: JsonValue) -> Result<Supplier, StoreError> {
    let doc: SupplierDocument =
        serde_json::from_value(body).map_err(|e| mapping("supplier", id, e))?;
    Ok(Supplier::new(id, doc.name))
}

pub fn supplier_to_document(supplier: &Supplier) -> JsonValue {
    json!({ "name": supplier.name })
}

pub fn purchase_from_document(id: PurchaseId, body: JsonValue) -> Result<Purchase, StoreError> {
    let doc: PurchaseDocument =
        serde_json::from_value(body).map_err(|e| mapping("purchase", id, e))?;

    let lines = doc
        .lines
        .into_iter()
        .map(|l| PurchaseLine::new(l.item_id, l.item_kind, l.item_name, l.quantity, l.unit_cost))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| mapping("purchase", id, e))?;

    Purchase::restore(
        id,
        doc.supplier_id,
        doc.supplier_name,
        lines,
        doc.status,
        doc.created_at,
        doc.updated_at,
    )
    .map_err(|e| mapping("purchase", id, e))
}

pub fn purchase_to_document(purchase: &Purchase) -> JsonValue {
    let doc = PurchaseDocument {
        supplier_id: purchase.supplier_id(),
        supplier_name: purchase.supplier_name().to_string(),
        lines: purchase
            .lines()
            .iter()
            .map(|l| PurchaseLineDocument {
                item_id: l.item_id(),
                item_kind: l.item_kind(),
                item_name: l.item_name().to_string(),
                quantity: l.quantity(),
                unit_cost: l.unit_cost(),
                subtotal: Some(l.subtotal()),
            })
            .collect(),
        total: Some(purchase.total()),
        status: purchase.status(),
        created_at: purchase.created_at(),
        updated_at: purchase.updated_at(),
    };
    serde_json::to_value(doc).unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_optional_item_fields_use_named_defaults() {
        let id = ItemId::new();
        let item = item_from_document(id, json!({"kind": "INGREDIENT", "name": "Yeast"})).unwrap();
        assert_eq!(item.stock(), DEFAULT_STOCK);
        assert_eq!(item.cost(), DEFAULT_COST);
        assert_eq!(item.stock_minimo(), DEFAULT_STOCK_MINIMO);
        assert!(item.recipe().is_empty());
    }

    #[test]
    fn numeric_and_string_costs_are_both_accepted() {
        let id = ItemId::new();
        let a = item_from_document(id, json!({"kind": "INGREDIENT", "name": "A", "cost": "2.50"}))
            .unwrap();
        let b = item_from_document(id, json!({"kind": "INGREDIENT", "name": "B", "cost": 2.5}))
            .unwrap();
        assert_eq!(a.cost(), dec!(2.5));
        assert_eq!(b.cost(), dec!(2.5));
    }

    #[test]
    fn invalid_item_documents_are_mapping_errors() {
        let id = ItemId::new();
        let negative = item_from_document(id, json!({"kind": "INGREDIENT", "name": "X", "cost": "-1"}));
        assert!(matches!(negative, Err(StoreError::Mapping(_))));

        let bad_kind = item_from_document(id, json!({"kind": "GADGET", "name": "X"}));
        assert!(matches!(bad_kind, Err(StoreError::Mapping(_))));
    }

    #[test]
    fn item_document_round_trip_keeps_recipe_and_threshold() {
        let flour = ItemId::new();
        let bread = Item::product(ItemId::new(), "Bread", 4, dec!(1.2))
            .unwrap()
            .with_recipe(vec![RecipeLine {
                ingredient_id: flour,
                quantity: dec!(0.4),
            }])
            .unwrap()
            .with_stock_minimo(2);

        let body = item_to_document(&bread);
        assert_eq!(body["stockMinimo"], json!(2));
        let back = item_from_document(bread.id_typed(), body).unwrap();
        assert_eq!(back, bread);
    }

    #[test]
    fn stored_purchase_total_is_ignored_on_load() {
        let id = PurchaseId::new();
        let item_id = ItemId::new();
        let body = json!({
            "supplierId": SupplierId::new(),
            "supplierName": "Acme",
            "lines": [{
                "itemId": item_id,
                "itemKind": "INGREDIENT",
                "itemName": "Flour",
                "quantity": 3,
                "unitCost": "2",
                "subtotal": "999"
            }],
            "total": "12345",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        });

        let purchase = purchase_from_document(id, body).unwrap();
        assert_eq!(purchase.status(), PurchaseStatus::Pending);
        assert_eq!(purchase.lines()[0].subtotal(), dec!(6));
        assert_eq!(purchase.total(), dec!(6));
    }
}
