use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{Entity, ItemId, PurchaseId, SupplierId};
use stockroom_inventory::{Item, ItemKind, RecipeLine};
use stockroom_purchasing::{LineInput, Purchase, PurchaseLine, PurchaseStatus, Supplier};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PurchaseLineRequest {
    pub item_id: String,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub supplier_id: String,
    pub lines: Vec<PurchaseLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct EditPurchaseRequest {
    pub lines: Vec<PurchaseLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeLineRequest {
    pub ingredient_id: String,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PutItemRequest {
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub cost: Decimal,
    pub stock_minimo: Option<i64>,
    #[serde(default)]
    pub recipe: Vec<RecipeLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct PutSupplierRequest {
    pub name: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct PurchaseLineResponse {
    pub item_id: String,
    pub item_kind: ItemKind,
    pub item_name: String,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub subtotal: Decimal,
}

impl From<&PurchaseLine> for PurchaseLineResponse {
    fn from(line: &PurchaseLine) -> Self {
        Self {
            item_id: line.item_id().to_string(),
            item_kind: line.item_kind(),
            item_name: line.item_name().to_string(),
            quantity: line.quantity(),
            unit_cost: line.unit_cost(),
            subtotal: line.subtotal(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub status: PurchaseStatus,
    pub lines: Vec<PurchaseLineResponse>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Purchase> for PurchaseResponse {
    fn from(p: &Purchase) -> Self {
        Self {
            id: p.id().to_string(),
            supplier_id: p.supplier_id().to_string(),
            supplier_name: p.supplier_name().to_string(),
            status: p.status(),
            lines: p.lines().iter().map(PurchaseLineResponse::from).collect(),
            total: p.total(),
            created_at: p.created_at(),
            updated_at: p.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub kind: ItemKind,
    pub name: String,
    pub stock: i64,
    pub cost: Decimal,
    pub stock_minimo: i64,
    pub below_minimum: bool,
    pub recipe: Vec<RecipeLine>,
}

impl From<&Item> for ItemResponse {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id().to_string(),
            kind: item.kind(),
            name: item.name().to_string(),
            stock: item.stock(),
            cost: item.cost(),
            stock_minimo: item.stock_minimo(),
            below_minimum: item.is_below_minimum(),
            recipe: item.recipe().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SupplierResponse {
    pub id: String,
    pub name: String,
}

impl From<&Supplier> for SupplierResponse {
    fn from(s: &Supplier) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
        }
    }
}

// -------------------------
// Mapping helpers
// -------------------------

pub fn parse_item_id(raw: &str) -> Result<ItemId, axum::response::Response> {
    raw.parse().map_err(|_| errors::invalid_id("item id"))
}

pub fn parse_purchase_id(raw: &str) -> Result<PurchaseId, axum::response::Response> {
    raw.parse().map_err(|_| errors::invalid_id("purchase id"))
}

pub fn parse_supplier_id(raw: &str) -> Result<SupplierId, axum::response::Response> {
    raw.parse().map_err(|_| errors::invalid_id("supplier id"))
}

pub fn parse_lines(lines: Vec<PurchaseLineRequest>) -> Result<Vec<LineInput>, axum::response::Response> {
    lines
        .into_iter()
        .map(|l| -> Result<LineInput, axum::response::Response> {
            Ok(LineInput::new(parse_item_id(&l.item_id)?, l.quantity, l.unit_cost))
        })
        .collect()
}

pub fn parse_recipe(lines: Vec<RecipeLineRequest>) -> Result<Vec<RecipeLine>, axum::response::Response> {
    lines
        .into_iter()
        .map(|l| -> Result<RecipeLine, axum::response::Response> {
            Ok(RecipeLine {
                ingredient_id: parse_item_id(&l.ingredient_id)?,
                quantity: l.quantity,
            })
        })
        .collect()
}
