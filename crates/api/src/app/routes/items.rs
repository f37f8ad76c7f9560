use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockroom_inventory::Item;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:id", get(get_item).put(put_item))
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id = match dto::parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.run(move |c| c.get_item(item_id)).await {
        Ok(item) => Json(dto::ItemResponse::from(&item)).into_response(),
        Err(e) => errors::purchase_error_to_response(e),
    }
}

/// Catalog maintenance: create or replace an item document outside any purchase.
pub async fn put_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::PutItemRequest>,
) -> axum::response::Response {
    let item_id = match dto::parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let recipe = match dto::parse_recipe(body.recipe) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let item = Item::new(item_id, body.kind, body.name, body.stock, body.cost)
        .and_then(|item| item.with_recipe(recipe))
        .map(|item| match body.stock_minimo {
            Some(min) => item.with_stock_minimo(min),
            None => item,
        });
    let item = match item {
        Ok(v) => v,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    match services.store().put_item(&item) {
        Ok(_) => Json(dto::ItemResponse::from(&item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
