use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_purchase))
        .route("/:id", get(get_purchase).put(edit_purchase))
        .route("/:id/toggle-payment", post(toggle_payment))
}

pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreatePurchaseRequest>,
) -> axum::response::Response {
    let supplier_id = match dto::parse_supplier_id(&body.supplier_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lines = match dto::parse_lines(body.lines) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.run(move |c| c.create_purchase(supplier_id, lines)).await {
        Ok(purchase) => (
            StatusCode::CREATED,
            Json(dto::PurchaseResponse::from(&purchase)),
        )
            .into_response(),
        Err(e) => errors::purchase_error_to_response(e),
    }
}

pub async fn edit_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::EditPurchaseRequest>,
) -> axum::response::Response {
    let purchase_id = match dto::parse_purchase_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lines = match dto::parse_lines(body.lines) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.run(move |c| c.edit_purchase(purchase_id, lines)).await {
        Ok(purchase) => Json(dto::PurchaseResponse::from(&purchase)).into_response(),
        Err(e) => errors::purchase_error_to_response(e),
    }
}

pub async fn toggle_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let purchase_id = match dto::parse_purchase_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.run(move |c| c.toggle_payment_status(purchase_id)).await {
        Ok(purchase) => Json(dto::PurchaseResponse::from(&purchase)).into_response(),
        Err(e) => errors::purchase_error_to_response(e),
    }
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let purchase_id = match dto::parse_purchase_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.run(move |c| c.get_purchase(purchase_id)).await {
        Ok(purchase) => Json(dto::PurchaseResponse::from(&purchase)).into_response(),
        Err(e) => errors::purchase_error_to_response(e),
    }
}
