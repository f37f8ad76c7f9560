use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_infra::{PurchaseError, StoreError};

pub fn purchase_error_to_response(err: PurchaseError) -> axum::response::Response {
    match err {
        PurchaseError::NotFound { entity, id } => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found: {id}"))
        }
        PurchaseError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        PurchaseError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        PurchaseError::Internal(msg) => {
            tracing::error!("internal error: {msg}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    purchase_error_to_response(PurchaseError::from(err))
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what}"))
}
