use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::put,
};

use stockroom_purchasing::Supplier;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:id", put(put_supplier))
}

/// Create or replace a supplier document.
pub async fn put_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::PutSupplierRequest>,
) -> axum::response::Response {
    let supplier_id = match dto::parse_supplier_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let supplier = Supplier::new(supplier_id, body.name);
    match services.store().put_supplier(&supplier) {
        Ok(_) => Json(dto::SupplierResponse::from(&supplier)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
