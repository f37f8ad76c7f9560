//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store + coordinator wiring, blocking-call bridge
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use stockroom_infra::EngineConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router over a fresh in-memory store.
pub fn build_app(config: EngineConfig) -> Router {
    build_app_with(Arc::new(services::AppServices::in_memory(config)))
}

/// Build the router over existing services (tests seed through the same store).
pub fn build_app_with(services: Arc<services::AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
}
