use axum::Router;

pub mod items;
pub mod purchases;
pub mod suppliers;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .nest("/purchases", purchases::router())
        .nest("/items", items::router())
        .nest("/suppliers", suppliers::router())
}
