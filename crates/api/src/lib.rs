//! HTTP API: routing and request/response mapping over the purchase coordinator.

pub mod app;
