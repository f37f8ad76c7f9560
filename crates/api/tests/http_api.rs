use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use stockroom_api::app::services::AppServices;
use stockroom_core::{ItemId, PurchaseId, SupplierId};
use stockroom_infra::EngineConfig;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(EngineConfig::default()));
        let app = stockroom_api::app::build_app_with(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn put_json(client: &reqwest::Client, url: String, body: serde_json::Value) -> reqwest::Response {
    client.put(url).json(&body).send().await.unwrap()
}

async fn seed_supplier(client: &reqwest::Client, server: &TestServer) -> String {
    let id = SupplierId::new().to_string();
    let res = put_json(client, server.url(&format!("/suppliers/{id}")), json!({"name": "Acme"})).await;
    assert_eq!(res.status(), StatusCode::OK);
    id
}

async fn seed_item(client: &reqwest::Client, server: &TestServer, body: serde_json::Value) -> String {
    let id = ItemId::new().to_string();
    let res = put_json(client, server.url(&format!("/items/{id}")), body).await;
    assert_eq!(res.status(), StatusCode::OK);
    id
}

async fn get_item(client: &reqwest::Client, server: &TestServer, id: &str) -> serde_json::Value {
    client
        .get(server.url(&format!("/items/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn decimal(v: &serde_json::Value) -> rust_decimal::Decimal {
    v.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn purchase_lifecycle_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let supplier = seed_supplier(&client, &server).await;
    let flour = seed_item(
        &client,
        &server,
        json!({"kind": "INGREDIENT", "name": "Flour", "stock": 10, "cost": "10"}),
    )
    .await;
    let bread = seed_item(
        &client,
        &server,
        json!({
            "kind": "PRODUCT",
            "name": "Bread",
            "cost": "30",
            "recipe": [{"ingredient_id": flour, "quantity": "3"}]
        }),
    )
    .await;

    // Create
    let res = client
        .post(server.url("/purchases"))
        .json(&json!({
            "supplier_id": supplier,
            "lines": [{"item_id": flour, "quantity": 5, "unit_cost": "20"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["status"], json!("PENDING"));
    assert_eq!(created["supplier_name"], json!("Acme"));
    assert_eq!(decimal(&created["total"]), rust_decimal::Decimal::from(100));
    let purchase_id = created["id"].as_str().unwrap().to_string();

    let flour_view = get_item(&client, &server, &flour).await;
    assert_eq!(flour_view["stock"], json!(15));
    assert_eq!(decimal(&flour_view["cost"]), rust_decimal::Decimal::from(20));
    let bread_view = get_item(&client, &server, &bread).await;
    assert_eq!(decimal(&bread_view["cost"]), rust_decimal::Decimal::from(60));

    // Edit
    let res = put_json(
        &client,
        server.url(&format!("/purchases/{purchase_id}")),
        json!({"lines": [{"item_id": flour, "quantity": 2, "unit_cost": "20"}]}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(get_item(&client, &server, &flour).await["stock"], json!(12));

    // Toggle twice
    for expected in ["PAID", "PENDING"] {
        let res = client
            .post(server.url(&format!("/purchases/{purchase_id}/toggle-payment")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["status"], json!(expected));
    }

    // Read back
    let res = client
        .get(server.url(&format!("/purchases/{purchase_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["lines"][0]["quantity"], json!(2));
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let supplier = seed_supplier(&client, &server).await;
    let flour = seed_item(&client, &server, json!({"kind": "INGREDIENT", "name": "Flour"})).await;

    // Validation
    let res = client
        .post(server.url("/purchases"))
        .json(&json!({"supplier_id": supplier, "lines": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("validation_error"));

    // Unknown item
    let res = client
        .post(server.url("/purchases"))
        .json(&json!({
            "supplier_id": supplier,
            "lines": [
                {"item_id": flour, "quantity": 1, "unit_cost": "1"},
                {"item_id": ItemId::new().to_string(), "quantity": 1, "unit_cost": "1"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(get_item(&client, &server, &flour).await["stock"], json!(0));

    // Unknown purchase
    let res = client
        .post(server.url(&format!("/purchases/{}/toggle-payment", PurchaseId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Malformed id
    let res = client.get(server.url("/items/not-a-uuid")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("invalid_id"));
}

#[tokio::test]
async fn seeded_item_reports_default_threshold() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let salt = seed_item(&client, &server, json!({"kind": "INGREDIENT", "name": "Salt", "stock": 2})).await;

    let view = get_item(&client, &server, &salt).await;
    assert_eq!(view["stock_minimo"], json!(5));
    assert_eq!(view["below_minimum"], json!(true));
}
