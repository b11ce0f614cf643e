use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;

use tillpoint_auth::{JwtClaims, Role};
use tillpoint_core::{CustomerId, ItemId, StaffId};
use tillpoint_infra::{InMemoryRetailStore, RetailStore};
use tillpoint_inventory::InventoryItem;
use tillpoint_parties::Customer;

struct TestServer {
    base_url: String,
    store: Arc<InMemoryRetailStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod, but over a seedable in-memory store and an
        // ephemeral port.
        let store = Arc::new(InMemoryRetailStore::new());
        let app =
            tillpoint_api::app::build_app_with_store(jwt_secret.to_string(), store.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, role: &str) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: StaffId::new(),
        role: Role::new(role.to_string()),
        iat: now - ChronoDuration::minutes(1),
        exp: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn seeded_item(name: &str, stock: i64, price: rust_decimal::Decimal) -> InventoryItem {
    let now = Utc::now();
    InventoryItem {
        id: ItemId::new(),
        part_number: format!("PN-{name}"),
        name: name.to_string(),
        description: None,
        category: None,
        cost_price: price / dec!(2),
        selling_price: price,
        quantity_in_stock: stock,
        min_stock_level: 2,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_open() {
    let srv = TestServer::spawn("test-secret").await;

    let res = reqwest::get(format!("{}/health", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn staff_context_is_derived_from_token() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"].as_str().unwrap(), "admin");
}

#[tokio::test]
async fn non_admin_cannot_mutate_inventory() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "staff");

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/inventory/", srv.base_url))
        .bearer_auth(token)
        .json(&json!({
            "part_number": "PN-1",
            "name": "Widget",
            "cost_price": "5",
            "selling_price": "10",
            "quantity_in_stock": 3,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inventory_lifecycle_create_query_update() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/inventory/", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "part_number": "ALT-100",
            "name": "Alternator",
            "category": "electrical",
            "cost_price": "50",
            "selling_price": "100",
            "quantity_in_stock": 5,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/inventory/{}", srv.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let item: serde_json::Value = res.json().await.unwrap();
    assert_eq!(item["name"].as_str().unwrap(), "Alternator");

    let res = client
        .put(format!("{}/inventory/{}", srv.base_url, id))
        .bearer_auth(&token)
        .json(&json!({ "selling_price": "110" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/inventory/?search=alternator", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_creates_a_transaction_and_decrements_stock() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "staff");

    let item = seeded_item("Alternator", 5, dec!(100));
    let item_id = item.id;
    srv.store.seed_item(item);

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/pos/checkout", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "items": [{ "id": item_id.to_string(), "quantity": 2, "price": "100" }],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["totals"]["subtotal"].as_str().unwrap(), "200.00");
    assert_eq!(body["totals"]["total"].as_str().unwrap(), "216.00");
    assert_eq!(body["data"]["status"].as_str().unwrap(), "completed");

    assert_eq!(srv.store.fetch_stock(item_id).await.unwrap(), 3);

    let res = client
        .get(format!("{}/transactions/", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_shortfall_is_a_bad_request_with_details() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "staff");

    let item = seeded_item("Belt", 1, dec!(50));
    let item_id = item.id;
    srv.store.seed_item(item);

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/pos/checkout", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "items": [{ "id": item_id.to_string(), "quantity": 3, "price": "50" }],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "insufficient_stock");
    assert_eq!(body["details"].as_array().unwrap().len(), 1);

    assert_eq!(srv.store.fetch_stock(item_id).await.unwrap(), 1);
}

#[tokio::test]
async fn debt_settlement_updates_the_balance() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "staff");

    let now = Utc::now();
    let customer = Customer {
        id: CustomerId::new(),
        name: "Dana".to_string(),
        phone: None,
        address: None,
        debt_balance: dec!(500),
        created_at: now,
        updated_at: now,
    };
    let customer_id = customer.id;
    srv.store.seed_customer(customer);

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/customers/{}/debt", srv.base_url, customer_id))
        .bearer_auth(&token)
        .json(&json!({ "amount": "120", "action": "settle" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["previous_balance"].as_str().unwrap(), "500");
    assert_eq!(body["new_balance"].as_str().unwrap(), "380");
}
