//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{FulfillmentPolicy, InMemoryLabelBroker, InMemoryPaymentGateway};
use store::MemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    state: Arc<api::routes::orders::AppState<MemoryStore>>,
    payments: InMemoryPaymentGateway,
    broker: InMemoryLabelBroker,
}

fn origin_address_policy() -> FulfillmentPolicy {
    FulfillmentPolicy {
        origin_address: Some(domain::Address {
            name: "Atelier Lumen".to_string(),
            line1: "8 Kiln Street".to_string(),
            line2: None,
            city: "Providence".to_string(),
            state: "RI".to_string(),
            zip: "02903".to_string(),
            country: "US".to_string(),
        }),
        ..Default::default()
    }
}

fn setup_with_policy(policy: FulfillmentPolicy) -> TestApp {
    let store = MemoryStore::new();
    let (state, payments, broker, _notifier) = api::create_default_state(store, policy);
    let app = api::create_app(state.clone(), get_metrics_handle());
    TestApp {
        app,
        state,
        payments,
        broker,
    }
}

fn setup() -> TestApp {
    setup_with_policy(origin_address_policy())
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn address_json() -> serde_json::Value {
    serde_json::json!({
        "name": "Jordan Rivers",
        "line1": "12 Harbor Lane",
        "city": "Barnstable",
        "state": "MA",
        "zip": "02601",
        "country": "US"
    })
}

fn contact_json() -> serde_json::Value {
    serde_json::json!({
        "email": "jordan@example.com",
        "first_name": "Jordan",
        "last_name": "Rivers"
    })
}

/// Creates a product over the API and returns its id.
async fn seed_product(app: &Router, slug: &str, price_cents: i64, stock: u32) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/products",
        Some(serde_json::json!({
            "title": "Silver Hoop Earrings",
            "slug": slug,
            "category": "earrings",
            "price_cents": price_cents,
            "inventory_count": stock
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

fn checkout_json(product_id: &str, quantity: u32) -> serde_json::Value {
    serde_json::json!({
        "contact": contact_json(),
        "shipping_address": address_json(),
        "billing_address": address_json(),
        "payment_token": "tok-visa",
        "items": [{ "product_id": product_id, "quantity": quantity }]
    })
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();
    let (status, body) = request(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_and_list_products() {
    let t = setup();
    let id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (status, body) = request(&t.app, "GET", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "silver-hoops");
    assert_eq!(body["price_cents"], 2500);
    assert_eq!(body["is_active"], true);

    let (status, body) = request(&t.app, "GET", "/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_product_with_bad_category() {
    let t = setup();
    let (status, body) = request(
        &t.app,
        "POST",
        "/products",
        Some(serde_json::json!({
            "title": "Ring",
            "slug": "ring",
            "category": "rings",
            "price_cents": 2500,
            "inventory_count": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("category"));
}

#[tokio::test]
async fn test_checkout_and_get_order() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (status, receipt) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 2))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["status"], "paid");
    assert_eq!(receipt["subtotal"], 5000);
    assert_eq!(receipt["tax"], 313);
    assert_eq!(receipt["shipping"], 599);
    assert_eq!(receipt["total"], 5912);
    let order_number = receipt["order_number"].as_str().unwrap();
    assert!(order_number.starts_with("ORD-"));

    let order_id = receipt["order_id"].as_str().unwrap();
    let (status, order) = request(&t.app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order_number"], order_number);
    assert_eq!(
        order["subtotal_cents"].as_i64().unwrap()
            + order["tax_cents"].as_i64().unwrap()
            + order["shipping_cents"].as_i64().unwrap(),
        order["total_cents"].as_i64().unwrap()
    );
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["unit_price_cents"], 2500);
    assert!(order["payment_id"].as_str().is_some());
}

#[tokio::test]
async fn test_checkout_insufficient_stock_is_itemized() {
    let t = setup();
    let product_id = seed_product(&t.app, "opal-ring", 4000, 1).await;

    let (status, body) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 3))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let shortfalls = body["shortfalls"].as_array().unwrap();
    assert_eq!(shortfalls.len(), 1);
    assert_eq!(shortfalls[0]["requested"], 3);
    assert_eq!(shortfalls[0]["available"], 1);
    assert_eq!(t.payments.charge_count(), 0);
}

#[tokio::test]
async fn test_checkout_unknown_product() {
    let t = setup();
    let fake_id = uuid::Uuid::new_v4().to_string();
    let (status, _) = request(&t.app, "POST", "/orders", Some(checkout_json(&fake_id, 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let t = setup();
    let (status, body) = request(
        &t.app,
        "POST",
        "/orders",
        Some(serde_json::json!({
            "contact": contact_json(),
            "shipping_address": address_json(),
            "billing_address": address_json(),
            "payment_token": "tok-visa",
            "items": []
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cart"));
}

#[tokio::test]
async fn test_payment_decline_maps_to_402() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;
    t.payments.set_fail_on_charge(true);

    let (status, _) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 1))).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

/// Guest checkout, then the full return lifecycle through to a refund.
#[tokio::test]
async fn test_return_flow_with_refund() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (_, receipt) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 1))).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();

    let (_, order) = request(&t.app, "GET", &format!("/orders/{order_id}"), None).await;
    let order_item_id = order["items"][0]["id"].as_str().unwrap();

    // Request the return (guest order: no requester needed).
    let (status, ret) = request(
        &t.app,
        "POST",
        "/returns",
        Some(serde_json::json!({
            "order_id": order_id,
            "items": [{ "order_item_id": order_item_id, "quantity": 1 }],
            "reason": "wrong size"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ret["status"], "pending");
    assert_eq!(ret["refund_amount_cents"], 2500);
    assert!(ret["return_number"].as_str().unwrap().starts_with("RET-"));
    let return_id = ret["id"].as_str().unwrap().to_string();

    // Approve.
    let (status, ret) = request(
        &t.app,
        "POST",
        &format!("/returns/{return_id}/status"),
        Some(serde_json::json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ret["status"], "approved");

    // Refund.
    let (status, ret) = request(
        &t.app,
        "POST",
        &format!("/returns/{return_id}/status"),
        Some(serde_json::json!({ "status": "refunded" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ret["status"], "refunded");
    assert!(ret["refund_transaction_id"].as_str().is_some());
    assert_eq!(t.payments.refund_count(), 1);
}

#[tokio::test]
async fn test_failed_refund_responds_502_and_preserves_return() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (_, receipt) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 1))).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();
    let (_, order) = request(&t.app, "GET", &format!("/orders/{order_id}"), None).await;
    let order_item_id = order["items"][0]["id"].as_str().unwrap();

    let (_, ret) = request(
        &t.app,
        "POST",
        "/returns",
        Some(serde_json::json!({
            "order_id": order_id,
            "items": [{ "order_item_id": order_item_id, "quantity": 1 }]
        })),
    )
    .await;
    let return_id = ret["id"].as_str().unwrap().to_string();

    request(
        &t.app,
        "POST",
        &format!("/returns/{return_id}/status"),
        Some(serde_json::json!({ "status": "approved" })),
    )
    .await;

    t.payments.set_fail_on_refund(true);
    let (status, body) = request(
        &t.app,
        "POST",
        &format!("/returns/{return_id}/status"),
        Some(serde_json::json!({ "status": "refunded" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().is_some());

    // The return is untouched: still approved, no transaction recorded.
    let (_, ret) = request(&t.app, "GET", &format!("/returns/{return_id}"), None).await;
    assert_eq!(ret["status"], "approved");
    assert!(ret["refund_transaction_id"].is_null());
}

#[tokio::test]
async fn test_return_for_foreign_order_is_forbidden() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let owner = uuid::Uuid::new_v4().to_string();
    let mut checkout = checkout_json(&product_id, 1);
    checkout["user_id"] = serde_json::json!(owner);
    let (_, receipt) = request(&t.app, "POST", "/orders", Some(checkout)).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();
    let (_, order) = request(&t.app, "GET", &format!("/orders/{order_id}"), None).await;
    let order_item_id = order["items"][0]["id"].as_str().unwrap();

    let (status, _) = request(
        &t.app,
        "POST",
        "/returns",
        Some(serde_json::json!({
            "order_id": order_id,
            "requester": uuid::Uuid::new_v4().to_string(),
            "items": [{ "order_item_id": order_item_id, "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_label_generation_is_idempotent() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (_, receipt) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 2))).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();

    let (status, shipment) =
        request(&t.app, "POST", &format!("/orders/{order_id}/label"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipment["status"], "purchased");
    assert_eq!(shipment["carrier"], "usps");
    let tracking = shipment["tracking_number"].as_str().unwrap().to_string();

    // The parent order advanced and carries the tracking number.
    let (_, order) = request(&t.app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(order["status"], "processing");
    assert_eq!(order["tracking_number"], tracking.as_str());

    // A second call returns the same label without a second purchase.
    let (status, again) =
        request(&t.app, "POST", &format!("/orders/{order_id}/label"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["tracking_number"], tracking.as_str());
    assert_eq!(t.broker.purchase_count(), 1);

    let (_, shipments) =
        request(&t.app, "GET", &format!("/orders/{order_id}/shipments"), None).await;
    assert_eq!(shipments.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_label_without_origin_is_a_server_error() {
    let t = setup_with_policy(FulfillmentPolicy::default());
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (_, receipt) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 1))).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();

    let (status, body) =
        request(&t.app, "POST", &format!("/orders/{order_id}/label"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("origin"));
}

#[tokio::test]
async fn test_broker_failure_is_recorded_on_the_shipment() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (_, receipt) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 1))).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();

    t.broker.set_fail_on_create(true);
    let (status, _) =
        request(&t.app, "POST", &format!("/orders/{order_id}/label"), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, shipments) =
        request(&t.app, "GET", &format!("/orders/{order_id}/shipments"), None).await;
    let shipments = shipments.as_array().unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(shipments[0]["status"], "failed");
    assert!(shipments[0]["error_message"].as_str().is_some());
}

#[tokio::test]
async fn test_admin_order_status_update() {
    let t = setup();
    let product_id = seed_product(&t.app, "silver-hoops", 2500, 10).await;

    let (_, receipt) =
        request(&t.app, "POST", "/orders", Some(checkout_json(&product_id, 1))).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();

    let (status, order) = request(
        &t.app,
        "POST",
        &format!("/orders/{order_id}/status"),
        Some(serde_json::json!({ "status": "shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "shipped");

    // Backwards transitions are conflicts.
    let (status, _) = request(
        &t.app,
        "POST",
        &format!("/orders/{order_id}/status"),
        Some(serde_json::json!({ "status": "paid" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_id_format() {
    let t = setup();
    let (status, _) = request(&t.app, "GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let t = setup();
    let fake_id = uuid::Uuid::new_v4();
    let (status, _) = request(&t.app, "GET", &format!("/orders/{fake_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let _ = &t.state;
}
