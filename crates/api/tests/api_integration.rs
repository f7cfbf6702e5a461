//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Account, InMemoryStore, Product, Storefront};
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
    app: axum::Router,
    store: InMemoryStore,
    buyer: Account,
    seller: Account,
    admin: Account,
    pen: Product,
}

impl TestApp {
    async fn new(balance: Money) -> Self {
        let store = InMemoryStore::new();
        let buyer = Account::new("buyer", balance);
        let seller = Account::new("seller", Money::zero());
        let admin = Account::admin("admin");
        let shop = Storefront::new(seller.user_id, "pens");
        let pen = Product::new(shop.id, "pen", Money::from_units(10), 5);

        for account in [&buyer, &seller, &admin] {
            store.insert_account(account.clone()).await;
        }
        store.insert_storefront(shop).await;
        store.insert_product(pen.clone()).await;

        let state = api::create_state(store.clone(), 2);
        let app = api::create_app(state, get_metrics_handle());

        Self {
            app,
            store,
            buyer,
            seller,
            admin,
            pen,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<UserId>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

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

    async fn add_pen(&self, quantity: i32) -> (StatusCode, serde_json::Value) {
        self.send(
            "POST",
            "/cart/items",
            Some(self.buyer.user_id),
            Some(serde_json::json!({ "product_id": self.pen.id, "quantity": quantity })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new(Money::zero()).await;

    let (status, json) = t.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new(Money::zero()).await;

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
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let t = TestApp::new(Money::zero()).await;

    let (status, json) = t.send("GET", "/cart", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("x-user-id"));
}

#[tokio::test]
async fn test_add_item_and_read_cart() {
    let t = TestApp::new(Money::zero()).await;

    let (status, json) = t.add_pen(3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "added");
    assert_eq!(json["current_quantity"], 3);

    let (status, cart) = t.send("GET", "/cart", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_price"], 3000);
    assert_eq!(cart["lines"][0]["product"]["title"], "pen");

    let uri = format!("/cart/products/{}", t.pen.id);
    let (_, json) = t.send("GET", &uri, Some(t.buyer.user_id), None).await;
    assert_eq!(json["quantity"], 3);
}

#[tokio::test]
async fn test_remove_item_and_empty_cart() {
    let t = TestApp::new(Money::zero()).await;
    t.add_pen(2).await;

    let (status, json) = t.add_pen(-5).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "removed");

    let (status, _) = t.send("DELETE", "/cart", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(t.store.cart_lines(t.buyer.user_id).await.is_empty());
}

#[tokio::test]
async fn test_get_cart_without_cart_is_not_found() {
    let t = TestApp::new(Money::zero()).await;

    let (status, _) = t.send("GET", "/cart", Some(t.buyer.user_id), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_flow() {
    let t = TestApp::new(Money::from_units(30)).await;
    t.add_pen(3).await;

    let (status, order) = t.send("POST", "/checkout", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_price"], 3000);
    assert_eq!(order["lines"][0]["quantity"], 3);

    let (_, account) = t.send("GET", "/account", Some(t.buyer.user_id), None).await;
    assert_eq!(account["balance_cents"], 0);

    let (status, orders) = t.send("GET", "/orders", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let uri = format!("/orders/{}", order["id"].as_str().unwrap());
    let (status, _) = t.send("GET", &uri, Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.send("GET", &uri, Some(t.seller.user_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.send("GET", &uri, Some(t.admin.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_checkout_rejections() {
    let t = TestApp::new(Money::from_units(20)).await;

    let (status, _) = t.send("POST", "/checkout", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    t.add_pen(3).await;
    let (status, json) = t.send("POST", "/checkout", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Insufficient funds"));

    t.add_pen(3).await;
    let deposit = serde_json::json!({ "amount_cents": 100_00 });
    t.send("POST", "/account/deposit", Some(t.buyer.user_id), Some(deposit))
        .await;
    let (status, json) = t.send("POST", "/checkout", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["products"], serde_json::json!(["pen"]));

    t.send("DELETE", "/cart", Some(t.buyer.user_id), None).await;
    let (status, json) = t.send("POST", "/checkout", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cart is empty");
}

#[tokio::test]
async fn test_deposit_and_reset() {
    let t = TestApp::new(Money::zero()).await;

    let small = serde_json::json!({ "amount_cents": 999 });
    let (status, _) = t
        .send("POST", "/account/deposit", Some(t.buyer.user_id), Some(small))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let ok = serde_json::json!({ "amount_cents": 2500 });
    let (status, json) = t
        .send("POST", "/account/deposit", Some(t.buyer.user_id), Some(ok))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["balance_cents"], 2500);

    let uri = format!("/accounts/{}/reset", t.buyer.user_id);
    let (status, _) = t.send("POST", &uri, Some(t.seller.user_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.send("POST", &uri, Some(t.admin.user_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        t.store.account(t.buyer.user_id).await.unwrap().balance,
        Money::zero()
    );
}

#[tokio::test]
async fn test_sales_views() {
    let t = TestApp::new(Money::from_units(30)).await;
    t.add_pen(1).await;
    t.send("POST", "/checkout", Some(t.buyer.user_id), None).await;

    let (status, sales) = t.send("GET", "/sales", Some(t.seller.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sales[0]["buyer_name"], "buyer");

    let (status, _) = t.send("GET", "/sales", Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/sales/products/{}", t.pen.id);
    let (status, sales) = t.send("GET", &uri, Some(t.seller.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sales.as_array().unwrap().len(), 1);

    let (status, _) = t.send("GET", &uri, Some(t.buyer.user_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_oversized_amounts_are_bad_requests() {
    let t = TestApp::new(Money::from_units(50)).await;

    let huge = serde_json::json!({ "amount_cents": i64::MAX });
    let (status, json) = t
        .send("POST", "/account/deposit", Some(t.buyer.user_id), Some(huge))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Out of range"));
    let (_, account) = t.send("GET", "/account", Some(t.buyer.user_id), None).await;
    assert_eq!(account["balance_cents"], 5000);

    t.add_pen(i32::MAX).await;
    let (status, _) = t.add_pen(1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
