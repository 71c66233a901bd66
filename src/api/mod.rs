// ============================================================================
// HTTP API
// ============================================================================
//
// POST /orders       create an order for the caller       201 / 400 / 401 / 500
// GET  /orders/{id}  read one of the caller's orders      200 / 401 / 404 / 500
//
// App data required:
// - web::Data<dyn TokenVerifier>
// - web::Data<OrderProducer>
// - web::Data<OrderReader>
//
// ============================================================================

mod error;
mod extract;
mod handlers;
mod validation;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

pub use error::ApiError;
pub use extract::Authenticated;
pub use validation::{validate, CreateOrderRequest, FieldError, NewOrder};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/orders", web::post().to(handlers::create_order))
        .route("/orders/{id}", web::get().to(handlers::get_order));
}

/// Malformed JSON bodies answer 400 with the same shape as validation errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        tracing::debug!(error = %err, "Rejected request body");
        ApiError::Validation(vec![FieldError {
            field: "body".into(),
            message: "Request body must be a JSON object",
        }])
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Principal, StaticTokenVerifier, TokenVerifier};
    use crate::cache::{InMemoryOrderCache, OrderCache};
    use crate::domain::order::{Order, OrderStatus};
    use crate::messaging::{InMemoryWorkQueue, WorkQueue};
    use crate::metrics::Metrics;
    use crate::service::{OrderProducer, OrderReader};
    use crate::store::{InMemoryOrderStore, OrderStore};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    const ALICE: &str = "7f0c1e9a-4a0e-4f57-9b8e-0a60a6f1e2d1";
    const BOB: &str = "0b9c4c59-3b9e-4c44-a0d8-2f6c2b1d6b11";

    struct Backends {
        store: Arc<InMemoryOrderStore>,
        queue: Arc<InMemoryWorkQueue>,
        cache: Arc<InMemoryOrderCache>,
        verifier: Arc<dyn TokenVerifier>,
        metrics: Arc<Metrics>,
    }

    fn backends() -> Backends {
        let verifier = StaticTokenVerifier::from_pairs(&format!(
            "alice-token={ALICE}:alice@example.com,bob-token={BOB}:bob@example.com"
        ))
        .unwrap();

        Backends {
            store: Arc::new(InMemoryOrderStore::new()),
            queue: Arc::new(InMemoryWorkQueue::new(Duration::from_secs(30))),
            cache: Arc::new(InMemoryOrderCache::default()),
            verifier: Arc::new(verifier),
            metrics: Arc::new(Metrics::new().unwrap()),
        }
    }

    macro_rules! init_app {
        ($b:expr) => {{
            let producer = OrderProducer::new(
                $b.store.clone(),
                $b.queue.clone(),
                $b.cache.clone(),
                $b.metrics.clone(),
            );
            let reader = OrderReader::new($b.store.clone(), $b.cache.clone(), $b.metrics.clone());
            test::init_service(
                App::new()
                    .app_data(web::Data::from($b.verifier.clone()))
                    .app_data(web::Data::new(producer))
                    .app_data(web::Data::new(reader))
                    .configure(configure),
            )
            .await
        }};
    }

    fn order_body() -> Value {
        json!({
            "items": [
                {"productId": "P1", "name": "Widget", "quantity": 2, "price": 10.00},
                {"productId": "P2", "name": "Gadget", "quantity": 1, "price": 5.00}
            ],
            "shippingAddress": {
                "street": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "zipCode": "62701",
                "country": "US"
            }
        })
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }

    #[actix_web::test]
    async fn test_create_then_get_order() {
        let b = backends();
        let app = init_app!(b);

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(bearer("alice-token"))
            .set_json(order_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Order created successfully");
        assert_eq!(body["order"]["totalAmount"], 25.0);
        assert_eq!(body["order"]["status"], "pending");
        assert_eq!(body["order"]["userId"], ALICE);
        let id = body["order"]["id"].as_str().unwrap().to_string();

        assert_eq!(b.queue.len().await, 1);

        let req = test::TestRequest::get()
            .uri(&format!("/orders/{id}"))
            .insert_header(bearer("alice-token"))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["id"], id.as_str());
        assert_eq!(fetched["status"], "pending");
        assert_eq!(fetched["items"], body["order"]["items"]);
        assert_eq!(fetched["shippingAddress"], body["order"]["shippingAddress"]);
    }

    #[actix_web::test]
    async fn test_auth_required() {
        let b = backends();
        let app = init_app!(b);

        let req = test::TestRequest::post().uri("/orders").set_json(order_body()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "No token provided");

        let req = test::TestRequest::get()
            .uri(&format!("/orders/{}", Uuid::new_v4()))
            .insert_header(bearer("forged"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid token");

        assert!(b.store.is_empty().await);
    }

    #[actix_web::test]
    async fn test_validation_failure_has_no_side_effects() {
        let b = backends();
        let app = init_app!(b);

        let mut body = order_body();
        body["items"][0]["quantity"] = json!(0);
        body["shippingAddress"]["city"] = json!("");

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(bearer("alice-token"))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["items[0].quantity", "shippingAddress.city"]);

        assert!(b.store.is_empty().await);
        assert!(b.queue.is_empty().await);
    }

    #[actix_web::test]
    async fn test_total_out_of_range_is_bad_request() {
        let b = backends();
        let app = init_app!(b);

        let mut body = order_body();
        body["items"] = json!([{"productId": "P1", "name": "n", "quantity": 10, "price": 1.0e28}]);

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(bearer("alice-token"))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0]["field"], "items");
        assert_eq!(body["errors"][0]["message"], "Order total is too large");
        assert!(b.store.is_empty().await);
        assert!(b.queue.is_empty().await);
    }

    #[actix_web::test]
    async fn test_cached_read_keeps_exact_total() {
        let b = backends();
        let app = init_app!(b);

        let mut body = order_body();
        body["items"] = serde_json::from_str(
            r#"[
                {"productId": "P1", "name": "Penny", "quantity": 1, "price": 0.1},
                {"productId": "P2", "name": "Bulk", "quantity": 1, "price": 10000000000000000}
            ]"#,
        )
        .unwrap();

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(bearer("alice-token"))
            .set_json(body)
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["order"]["totalAmount"].to_string(), "10000000000000000.1");

        let id = Uuid::parse_str(created["order"]["id"].as_str().unwrap()).unwrap();
        let stored = b.store.find_by_id(id).await.unwrap().unwrap();
        assert!(b.cache.contains(id).await);

        let req = test::TestRequest::get()
            .uri(&format!("/orders/{id}"))
            .insert_header(bearer("alice-token"))
            .to_request();
        let fetched: Order = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched.total_amount, stored.total_amount);
        assert_eq!(fetched.total_amount.to_string(), "10000000000000000.1");
    }

    #[actix_web::test]
    async fn test_malformed_json_is_bad_request() {
        let b = backends();
        let app = init_app!(b);

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(bearer("alice-token"))
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"items\": [")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_persistence_failure_is_generic_500() {
        let b = backends();
        b.store.set_fail_writes(true);
        let app = init_app!(b);

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(bearer("alice-token"))
            .set_json(order_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"message": "Error creating order"}));
        assert!(b.queue.is_empty().await);
    }

    #[actix_web::test]
    async fn test_foreign_and_unknown_orders_are_404() {
        let b = backends();
        let app = init_app!(b);

        let owner = Principal {
            user_id: Uuid::parse_str(ALICE).unwrap(),
            email: "alice@example.com".into(),
        };
        let order = Order::new(owner.user_id, vec![], order_address()).unwrap();
        b.store.insert(&order).await.unwrap();

        for uri in [
            format!("/orders/{}", order.id),
            format!("/orders/{}", Uuid::new_v4()),
            "/orders/not-a-uuid".to_string(),
        ] {
            let req = test::TestRequest::get()
                .uri(&uri)
                .insert_header(bearer("bob-token"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["message"], "Order not found");
        }

        // A cached copy must not leak either
        b.cache.set(&order).await.unwrap();
        let req = test::TestRequest::get()
            .uri(&format!("/orders/{}", order.id))
            .insert_header(bearer("bob-token"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri(&format!("/orders/{}", order.id))
            .insert_header(bearer("alice-token"))
            .to_request();
        let fetched: Order = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched.status, OrderStatus::Pending);
    }

    #[actix_web::test]
    async fn test_enqueue_failure_still_returns_created() {
        let b = backends();
        b.queue.fail_next_enqueues(1);
        let app = init_app!(b);

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(bearer("alice-token"))
            .set_json(order_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(b.store.len().await, 1);
        assert!(b.queue.receive(10, Duration::ZERO).await.unwrap().is_empty());
    }

    fn order_address() -> crate::domain::order::ShippingAddress {
        crate::domain::order::ShippingAddress {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "62701".into(),
            country: "US".into(),
        }
    }
}
