//! # caja-server
//!
//! HTTP boundary for the till lifecycle and the sale engine.
//!
//! ## Request Flow
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌────────────────────────────┐
//! │  HTTP client │───►│  CurrentCashier  │───►│  handler                   │
//! │              │    │  (x-cashier-id)  │    │  state.db.tills()/sales()  │
//! └──────────────┘    └──────────────────┘    └─────────────┬──────────────┘
//!        ▲                                                  │
//!        │                  ApiError / Json<T>              │
//!        └──────────────────────────────────────────────────┘
//! ```
//!
//! Handlers hold no locks of their own. Concurrent requests meet only inside
//! SQLite, where every mutating operation runs under the writer lock.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use caja_core::{Branch, Cashier, Product};
    use caja_db::{Database, DbConfig, NewProduct};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        db: Database,
        branch: Branch,
        cashier: Cashier,
        admin: Cashier,
        product: Product,
    }

    async fn setup() -> TestApp {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let branch = db.branches().create("Centro").await.unwrap();
        let cashier = db.cashiers().create("ana", false, Some(&branch.id)).await.unwrap();
        let admin = db.cashiers().create("root", true, None).await.unwrap();
        let product = db
            .products()
            .insert(NewProduct {
                sku: "CAFE".to_string(),
                name: "Café Molido".to_string(),
                purchase_price_cents: 250_000,
                sale_price_cents: 500_000,
                branch_id: Some(branch.id.clone()),
                allow_sale_without_stock: false,
                legacy_stock: 0,
            })
            .await
            .unwrap();
        db.products().restock(&product.id, &branch.id, 10).await.unwrap();

        TestApp {
            app: router(AppState::new(db.clone())),
            db,
            branch,
            cashier,
            admin,
            product,
        }
    }

    async fn call(app: &Router, method: Method, uri: &str, cashier: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(id) = cashier {
            req = req.header(auth::CASHIER_HEADER, id);
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn open_till(t: &TestApp) -> String {
        let (status, body) = call(
            &t.app,
            Method::POST,
            "/api/tills",
            Some(&t.cashier.id),
            Some(json!({ "branch_id": t.branch.id, "opening_float_cents": 1_000_000 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["till_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let t = setup().await;
        let (status, _) = call(&t.app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_requests_without_identity_are_rejected() {
        let t = setup().await;
        let (status, body) = call(&t.app, Method::GET, "/api/tills/current", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_kind"], "unauthorized");

        let (status, _) = call(&t.app, Method::GET, "/api/tills/current", Some("ghost"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_till_and_sale_flow() {
        let t = setup().await;
        let till_id = open_till(&t).await;

        // a second till in the same branch is a conflict
        let (status, body) = call(
            &t.app,
            Method::POST,
            "/api/tills",
            Some(&t.admin.id),
            Some(json!({ "branch_id": t.branch.id, "opening_float_cents": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "till_already_open");
        assert_eq!(body["retryable"], false);

        let (status, body) = call(&t.app, Method::GET, "/api/tills/current", Some(&t.cashier.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], till_id.as_str());

        let (status, sale) = call(
            &t.app,
            Method::POST,
            &format!("/api/tills/{till_id}/sales"),
            Some(&t.cashier.id),
            Some(json!({
                "items": [{ "product_id": t.product.id, "quantity": 2 }],
                "payment": { "method": "cash", "tendered_cents": 1_200_000 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{sale}");
        assert_eq!(sale["total_cents"], 1_000_000);
        assert_eq!(sale["change_cents"], 200_000);
        assert!(sale["receipt_number"].as_str().unwrap().ends_with("-0001"));

        let sale_id = sale["sale_id"].as_str().unwrap();
        let (status, detail) = call(&t.app, Method::GET, &format!("/api/sales/{sale_id}"), Some(&t.cashier.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["lines"].as_array().unwrap().len(), 1);
        assert_eq!(detail["sale"]["till_id"], till_id.as_str());

        let (status, summary) = call(
            &t.app,
            Method::POST,
            &format!("/api/tills/{till_id}/close"),
            Some(&t.cashier.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{summary}");
        assert_eq!(summary["state"], "closed");
        assert_eq!(summary["closing_cash"], 2_000_000);

        let (status, body) = call(&t.app, Method::GET, "/api/tills/current", Some(&t.cashier.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());

        let (status, history) = call(
            &t.app,
            Method::GET,
            &format!("/api/tills?branch_id={}&limit=5", t.branch.id),
            Some(&t.admin.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_sale_reports_cause_and_keeps_stock() {
        let t = setup().await;
        let till_id = open_till(&t).await;

        let (status, body) = call(
            &t.app,
            Method::POST,
            &format!("/api/tills/{till_id}/sales"),
            Some(&t.cashier.id),
            Some(json!({
                "items": [{ "product_id": t.product.id, "quantity": 11 }],
                "payment": { "method": "debit", "reference_number": "OP-9" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "insufficient_stock");
        assert_eq!(body["details"]["available"], 10);
        assert_eq!(body["details"]["requested"], 11);

        let stock = t.db.products().available_stock(&t.product.id, &t.branch.id).await.unwrap();
        assert_eq!(stock, 10);

        let (status, body) = call(
            &t.app,
            Method::POST,
            &format!("/api/tills/{till_id}/sales"),
            Some(&t.cashier.id),
            Some(json!({ "items": [], "payment": { "method": "cash", "tendered_cents": 0 } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "empty_cart");
    }

    #[tokio::test]
    async fn test_malformed_input_gets_the_error_envelope() {
        let t = setup().await;
        let till_id = open_till(&t).await;
        let uri = format!("/api/tills/{till_id}/sales");

        // quantity as a string
        let (status, body) = call(
            &t.app,
            Method::POST,
            &uri,
            Some(&t.cashier.id),
            Some(json!({
                "items": [{ "product_id": t.product.id, "quantity": "2" }],
                "payment": { "method": "cash", "tendered_cents": 1_000_000 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_kind"], "validation");
        assert_eq!(body["code"], "malformed_request");
        assert_eq!(body["details"]["part"], "body");
        assert!(!body["message"].as_str().unwrap().is_empty());

        // payment without a method
        let (status, body) = call(
            &t.app,
            Method::POST,
            &uri,
            Some(&t.cashier.id),
            Some(json!({ "items": [{ "product_id": t.product.id, "quantity": 1 }], "payment": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_kind"], "validation");

        // unparsable query string
        let (status, body) = call(
            &t.app,
            Method::GET,
            "/api/reports/sales?from=yesterday&to=today",
            Some(&t.admin.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["part"], "query");

        // nothing was sold
        let stock = t.db.products().available_stock(&t.product.id, &t.branch.id).await.unwrap();
        assert_eq!(stock, 10);
    }

    #[tokio::test]
    async fn test_closing_someone_elses_till_is_forbidden() {
        let t = setup().await;
        let till_id = open_till(&t).await;
        let other = t.db.cashiers().create("luis", false, Some(&t.branch.id)).await.unwrap();

        let (status, body) = call(&t.app, Method::POST, &format!("/api/tills/{till_id}/close"), Some(&other.id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_kind"], "forbidden");

        let (status, _) = call(&t.app, Method::GET, "/api/tills/missing", Some(&t.admin.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reports_are_admin_only() {
        let t = setup().await;
        let uri = "/api/reports/sales?from=2026-01-01T00:00:00Z&to=2026-02-01T00:00:00Z";

        let (status, _) = call(&t.app, Method::GET, uri, Some(&t.cashier.id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, report) = call(&t.app, Method::GET, uri, Some(&t.admin.id), None).await;
        assert_eq!(status, StatusCode::OK, "{report}");
        assert_eq!(report["kpis"]["transactions"], 0);
        assert!(report["daily"].as_array().unwrap().is_empty());
        assert_eq!(report["hourly"].as_array().unwrap().len(), 24);
    }
}
