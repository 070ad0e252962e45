//! # HTTP Routes
//!
//! ```text
//! GET  /health                      liveness + database check
//!
//! POST /api/tills                   open a till          → 201 { till_id, till }
//! GET  /api/tills                   till history (newest first)
//! GET  /api/tills/current           resolve the caller's till (?till_id= hint)
//! GET  /api/tills/{id}              reconciliation summary
//! POST /api/tills/{id}/close        close                → reconciliation summary
//! POST /api/tills/{id}/sales        record a sale        → 201 { sale_id, receipt_number, ... }
//!
//! GET  /api/sales/{id}              sale with its lines
//! GET  /api/reports/sales           analytics (admins)
//! ```
//!
//! Every `/api` route needs the `x-cashier-id` header.

mod report;
mod sale;
mod till;

use axum::http::StatusCode;
use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(till::routes())
        .merge(sale::routes())
        .merge(report::routes())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.db.health_check().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
    }
}
