//! Till API handlers (open, close, resolve, summary, history).

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::CurrentCashier;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use caja_core::{ReconciliationSummary, Till};
use caja_db::repository::till::DEFAULT_HISTORY_LIMIT;

const MAX_HISTORY_LIMIT: i64 = 500;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tills", get(history).post(open))
        .route("/api/tills/current", get(current))
        .route("/api/tills/{id}", get(summary))
        .route("/api/tills/{id}/close", post(close))
}

#[derive(Debug, Deserialize)]
pub struct OpenTillRequest {
    pub branch_id: String,
    pub opening_float_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct OpenTillResponse {
    pub till_id: String,
    pub till: Till,
}

#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    /// Till the caller last worked on, if the client remembers one.
    pub till_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub branch_id: Option<String>,
    pub limit: Option<i64>,
}

/// POST /api/tills
async fn open(
    State(state): State<AppState>,
    CurrentCashier(cashier): CurrentCashier,
    ApiJson(payload): ApiJson<OpenTillRequest>,
) -> ApiResult<(StatusCode, Json<OpenTillResponse>)> {
    debug!(cashier_id = %cashier.id, branch_id = %payload.branch_id, "open till");
    let till = state
        .db
        .tills()
        .open(&cashier.id, &payload.branch_id, payload.opening_float_cents)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(OpenTillResponse {
            till_id: till.id.clone(),
            till,
        }),
    ))
}

/// POST /api/tills/{id}/close
async fn close(
    State(state): State<AppState>,
    CurrentCashier(cashier): CurrentCashier,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ReconciliationSummary>> {
    let summary = state.db.tills().close(&id, &cashier.id).await?;
    Ok(Json(summary))
}

/// GET /api/tills/current
///
/// `null` means the caller has no usable till and must open one.
async fn current(
    State(state): State<AppState>,
    CurrentCashier(cashier): CurrentCashier,
    ApiQuery(query): ApiQuery<CurrentQuery>,
) -> ApiResult<Json<Option<Till>>> {
    let till = state
        .db
        .tills()
        .resolve_current(&cashier.id, query.till_id.as_deref())
        .await?;
    Ok(Json(till))
}

/// GET /api/tills/{id}
async fn summary(
    State(state): State<AppState>,
    CurrentCashier(_): CurrentCashier,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ReconciliationSummary>> {
    Ok(Json(state.db.tills().summary(&id).await?))
}

/// GET /api/tills
async fn history(
    State(state): State<AppState>,
    CurrentCashier(_): CurrentCashier,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Json<Vec<Till>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let tills = state
        .db
        .tills()
        .history(query.branch_id.as_deref(), limit)
        .await?;
    Ok(Json(tills))
}
