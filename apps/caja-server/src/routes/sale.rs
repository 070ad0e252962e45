//! Sale API handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentCashier;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use caja_core::{CartLine, PaymentDetails, Sale, SaleLine};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tills/{id}/sales", post(record))
        .route("/api/sales/{id}", get(get_by_id))
}

/// Cart snapshot plus payment, as handed over by the cart holder.
#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub payment: PaymentDetails,
}

#[derive(Debug, Serialize)]
pub struct RecordSaleResponse {
    pub sale_id: String,
    pub receipt_number: String,
    pub total_cents: i64,
    pub change_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

/// POST /api/tills/{id}/sales
async fn record(
    State(state): State<AppState>,
    CurrentCashier(cashier): CurrentCashier,
    ApiPath(till_id): ApiPath<String>,
    ApiJson(payload): ApiJson<RecordSaleRequest>,
) -> ApiResult<(StatusCode, Json<RecordSaleResponse>)> {
    let sale = state
        .db
        .sales()
        .record_sale(&till_id, &cashier.id, &payload.items, &payload.payment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordSaleResponse {
            sale_id: sale.id,
            receipt_number: sale.receipt_number,
            total_cents: sale.total_cents,
            change_cents: sale.change_cents,
        }),
    ))
}

/// GET /api/sales/{id}
async fn get_by_id(
    State(state): State<AppState>,
    CurrentCashier(_): CurrentCashier,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<SaleDetail>> {
    let sale = state
        .db
        .sales()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    let lines = state.db.sales().get_lines(&id).await?;
    Ok(Json(SaleDetail { sale, lines }))
}
