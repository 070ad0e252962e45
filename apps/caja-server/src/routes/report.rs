//! Analytics API handler.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::CurrentCashier;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;
use caja_core::analytics::{ReportFilter, SalesReport, DEFAULT_TOP_PRODUCTS};
use caja_core::CoreError;

const MAX_TOP_PRODUCTS: usize = 500;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/reports/sales", get(sales_report))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub branch_id: Option<String>,
    pub cashier_id: Option<String>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub top: Option<usize>,
}

/// GET /api/reports/sales
async fn sales_report(
    State(state): State<AppState>,
    CurrentCashier(cashier): CurrentCashier,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<SalesReport>> {
    if !cashier.is_admin {
        return Err(CoreError::forbidden("reports are available to administrators only").into());
    }

    let filter = ReportFilter {
        from: query.from,
        to: query.to,
        branch_id: query.branch_id,
        cashier_id: query.cashier_id,
        utc_offset_minutes: query.utc_offset_minutes,
    };
    let top = query.top.unwrap_or(DEFAULT_TOP_PRODUCTS).min(MAX_TOP_PRODUCTS);

    let report = state.db.reports().sales_report(&filter, top).await?;
    Ok(Json(report))
}
