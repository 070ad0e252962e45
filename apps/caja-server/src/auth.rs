//! # Caller Identity
//!
//! Login and sessions belong to an upstream gateway. It forwards the
//! authenticated cashier id in the `x-cashier-id` header; this extractor
//! loads that cashier so handlers receive an explicit caller.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use caja_core::Cashier;

pub const CASHIER_HEADER: &str = "x-cashier-id";

/// The cashier making the request.
#[derive(Debug, Clone)]
pub struct CurrentCashier(pub Cashier);

impl FromRequestParts<AppState> for CurrentCashier {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(CASHIER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing x-cashier-id header"))?;

        match state.db.cashiers().get_by_id(id).await? {
            Some(cashier) => Ok(CurrentCashier(cashier)),
            None => {
                warn!(cashier_id = id, uri = %parts.uri, "Unknown cashier");
                Err(ApiError::unauthorized("Unknown cashier"))
            }
        }
    }
}
