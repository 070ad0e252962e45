//! # API Error Type
//!
//! Unified error envelope for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler  →  Result<Json<T>, ApiError>                                  │
//! │                                                                         │
//! │  CoreError (via DbError::Core)                                          │
//! │    Validation ─────► 400  { error_kind: "validation", ... }             │
//! │    Forbidden  ─────► 403  { error_kind: "forbidden", ... }              │
//! │    NotFound   ─────► 404  { error_kind: "not_found", ... }              │
//! │    Conflict   ─────► 409  { error_kind: "conflict", ... }               │
//! │  DbError::LockTimeout ─► 503  { error_kind: "lock_timeout",             │
//! │                                 retryable: true }                       │
//! │  anything else ─────► 500  generic message, real cause only in logs     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "error_kind": "validation",
//!   "code": "insufficient_stock",
//!   "message": "Insufficient stock for Café Molido: 1 available, 2 requested",
//!   "details": { "product_id": "…", "available": 1, "requested": 2 },
//!   "retryable": false
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use caja_core::{CoreError, ErrorKind, ValidationError};
use caja_db::DbError;

/// Error returned by every handler.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,

    /// Coarse class: validation, conflict, not_found, forbidden,
    /// unauthorized, lock_timeout or internal
    pub error_kind: &'static str,

    /// Machine-readable name of the specific error
    pub code: &'static str,

    /// Human-readable error message for display
    pub message: String,

    /// Structured context (product, quantities, till id)
    pub details: Value,

    /// Whether the whole request may simply be retried
    pub retryable: bool,
}

impl ApiError {
    fn new(status: StatusCode, error_kind: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            error_kind,
            code,
            message: message.into(),
            details: Value::Null,
            retryable: false,
        }
    }

    /// Missing or unknown caller identity.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized", message)
    }

    /// A body, path or query string that could not be decoded.
    pub fn malformed_request(part: &'static str, message: impl Into<String>) -> Self {
        let mut err = ApiError::new(StatusCode::BAD_REQUEST, "validation", "malformed_request", message);
        err.details = serde_json::json!({ "part": part });
        err
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        let mut err = ApiError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "not_found",
            format!("{resource} not found: {id}"),
        );
        err.details = serde_json::json!({ "id": id });
        err
    }

    pub fn internal() -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "internal",
            "The operation failed, please try again later",
        )
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let (status, kind) = match err.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        };
        let mut api = ApiError::new(status, kind, err.code(), err.to_string());
        api.details = err.details();
        api
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err).into()
    }
}

/// Converts database errors to API errors.
///
/// Storage faults are logged here and reach the client only as a generic
/// message.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::LockTimeout => {
                let mut api = ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "lock_timeout",
                    "lock_timeout",
                    "The store is busy, please retry",
                );
                api.retryable = true;
                api
            }
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            other => {
                error!(error = %other, "Storage failure");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
