//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                           │
//! │  ├── CoreError        - Business rule rejections                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                        │
//! │  └── DbError          - Storage failures, lock timeouts                 │
//! │                                                                         │
//! │  caja-server errors                                                     │
//! │  └── ApiError         - {error_kind, message, details}                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries enough context (product name, quantities, till id)
//! for the caller to render a precise message without re-querying.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::money::Money;
use crate::types::PaymentMethod;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used by callers to pick status codes and messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or a violated business rule. Never retried.
    Validation,
    /// An invariant (one open till per branch, closed till) would break.
    Conflict,
    /// A referenced product, till, branch or cashier does not exist.
    NotFound,
    /// The caller may not perform the operation.
    Forbidden,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule rejections raised by the till ledger and sale engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The cart snapshot contained no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Card and transfer payments need a transaction reference.
    #[error("A transaction reference number is required for {method:?} payments")]
    MissingReferenceNumber { method: PaymentMethod },

    /// Transfers need the originating bank.
    #[error("A bank name is required for transfer payments")]
    MissingBankName,

    /// One or more cart products do not exist.
    #[error("Products not found: {}", ids.join(", "))]
    ProductNotFound { ids: Vec<String> },

    /// The product cannot be sold from the till's branch.
    ///
    /// ## When This Occurs
    /// - Product belongs to a different branch
    /// - Product is branch-less but not flagged sellable without stock
    #[error("Product '{product_name}' does not belong to branch {branch_id}")]
    WrongBranch {
        product_id: String,
        product_name: String,
        branch_id: String,
    },

    /// Not enough stock to cover the line.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: 5 × Producto X
    ///      │
    ///      ▼
    /// Locked stock read: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// "Producto X does not have enough stock. Available: 3"
    /// ```
    #[error("Insufficient stock for '{product_name}': available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Cash tendered does not cover the sale total.
    #[error("Insufficient payment: total is {total}, customer paid {tendered} (short {shortfall})")]
    InsufficientPayment {
        total: Money,
        tendered: Money,
        shortfall: Money,
    },

    /// The branch already has an open till.
    #[error("Branch {branch_id} already has an open till ({till_id})")]
    TillAlreadyOpen { branch_id: String, till_id: String },

    /// A non-admin cashier already operates another open till.
    #[error("Cashier {cashier_id} already has an open till ({till_id})")]
    CashierAlreadyHasOpenTill { cashier_id: String, till_id: String },

    /// The till is closed; closed tills are never mutated again.
    #[error("Till {till_id} is already closed")]
    TillAlreadyClosed { till_id: String },

    #[error("Till not found: {0}")]
    TillNotFound(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Cashier not found: {0}")]
    CashierNotFound(String),

    /// The caller is not authorised for the operation.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Classifies the error per the till error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::EmptyCart
            | CoreError::MissingReferenceNumber { .. }
            | CoreError::MissingBankName
            | CoreError::ProductNotFound { .. }
            | CoreError::WrongBranch { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::InsufficientPayment { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::TillAlreadyOpen { .. }
            | CoreError::CashierAlreadyHasOpenTill { .. }
            | CoreError::TillAlreadyClosed { .. } => ErrorKind::Conflict,
            CoreError::TillNotFound(_)
            | CoreError::BranchNotFound(_)
            | CoreError::CashierNotFound(_) => ErrorKind::NotFound,
            CoreError::Forbidden { .. } => ErrorKind::Forbidden,
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::EmptyCart => "empty_cart",
            CoreError::MissingReferenceNumber { .. } => "missing_reference_number",
            CoreError::MissingBankName => "missing_bank_name",
            CoreError::ProductNotFound { .. } => "product_not_found",
            CoreError::WrongBranch { .. } => "wrong_branch",
            CoreError::InsufficientStock { .. } => "insufficient_stock",
            CoreError::InsufficientPayment { .. } => "insufficient_payment",
            CoreError::TillAlreadyOpen { .. } => "till_already_open",
            CoreError::CashierAlreadyHasOpenTill { .. } => "cashier_already_has_open_till",
            CoreError::TillAlreadyClosed { .. } => "till_already_closed",
            CoreError::TillNotFound(_) => "till_not_found",
            CoreError::BranchNotFound(_) => "branch_not_found",
            CoreError::CashierNotFound(_) => "cashier_not_found",
            CoreError::Forbidden { .. } => "forbidden",
            CoreError::Validation(_) => "validation",
        }
    }

    /// Structured details for the error envelope.
    pub fn details(&self) -> Value {
        match self {
            CoreError::EmptyCart | CoreError::MissingBankName => Value::Null,
            CoreError::MissingReferenceNumber { method } => json!({ "method": method }),
            CoreError::ProductNotFound { ids } => json!({ "product_ids": ids }),
            CoreError::WrongBranch {
                product_id,
                product_name,
                branch_id,
            } => json!({
                "product_id": product_id,
                "product_name": product_name,
                "branch_id": branch_id,
            }),
            CoreError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => json!({
                "product_id": product_id,
                "product_name": product_name,
                "available": available,
                "requested": requested,
            }),
            CoreError::InsufficientPayment {
                total,
                tendered,
                shortfall,
            } => json!({
                "total_cents": total.cents(),
                "tendered_cents": tendered.cents(),
                "shortfall_cents": shortfall.cents(),
            }),
            CoreError::TillAlreadyOpen { branch_id, till_id } => {
                json!({ "branch_id": branch_id, "till_id": till_id })
            }
            CoreError::CashierAlreadyHasOpenTill {
                cashier_id,
                till_id,
            } => json!({ "cashier_id": cashier_id, "till_id": till_id }),
            CoreError::TillAlreadyClosed { till_id } | CoreError::TillNotFound(till_id) => {
                json!({ "till_id": till_id })
            }
            CoreError::BranchNotFound(id) => json!({ "branch_id": id }),
            CoreError::CashierNotFound(id) => json!({ "cashier_id": id }),
            CoreError::Forbidden { reason } => json!({ "reason": reason }),
            CoreError::Validation(e) => json!({ "field": e.field() }),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
