//! # caja-core: Pure Business Logic for Caja POS
//!
//! Till rules, cart checkout, reconciliation math and reporting for a
//! multi-branch store. Zero I/O: every function here is deterministic.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 caja-server (HTTP boundary)                     │   │
//! │  │   open_till, record_sale, close_till, current_till, reports     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 caja-db (Database Layer)                        │   │
//! │  │   Till Ledger, Sale Engine, Inventory Store, report facts       │   │
//! │  │   owns every transaction and lock                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls into                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────────┐         │   │
//! │  │   │  types  │ │  money  │ │ checkout │ │reconciliation│         │   │
//! │  │   │ Till    │ │  Money  │ │ SalePlan │ │  TillTotals  │         │   │
//! │  │   │ Sale    │ │ VAT net │ │ stock    │ │ closing cash │         │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────────┘         │   │
//! │  │   ┌─────────┐ ┌────────────┐ ┌───────────┐                      │   │
//! │  │   │  error  │ │ validation │ │ analytics │                      │   │
//! │  │   └─────────┘ └────────────┘ └───────────┘                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Branch, Till, Product, Sale, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//! - [`checkout`] - Cart evaluation inside the sale's atomic unit
//! - [`reconciliation`] - Till totals and closing cash
//! - [`analytics`] - Sales and profitability reports
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::reconciliation::TillTotals;
//! use caja_core::types::PaymentMethod;
//!
//! let mut totals = TillTotals::default();
//! totals.record(PaymentMethod::Cash, Money::from_units(7000), Money::from_units(2500));
//!
//! // change given never reduces closing cash
//! let closing = totals.closing_cash(Money::from_units(5000));
//! assert_eq!(closing, Money::from_units(12_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod checkout;
pub mod error;
pub mod money;
pub mod reconciliation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use reconciliation::{ReconciliationSummary, TillTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart snapshot.
pub const MAX_CART_ITEMS: usize = 100;

/// Upper bound for any single amount: prices, opening floats, tendered
/// cash and sale totals (100 million in major units).
///
/// Keeps every line total and till running total far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

/// Maximum quantity on a single cart line.
///
/// Catches typing 1000 instead of 10 at the scanner.
pub const MAX_ITEM_QUANTITY: i64 = 999;
